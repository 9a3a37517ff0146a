//! Decision-value layer: typed, read-only expressions over kernel state.
mod builder;
mod config;
mod diagnostic;
mod value;

pub use builder::ValueBuilder;
pub use config::{ActionConfig, RotationConfig, RuleConfig, UnitReference, ValueConfig};
pub use diagnostic::{Diagnostic, DiagnosticSeverity};
pub use value::{APLValue, AuraSelector, CompareOp, Literal, MathOp, UnitSelector, ValueType};
