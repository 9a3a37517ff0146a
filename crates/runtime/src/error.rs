//! Errors surfaced by the encounter and batch runners.
//!
//! Refused casts never show up here; they are ordinary rotation control
//! flow. What does show up is a bad encounter description, a kernel fault
//! that aborted a run, or a worker that died.
use sim_core::{ErrorSeverity, KernelFault, SimError, SimTime};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid encounter: {0}")]
    InvalidConfig(String),

    #[error("encounter setup failed")]
    Setup(#[source] KernelFault),

    #[error("kernel fault at {at} (seed {seed})")]
    Kernel {
        seed: u64,
        at: SimTime,
        #[source]
        fault: KernelFault,
    },

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

impl SimError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidConfig(_) => ErrorSeverity::Validation,
            Self::Setup(fault) | Self::Kernel { fault, .. } => fault.severity(),
            Self::WorkerJoin(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Setup(_) => "SETUP_FAILED",
            Self::Kernel { fault, .. } => fault.error_code(),
            Self::WorkerJoin(_) => "WORKER_JOIN",
        }
    }
}
