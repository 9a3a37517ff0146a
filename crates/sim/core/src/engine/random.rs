//! Named deterministic random streams.
//!
//! Every proc or roll draws from a stream identified by a label
//! ("Crackling Jade Lightning", "Power Strikes Start", ...). Each stream is
//! seeded from the run seed and a hash of its label, so adding a roll to one
//! ability never shifts the sequence another ability sees.
use std::collections::BTreeMap;

/// PCG-XSH-RR generator: 64-bit state, 32-bit output.
#[derive(Clone, Copy, Debug)]
struct PcgStream {
    state: u64,
}

impl PcgStream {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        let xorshifted = (((self.state >> 18) ^ self.state) >> 27) as u32;
        let rot = (self.state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform float in `[0, 1)` built from 53 random bits.
    fn next_f64(&mut self) -> f64 {
        let hi = (self.next_u32() as u64) << 21;
        let lo = (self.next_u32() >> 11) as u64;
        ((hi | lo) as f64) / ((1u64 << 53) as f64)
    }
}

/// FNV-1a over the label bytes.
fn label_hash(label: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in label.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Derives a stream seed from the run seed and a stream label.
pub fn stream_seed(run_seed: u64, label: &str) -> u64 {
    let mut hash = run_seed;
    hash ^= label_hash(label).wrapping_mul(0x9e3779b97f4a7c15);

    // Final avalanche step
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ceb9fe1a85ec53);
    hash ^= hash >> 33;

    hash
}

#[derive(Clone, Debug)]
pub struct RandomStreams {
    seed: u64,
    streams: BTreeMap<String, PcgStream>,
}

impl RandomStreams {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: BTreeMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Next uniform float in `[0, 1)` from the stream named `label`.
    pub fn next_f64(&mut self, label: &str) -> f64 {
        if let Some(stream) = self.streams.get_mut(label) {
            return stream.next_f64();
        }
        let mut stream = PcgStream::new(stream_seed(self.seed, label));
        let value = stream.next_f64();
        self.streams.insert(label.to_owned(), stream);
        value
    }

    /// Rolls a proc with probability `chance`. Certain outcomes (`<= 0` or
    /// `>= 1`) do not consume a draw.
    pub fn proc(&mut self, chance: f64, label: &str) -> bool {
        if chance <= 0.0 || chance.is_nan() {
            return false;
        }
        if chance >= 1.0 {
            return true;
        }
        self.next_f64(label) < chance
    }
}
