//! DJB2 checksum widened to 64 bits.
//!
//! `h = h * 33 + byte`, seeded with 5381, wrapping at 2^64.  Fast and
//! order-sensitive; it detects transcription errors and nothing more.

/// Initial hash value.
pub const DJB2_SEED: u64 = 5381;

/// Incremental DJB2 hasher.  Feeding `a` then `b` gives the same digest as
/// feeding `a ++ b` in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Djb2 {
    state: u64,
}

impl Djb2 {
    pub fn new() -> Self {
        Self { state: DJB2_SEED }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.state = bytes.iter().fold(self.state, |h, &b| {
            h.wrapping_mul(33).wrapping_add(u64::from(b))
        });
    }

    pub fn finalize(self) -> u64 {
        self.state
    }
}

impl Default for Djb2 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u64 {
    let mut hasher = Djb2::new();
    hasher.update(bytes);
    hasher.finalize()
}
