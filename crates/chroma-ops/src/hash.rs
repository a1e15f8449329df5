//! Content hashing for operations.
//!
//! Processor cache identifiers are built from per-op content hashes. The
//! hash covers an op's kind tag and its canonical parameters, so two ops
//! with the same math produce the same digest regardless of how they were
//! constructed. FNV-1a (64-bit) keeps this dependency-free and stable
//! across platforms.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a 64-bit hasher.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    state: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    /// Creates a hasher in the initial FNV state.
    pub fn new() -> Self {
        Self { state: FNV_OFFSET }
    }

    /// Feeds raw bytes.
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= u64::from(b);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    /// Feeds a kind tag or other small discriminant.
    pub fn update_u8(&mut self, v: u8) {
        self.update(&[v]);
    }

    /// Feeds a length or index.
    pub fn update_usize(&mut self, v: usize) {
        self.update(&(v as u64).to_le_bytes());
    }

    /// Feeds a 64-bit value.
    pub fn update_u64(&mut self, v: u64) {
        self.update(&v.to_le_bytes());
    }

    /// Feeds an `f64` by bit pattern. Negative zero is canonicalized so
    /// `0.0` and `-0.0` hash alike.
    pub fn update_f64(&mut self, v: f64) {
        let v = if v == 0.0 { 0.0 } else { v };
        self.update(&v.to_bits().to_le_bytes());
    }

    /// Feeds an `f32` by bit pattern, canonicalizing negative zero.
    pub fn update_f32(&mut self, v: f32) {
        let v = if v == 0.0 { 0.0 } else { v };
        self.update(&v.to_bits().to_le_bytes());
    }

    /// Feeds a slice of `f64` values.
    pub fn update_f64_slice(&mut self, vs: &[f64]) {
        self.update_usize(vs.len());
        for &v in vs {
            self.update_f64(v);
        }
    }

    /// Feeds a slice of `f32` values.
    pub fn update_f32_slice(&mut self, vs: &[f32]) {
        self.update_usize(vs.len());
        for &v in vs {
            self.update_f32(v);
        }
    }

    /// Feeds an optional `f64`, distinguishing `None` from any value.
    pub fn update_opt_f64(&mut self, v: Option<f64>) {
        match v {
            Some(v) => {
                self.update_u8(1);
                self.update_f64(v);
            }
            None => self.update_u8(0),
        }
    }

    /// Returns the digest.
    pub fn finish(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(ContentHasher::new().finish(), FNV_OFFSET);
    }

    #[test]
    fn known_vector() {
        // FNV-1a of "a" is a published test vector.
        let mut h = ContentHasher::new();
        h.update(b"a");
        assert_eq!(h.finish(), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn negative_zero_canonicalized() {
        let mut a = ContentHasher::new();
        a.update_f64(0.0);
        let mut b = ContentHasher::new();
        b.update_f64(-0.0);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn order_matters() {
        let mut a = ContentHasher::new();
        a.update_f64(1.0);
        a.update_f64(2.0);
        let mut b = ContentHasher::new();
        b.update_f64(2.0);
        b.update_f64(1.0);
        assert_ne!(a.finish(), b.finish());
    }
}
