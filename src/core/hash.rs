//! Race State Digest
//!
//! SHA-256 over a race snapshot, fed field by field in a fixed order.
//! Replays are verified by comparing the digest a re-run lands on.

use sha2::{Digest, Sha256};

/// 32-byte SHA-256 digest of a race snapshot
pub type StateHash = [u8; 32];

/// Domain tag prefixed to every race digest
const RACE_DOMAIN: &[u8] = b"LANE_RUSH_STATE_V1";

/// Field-by-field digest builder. Callers own the field order.
pub struct StateHasher {
    inner: Sha256,
}

impl StateHasher {
    /// Start a digest tagged with `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    /// Start a race-state digest.
    pub fn for_race_state() -> Self {
        Self::new(RACE_DOMAIN)
    }

    /// Raw bytes, unframed.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// One byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Little-endian u64.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Bit pattern of an f64, so `0.0` and `-0.0` differ.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    /// Presence flag, then the value if present.
    #[inline]
    pub fn write_opt_f64(&mut self, value: Option<f64>) {
        self.write_bool(value.is_some());
        if let Some(v) = value {
            self.write_f64(v);
        }
    }

    /// 0 or 1.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Consume the builder.
    pub fn finalize(self) -> StateHash {
        self.inner.finalize().into()
    }
}

/// Compute state hash for race verification.
///
/// Called by `RaceState::compute_hash()`. The closure adds the
/// race-specific data after the tick and seed.
pub fn compute_state_hash<F>(tick: u32, seed: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_race_state();

    hasher.write_u32(tick);
    hasher.write_u32(seed);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(write: impl FnOnce(&mut StateHasher)) -> StateHash {
        let mut h = StateHasher::for_race_state();
        write(&mut h);
        h.finalize()
    }

    #[test]
    fn test_same_fields_same_digest() {
        let fill = |h: &mut StateHasher| {
            h.write_u32(100);
            h.write_f64(5.5);
            h.write_opt_f64(Some(1.25));
            h.write_bool(true);
        };
        assert_eq!(digest(fill), digest(fill));
    }

    #[test]
    fn test_field_order_changes_digest() {
        let a = digest(|h| {
            h.write_u32(1);
            h.write_u32(2);
        });
        let b = digest(|h| {
            h.write_u32(2);
            h.write_u32(1);
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_domain_tag_changes_digest() {
        let mut a = StateHasher::new(b"A");
        let mut b = StateHasher::new(b"B");
        a.write_u8(7);
        b.write_u8(7);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_signed_zero_distinguished() {
        assert_ne!(digest(|h| h.write_f64(0.0)), digest(|h| h.write_f64(-0.0)));
    }

    #[test]
    fn test_missing_and_zero_distinguished() {
        assert_ne!(
            digest(|h| h.write_opt_f64(None)),
            digest(|h| h.write_opt_f64(Some(0.0)))
        );
    }

    #[test]
    fn test_tick_and_seed_prefix() {
        let base = compute_state_hash(100, 42, |h| h.write_bool(true));
        assert_eq!(base, compute_state_hash(100, 42, |h| h.write_bool(true)));
        assert_ne!(base, compute_state_hash(101, 42, |h| h.write_bool(true)));
        assert_ne!(base, compute_state_hash(100, 43, |h| h.write_bool(true)));
    }
}
