//! Secure random identifier generation.
//!
//! Journey IDs are bearer-like: anyone who knows one can continue the
//! journey it names. They must therefore be unguessable, which rules out
//! sequential or timestamp-derived identifiers.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random alphanumeric string.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates an opaque journey identifier.
///
/// 32 alphanumeric characters give roughly 190 bits of entropy
/// (log2(62^32)), well past the 128-bit minimum for bearer identifiers.
#[must_use]
pub fn generate_journey_id() -> String {
    random_alphanumeric(32)
}

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}
