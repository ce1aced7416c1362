//! Whirlpool digest helper.

use ::whirlpool::{Digest, Whirlpool};

/// Length in bytes of a Whirlpool digest.
pub const DIGEST_LEN: usize = 64;

/// Compute the 512-bit Whirlpool digest of `data`.
pub fn whirlpool(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Whirlpool::new();
    hasher.update(data);
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
