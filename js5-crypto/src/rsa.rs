//! Textbook RSA over signed big-endian integers.
//!
//! Used only to wrap and unwrap the checksum-table digest trailer. The
//! byte encoding is signed big-endian two's-complement, including the
//! leading sign byte when the top bit of the magnitude is set.

use num_bigint::BigInt;

/// Apply `value ^ exponent mod modulus` to signed big-endian bytes.
pub fn crypt(data: &[u8], modulus: &BigInt, exponent: &BigInt) -> Vec<u8> {
    let value = BigInt::from_signed_bytes_be(data);
    value.modpow(exponent, modulus).to_signed_bytes_be()
}
