//! XTEA block cipher over byte ranges.
//!
//! Archive payloads are enciphered in place over a caller-supplied range.
//! Only whole 8-byte blocks inside the range are touched; a trailing
//! partial block stays cleartext.

use byteorder::{BigEndian, ByteOrder};

/// Number of Feistel rounds.
const ROUNDS: u32 = 32;

/// Key schedule constant.
const GOLDEN_RATIO: u32 = 0x9E37_79B9;

/// A 128-bit XTEA key as four signed words, the shape key files use.
pub type XteaKey = [i32; 4];

/// The all-zero key, meaning "no encryption".
pub const NULL_KEY: XteaKey = [0; 4];

/// Returns true when every key word is non-zero.
///
/// A key with any zero word disables ciphering entirely. A legitimate key
/// could carry a zero word, but the producer behaves this way and decoders
/// must match it bit-for-bit.
pub fn is_usable(key: &XteaKey) -> bool {
    key.iter().all(|&word| word != 0)
}

/// Encipher `buf[start..end]` in place.
pub fn encipher(buf: &mut [u8], start: usize, end: usize, key: &XteaKey) {
    let blocks = (end - start) / 8;
    for block in 0..blocks {
        let off = start + block * 8;
        let mut v0 = BigEndian::read_u32(&buf[off..]);
        let mut v1 = BigEndian::read_u32(&buf[off + 4..]);
        let mut sum = 0u32;
        for _ in 0..ROUNDS {
            v0 = v0.wrapping_add(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ sum.wrapping_add(key[(sum & 3) as usize] as u32),
            );
            sum = sum.wrapping_add(GOLDEN_RATIO);
            v1 = v1.wrapping_add(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize] as u32),
            );
        }
        BigEndian::write_u32(&mut buf[off..], v0);
        BigEndian::write_u32(&mut buf[off + 4..], v1);
    }
}

/// Decipher `buf[start..end]` in place.
pub fn decipher(buf: &mut [u8], start: usize, end: usize, key: &XteaKey) {
    let blocks = (end - start) / 8;
    for block in 0..blocks {
        let off = start + block * 8;
        let mut v0 = BigEndian::read_u32(&buf[off..]);
        let mut v1 = BigEndian::read_u32(&buf[off + 4..]);
        let mut sum = GOLDEN_RATIO.wrapping_mul(ROUNDS);
        for _ in 0..ROUNDS {
            v1 = v1.wrapping_sub(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize] as u32),
            );
            sum = sum.wrapping_sub(GOLDEN_RATIO);
            v0 = v0.wrapping_sub(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ sum.wrapping_add(key[(sum & 3) as usize] as u32),
            );
        }
        BigEndian::write_u32(&mut buf[off..], v0);
        BigEndian::write_u32(&mut buf[off + 4..], v1);
    }
}
