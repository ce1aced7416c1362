//! Modified djb2 string hash used for name-based lookups.

/// Hash a file name to its 32-bit identifier.
///
/// Starts from zero rather than the usual 5381 seed and folds code points
/// with wrapping arithmetic, matching the identifiers stored in reference
/// tables.
pub fn djb2(name: &str) -> i32 {
    let mut hash = 0i32;
    for ch in name.chars() {
        hash = (ch as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(djb2(""), 0);
    }

    #[test]
    fn append_recurrence() {
        let prefix = "m50_5";
        let h = djb2(prefix);
        let expected = ('0' as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h));
        assert_eq!(djb2("m50_50"), expected);
    }

    #[test]
    fn distinct_names_distinct_hashes() {
        assert_ne!(djb2("foo"), djb2("bar"));
        assert_ne!(djb2("foo"), djb2("fop"));
    }
}
