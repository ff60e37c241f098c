//! Word hash shared by fact extraction and search
//!
//! Index time and query time must agree bit for bit, so the hash folds ASCII
//! case and nothing else: no locale tables, no Unicode case mapping.

/// FNV-1a 32-bit offset basis
pub const FNV1A_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime
pub const FNV1A_PRIME: u32 = 0x0100_0193;

/// Case-insensitive FNV-1a hash of a name
pub fn word_hash(word: &str) -> u32 {
    let mut hash = FNV1A_OFFSET_BASIS;
    for byte in word.bytes() {
        hash ^= byte.to_ascii_lowercase() as u32;
        hash = hash.wrapping_mul(FNV1A_PRIME);
    }
    hash
}

/// Split a display name into its stored base and instance number
///
/// `Health_1` is stored as `Health` with number 2, so the suffix is returned
/// as written (1). A suffix with a leading zero, an empty base or digits that
/// overflow stays part of the base, matching how the engine parses names.
pub fn split_name_number(name: &str) -> (&str, Option<u32>) {
    let Some((base, digits)) = name.rsplit_once('_') else {
        return (name, None);
    };
    if base.is_empty()
        || digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return (name, None);
    }
    match digits.parse::<u32>() {
        Ok(number) if number < i32::MAX as u32 => (base, Some(number)),
        _ => (name, None),
    }
}

/// Hashes a name can be indexed under: the display form and, for numbered
/// names, the stored base
pub fn name_word_hashes(name: &str) -> (u32, Option<u32>) {
    match split_name_number(name) {
        (base, Some(_)) => (word_hash(name), Some(word_hash(base))),
        _ => (word_hash(name), None),
    }
}

/// Sorted, de-duplicated hashes of every word
pub fn word_hashes<'a>(words: impl IntoIterator<Item = &'a str>) -> Vec<u32> {
    let mut hashes: Vec<u32> = words.into_iter().map(word_hash).collect();
    hashes.sort_unstable();
    hashes.dedup();
    hashes
}
