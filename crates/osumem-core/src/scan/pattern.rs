//! Pattern matching utilities for memory searching.
//!
//! Candidates are located with `memchr` on the first concrete byte of the
//! signature and then verified against the full pattern.

use memchr::memchr_iter;

use super::Signature;

/// Offsets in `buffer` where `signature` starts, in ascending order.
fn candidates<'a>(buffer: &'a [u8], signature: &'a Signature) -> impl Iterator<Item = usize> + 'a {
    let (anchor_index, anchor_byte) = signature.first_concrete();
    let last_start = buffer.len().checked_sub(signature.len());

    memchr_iter(anchor_byte, buffer)
        .filter_map(move |hit| hit.checked_sub(anchor_index))
        .take_while(move |&start| last_start.is_some_and(|last| start <= last))
        .filter(move |&start| signature.matches(&buffer[start..]))
}

/// Find the first occurrence of a signature in a buffer.
///
/// # Example
///
/// ```
/// use osumem_core::scan::{Signature, find_first};
///
/// let signature: Signature = "01 ?? 03".parse().unwrap();
/// assert_eq!(find_first(&[9, 1, 7, 3, 1, 8, 3], &signature), Some(1));
/// ```
pub fn find_first(buffer: &[u8], signature: &Signature) -> Option<usize> {
    candidates(buffer, signature).next()
}

/// Find all occurrences of a signature in a buffer.
pub fn find_all(buffer: &[u8], signature: &Signature) -> Vec<usize> {
    candidates(buffer, signature).collect()
}
