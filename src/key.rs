use crate::error::{Error, Result};

/// Computes the smallest key strictly greater than `key` with the same byte
/// length, by incrementing from the last byte with carry. For
/// `[0x01, 0x01, 0x01]` it returns `[0x01, 0x01, 0x02]`, for
/// `[0x01, 0xFF, 0xFF]` it returns `[0x02, 0x00, 0x00]`.
///
/// Fails with [`Error::EmptyKey`] on empty input and with
/// [`Error::KeyOverflow`] when every byte is already `0xFF`; callers should
/// then fall back to an unbounded upper bound.
pub fn next_key(key: &[u8]) -> Result<Vec<u8>> {
    if key.is_empty() {
        return Err(Error::EmptyKey);
    }
    let mut next = key.to_vec();
    for i in (0..next.len()).rev() {
        if next[i] < 0xFF {
            next[i] += 1;
            return Ok(next);
        }
        next[i] = 0;
    }
    Err(Error::KeyOverflow)
}
