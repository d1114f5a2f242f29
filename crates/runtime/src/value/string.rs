use std::borrow::Cow;
use std::fmt::{Debug, Display};

use bytes::Bytes;

use super::{normalize_index, normalize_range, Val};
use crate::gc::Gc;
use crate::runtime::Runtime;

/// An immutable byte string.
///
/// The length is explicit; the buffer is not null-terminated and may contain any bytes.
/// Indexing and slicing work on bytes.
pub struct Str {
    bytes: Bytes,
}

impl Str {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Str { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// View the contents as text, replacing invalid UTF-8 sequences.
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// The single-byte string at `index`.
    ///
    /// Negative indices count from the end. Returns the `None` singleton if `index` is out of
    /// range.
    pub fn get(&self, rt: &Runtime, index: i64) -> Val {
        match normalize_index(index, self.len()) {
            Some(i) => rt
                .make_string(Bytes::copy_from_slice(&self.bytes[i..=i]))
                .into(),
            None => rt.make_none(),
        }
    }

    /// A fresh copy of the bytes in `[start, end)`, see
    /// [`normalize_range`](super::normalize_range) for how the endpoints are resolved.
    pub fn get_range(&self, rt: &Runtime, start: i64, end: i64) -> Gc<Str> {
        match normalize_range(start, end, self.len()) {
            Some((start, end)) => rt.make_string(Bytes::copy_from_slice(&self.bytes[start..end])),
            None => rt.make_string(Bytes::new()),
        }
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl Eq for Str {}

impl Debug for Str {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.as_str_lossy(), f)
    }
}

impl Display for Str {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&*self.as_str_lossy(), f)
    }
}
