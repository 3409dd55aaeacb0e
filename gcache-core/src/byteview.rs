//! # ByteView
//!
//! Immutable view of cached bytes returned to callers. Cloning a `ByteView`
//! is cheap (an `Arc` bump); obtaining a mutable copy always copies, which
//! is the defensive-copy boundary the rest of the cache relies on to keep
//! stored entries immutable from the caller's perspective.

use std::sync::Arc;

/// An immutable, length-known sequence of bytes.
#[derive(Debug, Clone, Eq)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Builds a view by copying the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }

    /// Builds a view from an owned buffer without copying.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }

    /// Number of bytes in the view.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the view holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrowed view of the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns an independent mutable copy. Mutating the result never
    /// affects this view or any other clone of it.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Lossy UTF-8 decode, for logging only.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_ref() == other.bytes.as_ref()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        ByteView::from_vec(bytes)
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        ByteView::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_vec_is_an_independent_copy() {
        let view = ByteView::from_bytes(b"hello");
        let mut copy = view.to_vec();
        copy[0] = b'H';
        assert_eq!(view.as_bytes(), b"hello");
        assert_eq!(copy, b"Hello");
    }

    #[test]
    fn equality_is_bytewise() {
        let a = ByteView::from_bytes(b"abc");
        let b = ByteView::from_vec(b"abc".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, ByteView::from_bytes(b"abd"));
    }

    #[test]
    fn len_and_is_empty() {
        assert_eq!(ByteView::from_bytes(b"abc").len(), 3);
        assert!(ByteView::from_bytes(b"").is_empty());
    }
}
