//! # Datum Strings
//!
//! `DatumString` is the immutable byte string used for STR and BINARY
//! payloads and for object keys. It either owns its bytes or borrows a
//! window of a serialized blob; both forms clone in O(1).
//!
//! The payload is bytes, not `str`: STR contents are only guaranteed to be
//! UTF-8 when they were admitted under a version that validates encoding,
//! and BINARY contents are arbitrary. Ordering and equality are bytewise,
//! which is also the order object keys are stored and searched in.

use crate::buffer::SharedBufRef;
use crate::error::generic_error;
use eyre::Result;
use std::borrow::Cow;
use std::sync::Arc;

#[derive(Clone)]
pub struct DatumString(Repr);

#[derive(Clone)]
enum Repr {
    Owned(Arc<[u8]>),
    Shared(SharedBufRef),
}

impl DatumString {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Repr::Owned(bytes.into()))
    }

    /// Wraps a blob window whose bytes are exactly the string payload.
    pub fn from_buf(window: SharedBufRef) -> Self {
        Self(Repr::Shared(window))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Owned(bytes) => bytes,
            Repr::Shared(window) => window.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn as_utf8(&self) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| {
            generic_error(format!(
                "String `{}` (truncated) is not a UTF-8 string; {}.",
                self.to_utf8_lossy().chars().take(20).collect::<String>(),
                e
            ))
        })
    }

    pub fn to_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl From<&str> for DatumString {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for DatumString {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl From<Vec<u8>> for DatumString {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl PartialEq for DatumString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for DatumString {}

impl PartialOrd for DatumString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DatumString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialEq<str> for DatumString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for DatumString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl std::hash::Hash for DatumString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl std::fmt::Debug for DatumString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_utf8_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_bytewise() {
        let a = DatumString::from("abc");
        let b = DatumString::from("abd");
        assert!(a < b);
        assert!(DatumString::from("ab") < a);
        // Bytewise means the UTF-8 representation decides, not collation.
        assert!(DatumString::from("Z") < DatumString::from("a"));
    }

    #[test]
    fn buffer_backed_and_owned_forms_compare_equal() {
        let window = SharedBufRef::new(b"shared text".to_vec());
        let shared = DatumString::from_buf(window);
        let owned = DatumString::from("shared text");
        assert_eq!(shared, owned);
        assert_eq!(shared.as_utf8().unwrap(), "shared text");
    }

    #[test]
    fn invalid_utf8_is_reported_but_bytes_stay_accessible() {
        let s = DatumString::from_bytes(vec![0x66, 0xff, 0x67]);
        assert!(s.as_utf8().is_err());
        assert_eq!(s.as_bytes(), &[0x66, 0xff, 0x67]);
        assert_eq!(s.to_utf8_lossy(), "f\u{fffd}g");
    }
}
