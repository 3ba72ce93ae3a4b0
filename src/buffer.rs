//! # Shared Buffer Windows
//!
//! `SharedBufRef` is a reference-counted window into an immutable serialized
//! blob. Buffer-backed arrays and objects hold one of these instead of
//! materialized children; element reads sub-slice the window without copying.
//!
//! ## Ownership
//!
//! The underlying bytes live in an `Arc<[u8]>`. Cloning a window or taking a
//! sub-window bumps the atomic count; the blob stays alive as long as any
//! window over any part of it survives, including after the parent window is
//! dropped.

use std::ops::Range;
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedBufRef {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl SharedBufRef {
    pub fn new(bytes: Vec<u8>) -> Self {
        let data: Arc<[u8]> = bytes.into();
        let end = data.len();
        Self { data, start: 0, end }
    }

    pub fn from_arc(data: Arc<[u8]>) -> Self {
        let end = data.len();
        Self { data, start: 0, end }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Sub-window over `range` of this window. Panics if the range is out of
    /// bounds; windows are only ever carved along offsets read from the blob
    /// itself, so a violation means the blob broke the serializer contract.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && self.start + range.end <= self.end,
            "sub-window {:?} escapes a {}-byte buffer window",
            range,
            self.len()
        );
        Self {
            data: Arc::clone(&self.data),
            start: self.start + range.start,
            end: self.start + range.end,
        }
    }

    /// Sub-window from `offset` to the end of this window.
    pub fn slice_from(&self, offset: usize) -> Self {
        self.slice(offset..self.len())
    }
}

impl std::fmt::Debug for SharedBufRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedBufRef({} bytes)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_exposes_exactly_its_bytes() {
        let buf = SharedBufRef::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn sub_windows_compose_relative_to_their_parent() {
        let buf = SharedBufRef::new(vec![10, 11, 12, 13, 14, 15]);
        let mid = buf.slice(1..5);
        assert_eq!(mid.as_bytes(), &[11, 12, 13, 14]);
        let inner = mid.slice(2..4);
        assert_eq!(inner.as_bytes(), &[13, 14]);
        assert_eq!(mid.slice_from(3).as_bytes(), &[14]);
    }

    #[test]
    fn sub_window_outlives_its_parent() {
        let buf = SharedBufRef::new((0..100).collect());
        let sub = buf.slice(90..95);
        drop(buf);
        assert_eq!(sub.as_bytes(), &[90, 91, 92, 93, 94]);
    }

    #[test]
    #[should_panic(expected = "escapes")]
    fn out_of_bounds_sub_window_panics() {
        let buf = SharedBufRef::new(vec![0; 4]);
        let _ = buf.slice(2..6);
    }
}
