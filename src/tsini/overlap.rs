//! Overlap Grouper
//!
//! The dialect lets fields share storage: bit fields live inside a byte that may also be
//! declared as a scalar, and an array can be re-declared as a set of scalars. Code
//! generators need one representative per address range, so they first partition a page's
//! fields into groups of transitively overlapping byte ranges.
//!
//! The algorithm sorts by start offset ascending, then end offset descending, so that at any
//! start address the widest field comes first. A single scan then keeps the first field of
//! the current group as its anchor and starts a new group whenever a field does not overlap
//! the anchor.
//!
//! This assumes overlaps are complete: when two ranges overlap, the narrower one lies inside
//! the wider one. Partially overlapping ranges (bytes 0-7 and 6-9, say) are not detected;
//! such a field joins the anchor's group if it touches the anchor and starts a new one
//! otherwise.

use serde::Serialize;

/// An inclusive byte range within a page
pub trait ByteSpan {
    /// First byte. Unpositioned fields report [`UNPOSITIONED`](super::line::UNPOSITIONED).
    fn offset(&self) -> i64;

    /// Last byte, inclusive
    fn offset_end(&self) -> i64;

    fn overlaps<S: ByteSpan + ?Sized>(&self, other: &S) -> bool {
        self.offset() <= other.offset_end() && other.offset() <= self.offset_end()
    }
}

impl<T: ByteSpan + ?Sized> ByteSpan for &T {
    fn offset(&self) -> i64 {
        (**self).offset()
    }

    fn offset_end(&self) -> i64 {
        (**self).offset_end()
    }
}

/// A bare byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub offset: i64,
    pub offset_end: i64,
}

impl Span {
    pub fn new(offset: i64, offset_end: i64) -> Self {
        Span { offset, offset_end }
    }
}

impl ByteSpan for Span {
    fn offset(&self) -> i64 {
        self.offset
    }

    fn offset_end(&self) -> i64 {
        self.offset_end
    }
}

/// Lazy sequence of overlap groups, in ascending offset order
#[derive(Debug)]
pub struct OverlapGroups<T> {
    fields: std::vec::IntoIter<T>,
    pending: Option<T>,
}

impl<T: ByteSpan> Iterator for OverlapGroups<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let anchor = self.pending.take().or_else(|| self.fields.next())?;
        let mut group = vec![anchor];
        for field in self.fields.by_ref() {
            if group[0].overlaps(&field) {
                group.push(field);
            } else {
                self.pending = Some(field);
                break;
            }
        }
        Some(group)
    }
}

/// Partition `fields` into groups of overlapping byte ranges.
///
/// Within a group the widest field at the lowest address comes first. Equal ranges keep
/// their input order.
pub fn group_overlapping<I>(fields: I) -> OverlapGroups<I::Item>
where
    I: IntoIterator,
    I::Item: ByteSpan,
{
    let mut fields: Vec<I::Item> = fields.into_iter().collect();
    fields.sort_by(|a, b| {
        a.offset()
            .cmp(&b.offset())
            .then_with(|| b.offset_end().cmp(&a.offset_end()))
    });
    OverlapGroups {
        fields: fields.into_iter(),
        pending: None,
    }
}
