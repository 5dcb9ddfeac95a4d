//! Byte-range planning for segmented fetches.
//!
//! A resource of `total_length` bytes is split into `segment_count`
//! contiguous, non-overlapping segments of `total_length / segment_count`
//! bytes each; the last segment also absorbs the remainder.
//!
//! # Example
//!
//! ```
//! use rangefetch_core::fetch::plan;
//!
//! let segments = plan(100, 3);
//! let spans: Vec<_> = segments.iter().map(|s| (s.start(), s.end())).collect();
//! assert_eq!(spans, vec![(0, Some(32)), (33, Some(65)), (66, Some(99))]);
//! ```

use std::fmt;

use super::Resource;
use super::constants::MAX_SEGMENT_COUNT;

/// One planned contiguous byte range of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    index: usize,
    start: u64,
    len: u64,
}

impl Segment {
    /// Creates a segment covering `len` bytes starting at `start`.
    #[must_use]
    pub fn new(index: usize, start: u64, len: u64) -> Self {
        Self { index, start, len }
    }

    /// Zero-based position of the segment; merge order follows it.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// First byte of the segment.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte of the segment (inclusive), or `None` for an empty segment.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    /// Number of bytes in the segment (`end - start + 1`).
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the segment holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "#{} [{}-{}]", self.index, self.start, end),
            None => write!(f, "#{} [empty]", self.index),
        }
    }
}

/// Plans the ordered segments covering `[0, total_length - 1]`.
///
/// A `segment_count` of 0 or 1 yields a single whole-resource segment and
/// counts above 256 are capped at 256. A zero-length resource yields one
/// empty segment.
#[must_use]
pub fn plan(total_length: u64, segment_count: u64) -> Vec<Segment> {
    let count = segment_count.clamp(1, MAX_SEGMENT_COUNT);
    let base = total_length / count;
    let remainder = total_length % count;

    (0..count)
        .map(|i| {
            let len = if i == count - 1 { base + remainder } else { base };
            let index = usize::try_from(i).unwrap_or(usize::MAX);
            Segment::new(index, i * base, len)
        })
        .collect()
}

/// Plans the segments for a probed resource, downgrading to a single
/// segment when the server does not serve ranges.
#[must_use]
pub fn plan_for(resource: &Resource, requested: u64) -> Vec<Segment> {
    plan(
        resource.total_length(),
        resource.effective_segment_count(requested),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    /// Checks contiguity, coverage and remainder placement.
    fn assert_covers(segments: &[Segment], total: u64, count: u64) {
        assert_eq!(segments.len() as u64, count.max(1));
        let mut next = 0u64;
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index(), i);
            assert_eq!(segment.start(), next, "gap or overlap before {segment}");
            next += segment.len();
        }
        assert_eq!(next, total, "segments must cover every byte exactly once");

        let count = count.max(1);
        let last = segments.last().unwrap();
        assert_eq!(last.len(), total / count + total % count);
    }

    #[test]
    fn test_plan_scenario_hundred_bytes_three_segments() {
        let segments = plan(100, 3);
        let spans: Vec<_> = segments
            .iter()
            .map(|s| (s.start(), s.end().unwrap(), s.len()))
            .collect();
        assert_eq!(spans, vec![(0, 32, 33), (33, 65, 33), (66, 99, 34)]);
    }

    #[test]
    fn test_plan_single_segment_spans_resource() {
        let segments = plan(1000, 1);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start(), 0);
        assert_eq!(segments[0].end(), Some(999));
    }

    #[test]
    fn test_plan_zero_count_treated_as_one() {
        let segments = plan(10, 0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 10);
    }

    #[test]
    fn test_plan_caps_huge_segment_count() {
        let segments = plan(10, u64::MAX);
        assert_eq!(segments.len() as u64, MAX_SEGMENT_COUNT);
        assert_covers(&segments, 10, MAX_SEGMENT_COUNT);
    }

    #[test]
    fn test_plan_empty_resource_yields_one_empty_segment() {
        let segments = plan(0, 5);
        assert_eq!(segments.len(), 5);
        assert!(segments.iter().all(Segment::is_empty));

        let segments = plan(0, 1);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_empty());
        assert_eq!(segments[0].end(), None);
    }

    #[test]
    fn test_plan_fewer_bytes_than_segments() {
        let segments = plan(5, 30);
        assert_eq!(segments.len(), 30);
        assert!(segments[..29].iter().all(Segment::is_empty));
        assert_eq!(segments[29].start(), 0);
        assert_eq!(segments[29].end(), Some(4));
    }

    #[test]
    fn test_plan_coverage_over_many_shapes() {
        for total in [0u64, 1, 2, 7, 99, 100, 101, 1024, 65_537] {
            for count in [1u64, 2, 3, 7, 8, 30, 64] {
                assert_covers(&plan(total, count), total, count);
            }
        }
    }

    #[test]
    fn test_plan_for_downgrades_without_range_support() {
        let url = Url::parse("https://example.com/a.bin").unwrap();
        let resource = Resource::new(&url, 100, false);
        let segments = plan_for(&resource, 30);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end(), Some(99));
    }

    #[test]
    fn test_plan_for_keeps_count_with_range_support() {
        let url = Url::parse("https://example.com/a.bin").unwrap();
        let resource = Resource::new(&url, 100, true);
        assert_eq!(plan_for(&resource, 7).len(), 7);
    }

    #[test]
    fn test_segment_display() {
        assert_eq!(Segment::new(2, 66, 34).to_string(), "#2 [66-99]");
        assert_eq!(Segment::new(0, 0, 0).to_string(), "#0 [empty]");
    }
}
