//! Page offset arithmetic for the search endpoint.
//!
//! The search endpoint returns at most [`DEFAULT_PAGE_SIZE`] products per
//! request and stops serving consistent data past [`DEFAULT_OFFSET_CEILING`].
//! Given the total reported by the first page, [`page_offsets`] yields the
//! exact set of further `startIndex` values needed to cover the rest.

/// Products returned per request. Larger page sizes return nothing or
/// inconsistent data.
pub const DEFAULT_PAGE_SIZE: u32 = 48;

/// Highest total the endpoint can page through.
pub const DEFAULT_OFFSET_CEILING: u32 = 720;

/// Result of planning the remaining pages for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    /// Offsets after the first page, ascending, all strictly below the
    /// effective total.
    pub offsets: Vec<u32>,
    /// Set when the reported total exceeded the ceiling and was clamped.
    pub clamped_from: Option<u64>,
}

/// Plan the offsets that remain after page 0 for a reported `total`.
///
/// - `total <= page_size`: nothing more to fetch.
/// - `total > ceiling`: clamp to `ceiling` and report the original total.
/// - otherwise `[page_size, 2 * page_size, ...]` strictly below the total.
///
/// `page_size` must be non-zero.
pub fn page_offsets(total: u64, page_size: u32, ceiling: u32) -> PagePlan {
    debug_assert!(page_size > 0, "page size must be non-zero");

    let clamped_from = (total > u64::from(ceiling)).then_some(total);
    let effective = total.min(u64::from(ceiling));

    let offsets = if effective <= u64::from(page_size) {
        Vec::new()
    } else {
        // effective <= ceiling, so it fits in u32
        (page_size..effective as u32)
            .step_by(page_size as usize)
            .collect()
    };

    PagePlan {
        offsets,
        clamped_from,
    }
}
