//! Pagination and filter helpers shared by every listing read model.
//!
//! A listing is built as one filtered `Select`; the total count and the page slice are both taken
//! from that same select so `total_count` can never drift from the windowed items. Pages are
//! 1-based.

use crate::errors::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, PaginatorTrait, SelectorTrait};
use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Largest page size a caller may ask for; bigger requests are clamped.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw paging parameters as supplied by a caller.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page number, defaults to 1
    pub page: Option<i64>,
    /// Items per page, defaults to the configured page size
    pub page_size: Option<i64>,
}

impl PageRequest {
    /// Shorthand for an explicit page and size.
    #[must_use]
    pub const fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

/// Defaults and upper bound applied to every [`PageRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    /// Size used when none is requested
    pub default_size: u64,
    /// Requests above this are clamped down to it
    pub max_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

/// A validated page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number
    pub page: u64,
    /// Items per page, at least 1
    pub page_size: u64,
}

impl PageLimits {
    /// Validates a request against these limits.
    ///
    /// `page < 1` and `page_size <= 0` are rejected; oversized pages are clamped to `max_size`.
    /// A page whose row offset would not fit a signed 64-bit SQL `OFFSET` is rejected too.
    pub fn resolve(&self, request: PageRequest) -> Result<PageWindow> {
        let page = match request.page {
            None => 1,
            Some(page) if page >= 1 => page.unsigned_abs(),
            Some(page) => {
                return Err(Error::validation(format!(
                    "page must be 1 or greater, got {page}"
                )));
            }
        };
        let page_size = match request.page_size {
            None => self.default_size,
            Some(size) if size >= 1 => size.unsigned_abs().min(self.max_size),
            Some(size) => {
                return Err(Error::validation(format!(
                    "pageSize must be 1 or greater, got {size}"
                )));
            }
        };
        let page_size = page_size.max(1);
        let offset = (page - 1).checked_mul(page_size);
        if offset.is_none_or(|offset| i64::try_from(offset).is_err()) {
            return Err(Error::validation(format!(
                "page {page} is out of range for pageSize {page_size}"
            )));
        }
        Ok(PageWindow { page, page_size })
    }
}

/// One page of a listing.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Number of items matching the filters across all pages
    pub total_count: u64,
    /// 1-based page number
    pub page: u64,
    /// Requested page size
    pub page_size: u64,
    /// Number of pages needed for `total_count`
    pub total_pages: u64,
}

impl<T> Paged<T> {
    /// Wraps a page slice together with its window and total.
    #[must_use]
    pub const fn new(items: Vec<T>, total_count: u64, window: PageWindow) -> Self {
        Self {
            items,
            total_count,
            page: window.page,
            page_size: window.page_size,
            total_pages: total_count.div_ceil(window.page_size),
        }
    }

    /// Converts every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Counts the filtered query and fetches the requested window from it.
///
/// The query must already carry a total ordering (ending in a unique column) so that pages are
/// stable. Works for plain entity selects as well as joined `into_model` projections.
pub async fn fetch_page<'db, C, S>(
    db: &'db C,
    query: S,
    window: PageWindow,
) -> Result<Paged<<S::Selector as SelectorTrait>::Item>>
where
    C: ConnectionTrait,
    S: PaginatorTrait<'db, C>,
{
    let paginator = query.paginate(db, window.page_size);
    let total_count = paginator.num_items().await?;
    let items = paginator.fetch_page(window.page - 1).await?;
    Ok(Paged::new(items, total_count, window))
}

/// Inclusive calendar date range used by listing filters.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day included
    pub start_date: Option<NaiveDate>,
    /// Last day included
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// Builds a condition on a timestamp column.
    ///
    /// The end bound is exclusive of the following midnight so the whole end day is included.
    pub fn condition<Col: ColumnTrait>(&self, column: Col) -> Result<Condition> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            return Err(Error::validation(format!(
                "startDate {start} is after endDate {end}"
            )));
        }
        let mut condition = Condition::all();
        if let Some(start) = self.start_date {
            condition = condition.add(column.gte(start_of_day(start)));
        }
        if let Some(end) = self.end_date {
            let next = end
                .checked_add_days(Days::new(1))
                .ok_or_else(|| Error::validation(format!("endDate {end} is out of range")))?;
            condition = condition.add(column.lt(start_of_day(next)));
        }
        Ok(condition)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Normalizes a free-text search box value; blank input means "no filter".
#[must_use]
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|term| !term.is_empty())
        .map(ToOwned::to_owned)
}
