//! Filter, sort and paginate stages of the campaign grid.
//!
//! All stages work on row indices into a [`Dataset`] and never copy records.
//! [`GridState`] carries the user driven inputs, [`derive_view`] turns
//! `(dataset, state)` into a [`DerivedView`], and [`ViewCache`] memoizes the
//! filter and sort work for repeated derivations with the same inputs.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::domain::{
    CampaignRecord, ChannelFilter, SortColumn, SortDirection, StatusFilter, parse_calendar_date,
};
use crate::table::Dataset;

pub const DEFAULT_PAGE_SIZE: usize = 5;

pub type Comparator = fn(&CampaignRecord, &CampaignRecord) -> Ordering;

/// Transient grid inputs. Mutated only through the handler methods below.
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    sort_column: SortColumn,
    sort_direction: SortDirection,
    search_term: String,
    status_filter: StatusFilter,
    channel_filter: ChannelFilter,
    current_page: usize,
    page_size: usize,
}

impl Default for GridState {
    fn default() -> Self {
        GridState::new(DEFAULT_PAGE_SIZE)
    }
}

impl GridState {
    /// Newest campaigns first, no filters, page 1.
    pub fn new(page_size: usize) -> Self {
        GridState {
            sort_column: SortColumn::Date,
            sort_direction: SortDirection::Desc,
            search_term: String::new(),
            status_filter: StatusFilter::All,
            channel_filter: ChannelFilter::All,
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn sort_column(&self) -> SortColumn {
        self.sort_column
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn status_filter(&self) -> &StatusFilter {
        &self.status_filter
    }

    pub fn channel_filter(&self) -> &ChannelFilter {
        &self.channel_filter
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term == self.search_term {
            return false;
        }
        trace!("Search term {:?} -> {:?}", self.search_term, term);
        self.search_term = term;
        true
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) -> bool {
        if filter == self.status_filter {
            return false;
        }
        trace!("Status filter {:?} -> {:?}", self.status_filter, filter);
        self.status_filter = filter;
        true
    }

    pub fn set_channel_filter(&mut self, filter: ChannelFilter) -> bool {
        if filter == self.channel_filter {
            return false;
        }
        trace!("Channel filter {:?} -> {:?}", self.channel_filter, filter);
        self.channel_filter = filter;
        true
    }

    pub fn cycle_status_filter(&mut self) -> bool {
        let next = self.status_filter.next();
        self.set_status_filter(next)
    }

    /// All -> each channel in turn -> All. A channel missing from `channels` falls back to All.
    pub fn cycle_channel_filter(&mut self, channels: &[String]) -> bool {
        let next = match &self.channel_filter {
            ChannelFilter::All => channels.first().cloned(),
            ChannelFilter::Only(current) => channels
                .iter()
                .position(|c| c == current)
                .and_then(|idx| channels.get(idx + 1))
                .cloned(),
        };
        self.set_channel_filter(next.map(ChannelFilter::Only).unwrap_or(ChannelFilter::All))
    }

    pub fn reset_filters(&mut self) -> bool {
        let search = self.set_search_term(String::new());
        let status = self.set_status_filter(StatusFilter::All);
        let channel = self.set_channel_filter(ChannelFilter::All);
        search || status || channel
    }

    /// Header click: same column toggles the direction, a new column starts ascending.
    pub fn sort_by(&mut self, column: SortColumn) {
        if column == self.sort_column {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_column = column;
            self.sort_direction = SortDirection::Asc;
        }
        trace!("Sorting by {:?} {:?}", self.sort_column, self.sort_direction);
    }

    pub fn set_sort(&mut self, column: SortColumn, direction: SortDirection) {
        self.sort_column = column;
        self.sort_direction = direction;
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.current_page -= 1;
        true
    }

    pub fn next_page(&mut self, total_pages: usize) -> bool {
        if self.current_page >= total_pages {
            return false;
        }
        self.current_page += 1;
        true
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1, 1)
    }

    pub fn last_page(&mut self, total_pages: usize) -> bool {
        self.go_to_page(total_pages, total_pages)
    }

    /// Pages outside `1..=total_pages` are ignored.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> bool {
        if page < 1 || page > total_pages.max(1) || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    /// Resets to page 1 when the current page no longer exists.
    pub fn settle_page(&mut self, total_pages: usize) -> bool {
        if self.current_page > total_pages.max(1) {
            trace!(
                "Page {} beyond {} pages, resetting to page 1",
                self.current_page, total_pages
            );
            self.current_page = 1;
            return true;
        }
        false
    }
}

pub fn matches_filters(
    record: &CampaignRecord,
    needle: &str,
    status_filter: &StatusFilter,
    channel_filter: &ChannelFilter,
) -> bool {
    let matches_search = needle.is_empty()
        || record.campaign.to_lowercase().contains(needle)
        || record.channel.to_lowercase().contains(needle);
    matches_search && status_filter.matches(&record.status) && channel_filter.matches(&record.channel)
}

/// Keeps the rows of `rows` that pass search, status and channel filters, in their given order.
pub fn filter_rows(
    records: &[CampaignRecord],
    rows: &[usize],
    search_term: &str,
    status_filter: &StatusFilter,
    channel_filter: &ChannelFilter,
) -> Vec<usize> {
    let needle = search_term.to_lowercase();
    rows.iter()
        .copied()
        .filter(|&idx| matches_filters(&records[idx], &needle, status_filter, channel_filter))
        .collect()
}

pub fn filter(
    records: &[CampaignRecord],
    search_term: &str,
    status_filter: &StatusFilter,
    channel_filter: &ChannelFilter,
) -> Vec<usize> {
    let all: Vec<usize> = (0..records.len()).collect();
    filter_rows(records, &all, search_term, status_filter, channel_filter)
}

/// Case-folded comparison, lower case first when the folded text is equal.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

/// Valid calendar dates first, in chronological order, then unparseable text lexically.
pub fn compare_dates(a: &str, b: &str) -> Ordering {
    match (parse_calendar_date(a), parse_calendar_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn by_campaign(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    collate(&a.campaign, &b.campaign)
}

fn by_channel(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    collate(&a.channel, &b.channel)
}

fn by_clicks(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    a.clicks.cmp(&b.clicks)
}

fn by_conversions(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    a.conversions.cmp(&b.conversions)
}

fn by_revenue(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    a.revenue.cmp(&b.revenue)
}

fn by_ctr(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    a.ctr.total_cmp(&b.ctr)
}

fn by_status(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    collate(a.status.as_str(), b.status.as_str())
}

fn by_date(a: &CampaignRecord, b: &CampaignRecord) -> Ordering {
    compare_dates(&a.date, &b.date)
}

pub fn comparator(column: SortColumn) -> Comparator {
    match column {
        SortColumn::Campaign => by_campaign,
        SortColumn::Channel => by_channel,
        SortColumn::Clicks => by_clicks,
        SortColumn::Conversions => by_conversions,
        SortColumn::Revenue => by_revenue,
        SortColumn::Ctr => by_ctr,
        SortColumn::Status => by_status,
        SortColumn::Date => by_date,
    }
}

/// Stable sort. Descending reverses the comparison, so ties keep their input order.
pub fn sort(
    records: &[CampaignRecord],
    rows: &mut [usize],
    column: SortColumn,
    direction: SortDirection,
) {
    let compare = comparator(column);
    rows.sort_by(|&a, &b| {
        let ordering = compare(&records[a], &records[b]);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn filter_and_sort(records: &[CampaignRecord], state: &GridState) -> Vec<usize> {
    let mut rows = filter(
        records,
        &state.search_term,
        &state.status_filter,
        &state.channel_filter,
    );
    sort(records, &mut rows, state.sort_column, state.sort_direction);
    rows
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// One page of a row sequence, as half-open `start..end` offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl PageWindow {
    pub fn items<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        &rows[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn summary(&self) -> String {
        if self.total == 0 {
            "No results".to_string()
        } else {
            format!(
                "Showing {} to {} of {} results",
                self.start + 1,
                self.end,
                self.total
            )
        }
    }
}

/// The requested page is clamped into `1..=total_pages`.
pub fn paginate(len: usize, page_size: usize, current_page: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = total_pages(len, page_size);
    let page = current_page.clamp(1, total_pages);
    let start = ((page - 1) * page_size).min(len);
    let end = (start + page_size).min(len);
    PageWindow {
        page,
        total_pages,
        page_size,
        start,
        end,
        total: len,
    }
}

/// Filtered and sorted rows plus the current page window over them.
#[derive(Debug, Clone)]
pub struct DerivedView {
    rows: Arc<Vec<usize>>,
    window: PageWindow,
}

impl DerivedView {
    pub fn new(rows: Arc<Vec<usize>>, state: &GridState) -> Self {
        let window = paginate(rows.len(), state.page_size, state.current_page);
        DerivedView { rows, window }
    }

    pub fn empty() -> Self {
        DerivedView::new(Arc::new(Vec::new()), &GridState::default())
    }

    /// All matching rows, unpaginated.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn page_rows(&self) -> &[usize] {
        self.window.items(&self.rows)
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn total_pages(&self) -> usize {
        self.window.total_pages
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn derive_view(dataset: &Dataset, state: &GridState) -> DerivedView {
    DerivedView::new(Arc::new(filter_and_sort(dataset.records(), state)), state)
}

#[derive(Debug, Clone, PartialEq)]
struct QueryKey {
    generation: u64,
    search_term: String,
    status_filter: StatusFilter,
    channel_filter: ChannelFilter,
    sort_column: SortColumn,
    sort_direction: SortDirection,
}

impl QueryKey {
    fn new(dataset: &Dataset, state: &GridState) -> Self {
        QueryKey {
            generation: dataset.generation(),
            search_term: state.search_term.clone(),
            status_filter: state.status_filter.clone(),
            channel_filter: state.channel_filter.clone(),
            sort_column: state.sort_column,
            sort_direction: state.sort_direction,
        }
    }
}

/// Remembers the last filter+sort result. Page changes alone never recompute.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<QueryKey>,
    rows: Arc<Vec<usize>>,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    pub fn derive(&mut self, dataset: &Dataset, state: &GridState) -> DerivedView {
        let key = QueryKey::new(dataset, state);
        if self.key.as_ref() == Some(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.rows = Arc::new(filter_and_sort(dataset.records(), state));
            trace!(
                "Recomputed view for dataset {}: {} of {} rows",
                dataset.generation(),
                self.rows.len(),
                dataset.len()
            );
            self.key = Some(key);
        }
        DerivedView::new(Arc::clone(&self.rows), state)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
