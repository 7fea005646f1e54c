use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::presentation::status_badge;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const HELP_TEXT: &str = "\
Campaign Grid

  /          Search campaign and channel
  s          Cycle status filter
  c          Cycle channel filter
  r          Reset search and filters
  1 .. 8     Sort by column (again to toggle direction)
  Left  / p  Previous page
  Right / n  Next page
  Home / End First / last page
  g          Go to page
  Up / Down  Move row selection
  e          Export filtered rows to CSV
  ?          Show this help
  Esc        Close popup / clear search
  q          Quit";

#[derive(Debug, Error)]
pub enum GridError {
    #[error("I/O error: {0}")]
    IoError(#[from] Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Loading failed: {0}")]
    LoadingFailed(String),
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),
    #[error("Unknown file type: {0:?}")]
    UnknownFileType(PathBuf),
    #[error("Missing required column \"{0}\"")]
    MissingColumn(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Monetary amount held in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revenue(u64);

impl Revenue {
    pub fn from_cents(cents: u64) -> Self {
        Revenue(cents)
    }

    pub fn from_units(units: u64) -> Self {
        Revenue(units.saturating_mul(100))
    }

    /// Negative, NaN and infinite amounts become zero.
    pub fn from_f64(amount: f64) -> Self {
        if amount.is_finite() && amount > 0.0 {
            Revenue((amount * 100.0).round() as u64)
        } else {
            Revenue(0)
        }
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn units(&self) -> u64 {
        self.0 / 100
    }

    pub fn fraction(&self) -> u64 {
        self.0 % 100
    }
}

impl fmt::Display for Revenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction() == 0 {
            write!(f, "{}", self.units())
        } else {
            write!(f, "{}.{:02}", self.units(), self.fraction())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
    /// Any status text outside the three known ones, kept verbatim.
    Unknown(String),
}

impl CampaignStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CampaignStatus::Unknown(_))
    }
}

impl From<&str> for CampaignStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" => CampaignStatus::Active,
            "paused" => CampaignStatus::Paused,
            "completed" => CampaignStatus::Completed,
            _ => CampaignStatus::Unknown(raw.to_string()),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One campaign/channel performance snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub id: String,
    pub campaign: String,
    pub channel: String,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: Revenue,
    /// Click-through rate in percent, supplied as is and not derived from clicks.
    pub ctr: f64,
    pub status: CampaignStatus,
    /// ISO 8601 date text.
    pub date: String,
}

impl CampaignRecord {
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_calendar_date(&self.date)
    }
}

/// Accepts plain ISO dates, RFC 3339 timestamps and naive ISO date-times.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|d| d.date())
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SortColumn {
    Campaign,
    Channel,
    Clicks,
    Conversions,
    Revenue,
    Ctr,
    Status,
    Date,
}

impl SortColumn {
    /// Display and export order.
    pub const ALL: [SortColumn; 8] = [
        SortColumn::Campaign,
        SortColumn::Channel,
        SortColumn::Clicks,
        SortColumn::Conversions,
        SortColumn::Revenue,
        SortColumn::Ctr,
        SortColumn::Status,
        SortColumn::Date,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Campaign => "Campaign",
            SortColumn::Channel => "Channel",
            SortColumn::Clicks => "Clicks",
            SortColumn::Conversions => "Conversions",
            SortColumn::Revenue => "Revenue",
            SortColumn::Ctr => "CTR",
            SortColumn::Status => "Status",
            SortColumn::Date => "Date",
        }
    }

    pub fn from_index(idx: usize) -> Option<SortColumn> {
        Self::ALL.get(idx).copied()
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SortColumn::Clicks | SortColumn::Conversions | SortColumn::Revenue | SortColumn::Ctr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CampaignStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: &CampaignStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    /// All -> Active -> Paused -> Completed -> All
    pub fn next(&self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::Only(CampaignStatus::Active),
            StatusFilter::Only(CampaignStatus::Active) => StatusFilter::Only(CampaignStatus::Paused),
            StatusFilter::Only(CampaignStatus::Paused) => {
                StatusFilter::Only(CampaignStatus::Completed)
            }
            StatusFilter::Only(_) => StatusFilter::All,
        }
    }

    /// Selector text, using the same wording as the status badges.
    pub fn label(&self) -> String {
        match self {
            StatusFilter::All => "All Status".to_string(),
            StatusFilter::Only(status) => status_badge(status).label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ChannelFilter {
    #[default]
    All,
    Only(String),
}

impl ChannelFilter {
    /// Exact, case-sensitive match.
    pub fn matches(&self, channel: &str) -> bool {
        match self {
            ChannelFilter::All => true,
            ChannelFilter::Only(wanted) => wanted == channel,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ChannelFilter::All => "All Channels".to_string(),
            ChannelFilter::Only(channel) => channel.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    SearchTable,
    GotoPage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Search,
    GotoPage,
    RawKey(KeyEvent),
    CycleStatusFilter,
    CycleChannelFilter,
    ResetFilters,
    SortBy(SortColumn),
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    MoveUp,
    MoveDown,
    Export,
    Resize(usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(CampaignStatus::from("Active"), CampaignStatus::Active);
        assert_eq!(CampaignStatus::from(" PAUSED "), CampaignStatus::Paused);
        assert_eq!(CampaignStatus::from("completed"), CampaignStatus::Completed);
        assert_eq!(
            CampaignStatus::from("archived"),
            CampaignStatus::Unknown("archived".to_string())
        );
        assert!(!CampaignStatus::from("archived").is_known());
    }

    #[test]
    fn revenue_formats_without_empty_cents() {
        assert_eq!(Revenue::from_units(23400).to_string(), "23400");
        assert_eq!(Revenue::from_cents(2340050).to_string(), "23400.50");
        assert_eq!(Revenue::from_f64(19.999).to_string(), "20");
        assert_eq!(Revenue::from_f64(-5.0), Revenue::default());
        assert_eq!(Revenue::from_f64(f64::NAN), Revenue::default());
    }

    #[test]
    fn calendar_dates_accept_iso_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 1);
        assert_eq!(parse_calendar_date("2024-12-01"), expected);
        assert_eq!(parse_calendar_date("2024-12-01T08:30:00Z"), expected);
        assert_eq!(parse_calendar_date("2024-12-01T08:30:00"), expected);
        assert_eq!(parse_calendar_date("12/01/2024"), None);
        assert_eq!(parse_calendar_date(""), None);
    }

    #[test]
    fn status_filter_cycles_through_known_statuses() {
        let mut filter = StatusFilter::All;
        let mut seen = Vec::new();
        for _ in 0..4 {
            filter = filter.next();
            seen.push(filter.clone());
        }
        assert_eq!(
            seen,
            vec![
                StatusFilter::Only(CampaignStatus::Active),
                StatusFilter::Only(CampaignStatus::Paused),
                StatusFilter::Only(CampaignStatus::Completed),
                StatusFilter::All,
            ]
        );
        assert_eq!(
            StatusFilter::Only(CampaignStatus::Unknown("x".into())).next(),
            StatusFilter::All
        );
    }

    #[test]
    fn channel_filter_is_exact() {
        let filter = ChannelFilter::Only("Google Ads".to_string());
        assert!(filter.matches("Google Ads"));
        assert!(!filter.matches("google ads"));
        assert!(!filter.matches("Google Display"));
        assert!(ChannelFilter::All.matches("anything"));
    }

    #[test]
    fn sort_columns_keep_header_order() {
        let labels: Vec<&str> = SortColumn::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec!["Campaign", "Channel", "Clicks", "Conversions", "Revenue", "CTR", "Status", "Date"]
        );
        assert_eq!(SortColumn::from_index(4), Some(SortColumn::Revenue));
        assert_eq!(SortColumn::from_index(8), None);
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
    }

    #[test]
    fn status_filter_labels_read_like_badges() {
        assert_eq!(StatusFilter::All.label(), "All Status");
        assert_eq!(StatusFilter::Only(CampaignStatus::Active).label(), "Active");
        assert_eq!(StatusFilter::Only(CampaignStatus::Paused).label(), "Paused");
        assert_eq!(
            StatusFilter::Only(CampaignStatus::Completed).label(),
            "Completed"
        );
    }
}
