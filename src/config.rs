use std::path::PathBuf;

use clap::Parser;
use derive_setters::Setters;

use crate::domain::{CampaignStatus, ChannelFilter, GridError, SortColumn, SortDirection, StatusFilter};
use crate::pipeline::{DEFAULT_PAGE_SIZE, GridState};

/// Interactive campaign performance grid
#[derive(Parser, Debug)]
#[command(name = "campaign-grid", version, about)]
pub struct Args {
    /// Campaign data file (csv, parquet or arrow). Uses the built-in sample when omitted.
    pub file: Option<String>,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: u64,

    /// Directory that receives campaign-data.csv on export
    #[arg(long, default_value = ".")]
    pub export_dir: String,

    /// Log file (RUST_LOG controls the level)
    #[arg(long, default_value = "campaign-grid.log")]
    pub log_file: String,

    /// Initial search term
    #[arg(long, default_value = "")]
    pub search: String,

    /// Initial status filter: all, active, paused or completed
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Initial channel filter (exact channel label), or "all"
    #[arg(long, default_value = "all")]
    pub channel: String,

    /// Initial sort column
    #[arg(long, value_enum, default_value_t = SortColumn::Date)]
    pub sort: SortColumn,

    /// Sort the initial column ascending instead of newest/largest first
    #[arg(long)]
    pub asc: bool,

    /// Write the filtered and sorted CSV to the export directory and exit
    #[arg(long)]
    pub export_only: bool,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct GridConfig {
    pub data_file: Option<PathBuf>,
    pub page_size: usize,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
    pub event_poll_time: u64,
    pub export_only: bool,
    #[setters(into)]
    pub search: String,
    pub status_filter: StatusFilter,
    pub channel_filter: ChannelFilter,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            data_file: None,
            page_size: DEFAULT_PAGE_SIZE,
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("campaign-grid.log"),
            event_poll_time: 100,
            export_only: false,
            search: String::new(),
            status_filter: StatusFilter::All,
            channel_filter: ChannelFilter::All,
            sort_column: SortColumn::Date,
            sort_direction: SortDirection::Desc,
        }
    }
}

impl GridConfig {
    pub fn from_args(args: Args) -> Result<Self, GridError> {
        let data_file = args.file.as_deref().map(expand_path).transpose()?;
        let sort_direction = if args.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };

        Ok(GridConfig::default()
            .with_data_file(data_file)
            .with_page_size(args.page_size as usize)
            .with_export_dir(expand_path(&args.export_dir)?)
            .with_log_file(expand_path(&args.log_file)?)
            .with_event_poll_time(args.poll_ms)
            .with_export_only(args.export_only)
            .with_search(args.search)
            .with_status_filter(parse_status_filter(&args.status)?)
            .with_channel_filter(parse_channel_filter(&args.channel))
            .with_sort_column(args.sort)
            .with_sort_direction(sort_direction))
    }

    pub fn initial_state(&self) -> GridState {
        let mut state = GridState::new(self.page_size);
        state.set_search_term(self.search.clone());
        state.set_status_filter(self.status_filter.clone());
        state.set_channel_filter(self.channel_filter.clone());
        state.set_sort(self.sort_column, self.sort_direction);
        state
    }
}

/// Expands `~` and environment variables.
pub fn expand_path(raw: &str) -> Result<PathBuf, GridError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| GridError::InvalidConfig(format!("cannot expand {raw:?}: {e}")))
}

pub fn parse_status_filter(raw: &str) -> Result<StatusFilter, GridError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(StatusFilter::All);
    }
    match CampaignStatus::from(raw) {
        CampaignStatus::Unknown(other) => Err(GridError::InvalidConfig(format!(
            "unknown status {other:?}, expected all, active, paused or completed"
        ))),
        status => Ok(StatusFilter::Only(status)),
    }
}

pub fn parse_channel_filter(raw: &str) -> ChannelFilter {
    if raw.trim().eq_ignore_ascii_case("all") {
        ChannelFilter::All
    } else {
        ChannelFilter::Only(raw.to_string())
    }
}
