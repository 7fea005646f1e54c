use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::domain::{CampaignRecord, GridError, SortColumn};
use crate::table::Dataset;

pub const EXPORT_FILE_NAME: &str = "campaign-data.csv";
pub const EXPORT_MIME_TYPE: &str = "text/csv";

fn export_field(record: &CampaignRecord, column: SortColumn) -> String {
    match column {
        SortColumn::Campaign => record.campaign.clone(),
        SortColumn::Channel => record.channel.clone(),
        SortColumn::Clicks => record.clicks.to_string(),
        SortColumn::Conversions => record.conversions.to_string(),
        SortColumn::Revenue => record.revenue.to_string(),
        SortColumn::Ctr => record.ctr.to_string(),
        SortColumn::Status => record.status.to_string(),
        SortColumn::Date => record.date.clone(),
    }
}

/// Writes `rows` (already filtered and sorted, not paginated) as UTF-8 CSV.
///
/// Columns follow the grid header order. Fields holding a comma, quote or
/// line break are quoted, embedded quotes are doubled.
pub fn export_csv(dataset: &Dataset, rows: &[usize]) -> Result<Vec<u8>, GridError> {
    let mut values: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); SortColumn::ALL.len()];
    for &row in rows {
        let record = dataset
            .get(row)
            .ok_or_else(|| GridError::LoadingFailed(format!("Row {row} is not in the dataset")))?;
        for (cidx, column) in SortColumn::ALL.iter().enumerate() {
            values[cidx].push(export_field(record, *column));
        }
    }

    let columns: Vec<Column> = SortColumn::ALL
        .iter()
        .zip(values)
        .map(|(column, data)| Column::new(column.label().into(), data))
        .collect();
    let mut df = DataFrame::new(columns)?;

    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_quote_style(QuoteStyle::Necessary)
        .finish(&mut df)?;
    Ok(buffer)
}

/// Stores an export as `campaign-data.csv` in `dir`, creating the directory if needed.
pub fn write_export(dir: &Path, bytes: &[u8]) -> Result<PathBuf, GridError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, bytes)?;
    info!(
        "Wrote {} bytes of {} to {:?}",
        bytes.len(),
        EXPORT_MIME_TYPE,
        path
    );
    Ok(path)
}
