use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{CampaignRecord, CampaignStatus, GridError, Revenue};

// Every dataset gets its own generation, used as identity by the view cache.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
}

/// Read-only campaign records shared between the model and derived views.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    generation: u64,
    records: Arc<Vec<CampaignRecord>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, records: Vec<CampaignRecord>) -> Self {
        Self::validate(&records);
        Self {
            name: name.into(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            records: Arc::new(records),
        }
    }

    /// The reference campaign snapshot used when no data file is given.
    pub fn sample() -> Self {
        let record = |id: &str,
                      campaign: &str,
                      channel: &str,
                      clicks: u64,
                      conversions: u64,
                      revenue: u64,
                      ctr: f64,
                      status: CampaignStatus,
                      date: &str| CampaignRecord {
            id: id.to_string(),
            campaign: campaign.to_string(),
            channel: channel.to_string(),
            clicks,
            conversions,
            revenue: Revenue::from_units(revenue),
            ctr,
            status,
            date: date.to_string(),
        };

        Self::new(
            "sample",
            vec![
                record("1", "Holiday Sale 2024", "Google Ads", 12450, 234, 23400, 1.88, CampaignStatus::Active, "2024-12-01"),
                record("2", "Black Friday Special", "Facebook Ads", 8920, 156, 18720, 1.75, CampaignStatus::Completed, "2024-11-29"),
                record("3", "Winter Collection", "Instagram", 6780, 89, 12340, 1.31, CampaignStatus::Active, "2024-12-05"),
                record("4", "Year End Clearance", "LinkedIn", 4320, 67, 8950, 1.55, CampaignStatus::Paused, "2024-12-10"),
                record("5", "New Customer Promo", "Twitter", 5670, 92, 11280, 1.62, CampaignStatus::Active, "2024-12-08"),
                record("6", "Retargeting Campaign", "Google Display", 9850, 178, 19650, 1.81, CampaignStatus::Active, "2024-12-12"),
            ],
        )
    }

    pub fn load(path: PathBuf) -> Result<Self, GridError> {
        let file_type = Dataset::check_file(&path)?;
        let start_time = Instant::now();

        let frame = match file_type {
            FileType::Csv => Dataset::load_csv(&path)?,
            FileType::Parquet => Dataset::load_parquet(&path)?,
            FileType::Arrow => Dataset::load_arrow(&path)?,
        };
        let df = frame.collect()?;
        let records = Dataset::records_from_frame(&df)?;

        info!(
            "Loaded {} records from {:?} in {}ms",
            records.len(),
            path,
            start_time.elapsed().as_millis()
        );

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Ok(Dataset::new(name, records))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&CampaignRecord> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct channel labels in order of first appearance.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for record in self.records.iter() {
            if !channels.contains(&record.channel) {
                channels.push(record.channel.clone());
            }
        }
        channels
    }

    // Degenerate rows are reported but kept.
    fn validate(records: &[CampaignRecord]) {
        for record in records {
            if record.conversions > record.clicks {
                warn!(
                    "Record {} has more conversions ({}) than clicks ({})",
                    record.id, record.conversions, record.clicks
                );
            }
            if record.calendar_date().is_none() {
                warn!(
                    "Record {} has an unparseable date \"{}\", it sorts after valid dates",
                    record.id, record.date
                );
            }
            if !record.status.is_known() {
                debug!("Record {} has unknown status \"{}\"", record.id, record.status);
            }
        }
    }

    fn check_file(path: &Path) -> Result<FileType, GridError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GridError::FileNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => GridError::PermissionDenied(path.to_path_buf()),
            _ => GridError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(GridError::LoadingFailed(format!("{path:?} is not a file")));
        }
        Dataset::detect_file_type(path)
    }

    fn detect_file_type(path: &Path) -> Result<FileType, GridError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::Csv),
            Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
            _ => Err(GridError::UnknownFileType(path.to_path_buf())),
        }
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    fn records_from_frame(df: &DataFrame) -> Result<Vec<CampaignRecord>, GridError> {
        let nrows = df.height();
        let ids = match Dataset::find_column(df, "id") {
            Some(column) => Dataset::string_values(column)?,
            None => (1..=nrows).map(|i| i.to_string()).collect(),
        };
        let campaigns = Dataset::string_values(Dataset::required_column(df, "campaign")?)?;
        let channels = Dataset::string_values(Dataset::required_column(df, "channel")?)?;
        let clicks = Dataset::count_values(Dataset::required_column(df, "clicks")?)?;
        let conversions = Dataset::count_values(Dataset::required_column(df, "conversions")?)?;
        let revenue = Dataset::float_values(Dataset::required_column(df, "revenue")?)?;
        let ctr = Dataset::float_values(Dataset::required_column(df, "ctr")?)?;
        let statuses = Dataset::string_values(Dataset::required_column(df, "status")?)?;
        let dates = Dataset::string_values(Dataset::required_column(df, "date")?)?;

        let records = (0..nrows)
            .map(|row| CampaignRecord {
                id: ids[row].clone(),
                campaign: campaigns[row].clone(),
                channel: channels[row].clone(),
                clicks: clicks[row],
                conversions: conversions[row],
                revenue: Revenue::from_f64(revenue[row]),
                ctr: ctr[row],
                status: CampaignStatus::from(statuses[row].as_str()),
                date: dates[row].clone(),
            })
            .collect();
        Ok(records)
    }

    // Header names are matched case-insensitively so exported files load back.
    fn find_column<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Column> {
        df.get_columns()
            .iter()
            .find(|c| c.name().as_str().eq_ignore_ascii_case(name))
    }

    fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, GridError> {
        Dataset::find_column(df, name).ok_or_else(|| GridError::MissingColumn(name.to_string()))
    }

    fn string_values(column: &Column) -> Result<Vec<String>, GridError> {
        let col = column.cast(&DataType::String)?;
        let values = col
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }

    fn count_values(column: &Column) -> Result<Vec<u64>, GridError> {
        let col = column.cast(&DataType::UInt64)?;
        let mut nulls = 0;
        let values = col
            .u64()?
            .into_iter()
            .map(|v| {
                v.unwrap_or_else(|| {
                    nulls += 1;
                    0
                })
            })
            .collect();
        if nulls > 0 {
            warn!("Column {} has {} missing or negative counts, using 0", column.name(), nulls);
        }
        Ok(values)
    }

    fn float_values(column: &Column) -> Result<Vec<f64>, GridError> {
        let col = column.cast(&DataType::Float64)?;
        let mut nulls = 0;
        let values = col
            .f64()?
            .into_iter()
            .map(|v| {
                v.unwrap_or_else(|| {
                    nulls += 1;
                    0.0
                })
            })
            .collect();
        if nulls > 0 {
            warn!("Column {} has {} missing values, using 0", column.name(), nulls);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn sample_has_reference_records() {
        let dataset = Dataset::sample();
        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.records()[0].campaign, "Holiday Sale 2024");
        assert_eq!(dataset.records()[5].revenue, Revenue::from_units(19650));
        assert_eq!(
            dataset.channels(),
            vec![
                "Google Ads",
                "Facebook Ads",
                "Instagram",
                "LinkedIn",
                "Twitter",
                "Google Display"
            ]
        );
    }

    #[test]
    fn every_dataset_has_its_own_generation() {
        let a = Dataset::sample();
        let b = Dataset::sample();
        assert_ne!(a.generation(), b.generation());
        assert_eq!(a.clone().generation(), a.generation());
    }

    #[test]
    fn loads_csv_fixture() {
        let dataset = Dataset::load(fixture("campaigns.csv")).unwrap();
        assert_eq!(dataset.name(), "campaigns.csv");
        assert_eq!(dataset.len(), 12);
        let first = &dataset.records()[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.campaign, "Holiday Sale 2024");
        assert_eq!(first.clicks, 12450);
        assert_eq!(first.revenue, Revenue::from_units(23400));
        assert_eq!(first.status, CampaignStatus::Active);
        assert_eq!(first.date, "2024-12-01");
        assert!(dataset.records().iter().any(|r| r.campaign.contains(',')));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Dataset::load(fixture("does-not-exist.csv")).unwrap_err();
        assert!(matches!(err, GridError::FileNotFound(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let err = Dataset::load(path).unwrap_err();
        assert!(matches!(err, GridError::UnknownFileType(_)));
    }

    #[test]
    fn missing_column_is_reported() {
        let err = Dataset::load(fixture("missing_revenue.csv")).unwrap_err();
        match err {
            GridError::MissingColumn(name) => assert_eq!(name, "revenue"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
