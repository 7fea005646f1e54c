use crate::domain::{CampaignRecord, CampaignStatus, Revenue, SortColumn, parse_calendar_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    Positive,
    Warning,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub class: StyleClass,
}

/// Unknown statuses get their own label but share the completed styling.
pub fn status_badge(status: &CampaignStatus) -> StatusBadge {
    match status {
        CampaignStatus::Active => StatusBadge {
            label: "Active",
            class: StyleClass::Positive,
        },
        CampaignStatus::Paused => StatusBadge {
            label: "Paused",
            class: StyleClass::Warning,
        },
        CampaignStatus::Completed => StatusBadge {
            label: "Completed",
            class: StyleClass::Muted,
        },
        CampaignStatus::Unknown(_) => StatusBadge {
            label: "Unknown",
            class: StyleClass::Muted,
        },
    }
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, chr) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(chr);
    }
    out
}

pub fn format_revenue(revenue: Revenue) -> String {
    if revenue.fraction() == 0 {
        format!("${}", group_thousands(revenue.units()))
    } else {
        format!(
            "${}.{:02}",
            group_thousands(revenue.units()),
            revenue.fraction()
        )
    }
}

pub fn format_ctr(ctr: f64) -> String {
    format!("{ctr}%")
}

/// `M/D/YYYY`, or the raw text when it is not a date.
pub fn format_date(raw: &str) -> String {
    match parse_calendar_date(raw) {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => raw.to_string(),
    }
}

pub fn cell_text(record: &CampaignRecord, column: SortColumn) -> String {
    match column {
        SortColumn::Campaign => record.campaign.clone(),
        SortColumn::Channel => record.channel.clone(),
        SortColumn::Clicks => group_thousands(record.clicks),
        SortColumn::Conversions => record.conversions.to_string(),
        SortColumn::Revenue => format_revenue(record.revenue),
        SortColumn::Ctr => format_ctr(record.ctr),
        SortColumn::Status => status_badge(&record.status).label.to_string(),
        SortColumn::Date => format_date(&record.date),
    }
}
