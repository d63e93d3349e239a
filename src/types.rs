use crate::period::PeriodKey;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One input row as it comes off the feed, before any typing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Product line")]
    pub product_line: Option<String>,
    #[serde(rename = "Payment")]
    pub payment: Option<String>,
    #[serde(rename = "Total")]
    pub total: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<String>,
}

impl RawRow {
    /// Compact rendering used in error reports.
    pub fn describe(&self) -> String {
        [
            &self.date,
            &self.time,
            &self.city,
            &self.product_line,
            &self.payment,
            &self.total,
            &self.rating,
        ]
        .iter()
        .map(|f| f.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(";")
    }
}

/// A typed sales record. Records are produced once by ingestion and only
/// ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub timestamp: NaiveDateTime,
    pub city: String,
    pub product_line: String,
    pub payment_method: String,
    pub total: f64,
    pub rating: f64,
}

impl SalesRecord {
    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::from_timestamp(&self.timestamp)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BreakdownRow {
    #[serde(rename = "Key")]
    #[tabled(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PeriodRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Label")]
    #[tabled(rename = "Label")]
    pub label: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: usize,
}
