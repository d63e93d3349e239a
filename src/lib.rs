//! Monthly sales analytics over a transactional record feed.
//!
//! The pipeline is: [`loader`] types raw rows (mixed date layouts, locale
//! decimals) into [`SalesRecord`]s sorted by time; [`period`] buckets them
//! into calendar months; [`kpi`] and [`reports`] reduce a selected month
//! into headline KPIs and per-scope breakdown tables using the group-by
//! primitives in [`aggregate`]. [`output`] renders and exports results.
pub mod aggregate;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod period;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{MalformedRecord, Result, SalesError};
pub use kpi::{Growth, KpiSnapshot};
pub use period::PeriodKey;
pub use reports::{Breakdowns, MonthReport, Scope};
pub use types::SalesRecord;
