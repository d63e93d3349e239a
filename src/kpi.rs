// Headline KPIs for one reporting period.
use crate::aggregate::{arg_max_by_sum, mean, mode, total};
use crate::error::Result;
use crate::types::SalesRecord;
use serde::Serialize;
use std::borrow::Borrow;

/// Month-over-month revenue growth.
///
/// `Unavailable` means there was no usable baseline; it is never folded
/// into a 0% change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "percent", rename_all = "snake_case")]
pub enum Growth {
    Available(f64),
    Unavailable,
}

impl Growth {
    /// Growth of `current` over `previous`; unavailable unless the
    /// baseline is strictly positive.
    pub fn between(current: f64, previous: Option<f64>) -> Growth {
        match previous {
            Some(prev) if prev > 0.0 => Growth::Available((current - prev) / prev * 100.0),
            _ => Growth::Unavailable,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Growth::Available(p) => Some(*p),
            Growth::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Growth::Available(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_revenue: f64,
    pub average_rating: f64,
    pub top_city: String,
    pub top_payment: String,
    pub top_product: String,
    pub growth: Growth,
}

/// Computes the five headline values over `current` and the growth
/// against `previous`.
///
/// `current` must be non-empty; an empty slice yields `EmptyInput`.
/// `previous` may be empty.
pub fn compute_snapshot<R: Borrow<SalesRecord>>(
    current: &[R],
    previous: &[R],
) -> Result<KpiSnapshot> {
    let total_revenue = total(current, |r| as_record(r).total);
    let average_rating = mean(current, |r| as_record(r).rating)?;
    let top_city = arg_max_by_sum(
        current,
        |r| as_record(r).city.clone(),
        |r| as_record(r).total,
    )?;
    let top_payment = mode(current, |r| as_record(r).payment_method.clone())?;
    let top_product = arg_max_by_sum(
        current,
        |r| as_record(r).product_line.clone(),
        |r| as_record(r).total,
    )?;

    // no records at all in the previous month is not the same as a zero baseline,
    // but both leave growth unavailable
    let previous_revenue =
        (!previous.is_empty()).then(|| total(previous, |r| as_record(r).total));
    let growth = Growth::between(total_revenue, previous_revenue);

    Ok(KpiSnapshot {
        total_revenue,
        average_rating,
        top_city,
        top_payment,
        top_product,
        growth,
    })
}

fn as_record<R: Borrow<SalesRecord>>(r: &R) -> &SalesRecord {
    r.borrow()
}
