// Per-period reports: KPI snapshot plus the breakdown tables for each
// requested scope.
use crate::aggregate::{mean_by, sum, AggregationResult};
use crate::error::{Result, SalesError};
use crate::kpi::{compute_snapshot, KpiSnapshot};
use crate::period::PeriodKey;
use crate::types::SalesRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Record subset a breakdown is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "city", rename_all = "snake_case")]
pub enum Scope {
    AllCities,
    City(String),
}

impl Scope {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        match self {
            Scope::AllCities => true,
            Scope::City(name) => record.city == *name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::AllCities => "All Cities",
            Scope::City(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub scope: Scope,
    pub daily_revenue: AggregationResult<NaiveDate>,
    pub revenue_by_product_line: AggregationResult<String>,
    pub revenue_by_payment: AggregationResult<String>,
    pub payment_shares: AggregationResult<String>,
    /// Only computed for `Scope::AllCities`.
    pub revenue_by_city: Option<AggregationResult<String>>,
    /// Mean rating per city; only computed for `Scope::AllCities`.
    ///
    /// The dashboard this replaces drew ratings as a stacked bar per city,
    /// which effectively summed them. A mean keeps the value on the 0-10
    /// rating scale and independent of how many sales a city made.
    pub rating_by_city: Option<AggregationResult<String>>,
}

/// Breakdown tables for `scope` over a period subset. An empty subset
/// yields empty tables, never an error.
pub fn build_breakdowns(period_records: &[&SalesRecord], scope: &Scope) -> Breakdowns {
    let subset: Vec<&SalesRecord> = period_records
        .iter()
        .copied()
        .filter(|r| scope.matches(r))
        .collect();
    debug!(scope = %scope, records = subset.len(), "building breakdowns");

    let daily_revenue = sum(&subset, |r| r.date(), |r| r.total).sorted_by_key();
    let revenue_by_product_line = sum(&subset, |r| r.product_line.clone(), |r| r.total);
    let revenue_by_payment = sum(&subset, |r| r.payment_method.clone(), |r| r.total);
    let payment_shares = revenue_by_payment.shares();

    let (revenue_by_city, rating_by_city) = match scope {
        Scope::AllCities => (
            Some(sum(&subset, |r| r.city.clone(), |r| r.total)),
            Some(mean_by(&subset, |r| r.city.clone(), |r| r.rating)),
        ),
        Scope::City(_) => (None, None),
    };

    Breakdowns {
        scope: scope.clone(),
        daily_revenue,
        revenue_by_product_line,
        revenue_by_payment,
        payment_shares,
        revenue_by_city,
        rating_by_city,
    }
}

/// Distinct periods present in the data, oldest first.
pub fn available_periods(records: &[SalesRecord]) -> Vec<PeriodKey> {
    let mut periods: Vec<PeriodKey> = records.iter().map(|r| r.period_key()).collect();
    periods.sort();
    periods.dedup();
    periods
}

/// Distinct cities in first-seen order.
pub fn cities(records: &[SalesRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for r in records {
        if seen.insert(r.city.as_str()) {
            out.push(r.city.clone());
        }
    }
    out
}

pub fn records_in_period(records: &[SalesRecord], period: PeriodKey) -> Vec<&SalesRecord> {
    records.iter().filter(|r| r.period_key() == period).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthReport {
    pub period: PeriodKey,
    pub label: String,
    pub previous_period: PeriodKey,
    pub record_count: usize,
    pub previous_record_count: usize,
    pub kpis: KpiSnapshot,
    pub breakdowns: Vec<Breakdowns>,
}

/// KPI snapshot for `period` (compared against the calendar month before
/// it) and one breakdown set per scope.
///
/// Fails with `PeriodNotFound` when no record falls in `period`.
pub fn generate_month_report(
    records: &[SalesRecord],
    period: PeriodKey,
    scopes: &[Scope],
) -> Result<MonthReport> {
    let current = records_in_period(records, period);
    if current.is_empty() {
        return Err(SalesError::PeriodNotFound(period));
    }
    let previous_period = period.previous();
    let previous = records_in_period(records, previous_period);
    debug!(
        period = %period,
        records = current.len(),
        previous_records = previous.len(),
        "computing month report"
    );

    let kpis = compute_snapshot(&current, &previous)?;
    let breakdowns = scopes
        .iter()
        .map(|scope| build_breakdowns(&current, scope))
        .collect();

    Ok(MonthReport {
        period,
        label: period.label(),
        previous_period,
        record_count: current.len(),
        previous_record_count: previous.len(),
        kpis,
        breakdowns,
    })
}

/// `AllCities` followed by one scope per city in the data.
pub fn all_scopes(records: &[SalesRecord]) -> Vec<Scope> {
    std::iter::once(Scope::AllCities)
        .chain(cities(records).into_iter().map(Scope::City))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::Growth;

    #[allow(clippy::too_many_arguments)]
    fn rec(
        y: i32,
        m: u32,
        d: u32,
        city: &str,
        product: &str,
        pay: &str,
        total: f64,
        rating: f64,
    ) -> SalesRecord {
        SalesRecord {
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            city: city.to_string(),
            product_line: product.to_string(),
            payment_method: pay.to_string(),
            total,
            rating,
        }
    }

    fn dataset() -> Vec<SalesRecord> {
        vec![
            rec(2019, 1, 5, "Yangon", "Food", "Cash", 60.0, 8.0),
            rec(2019, 1, 5, "Mandalay", "Sports", "Ewallet", 40.0, 6.0),
            rec(2019, 1, 20, "Yangon", "Sports", "Cash", 50.0, 7.0),
            rec(2019, 2, 3, "Naypyitaw", "Food", "Credit card", 200.0, 9.0),
            rec(2019, 4, 1, "Yangon", "Food", "Cash", 10.0, 5.0),
        ]
    }

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn test_available_periods_and_cities() {
        let data = dataset();
        assert_eq!(
            available_periods(&data),
            vec![
                PeriodKey::new(2019, 1),
                PeriodKey::new(2019, 2),
                PeriodKey::new(2019, 4)
            ]
        );
        assert_eq!(cities(&data), vec![s("Yangon"), s("Mandalay"), s("Naypyitaw")]);
        assert_eq!(all_scopes(&data).len(), 4);
    }

    #[test]
    fn test_all_cities_breakdowns() {
        let data = dataset();
        let jan = records_in_period(&data, PeriodKey::new(2019, 1));
        let b = build_breakdowns(&jan, &Scope::AllCities);

        let days: Vec<_> = b.daily_revenue.iter().collect();
        assert_eq!(
            days,
            vec![
                (&NaiveDate::from_ymd_opt(2019, 1, 5).unwrap(), 100.0),
                (&NaiveDate::from_ymd_opt(2019, 1, 20).unwrap(), 50.0),
            ]
        );
        assert_eq!(b.revenue_by_product_line.get(&s("Food")), Some(60.0));
        assert_eq!(b.revenue_by_product_line.get(&s("Sports")), Some(90.0));
        assert_eq!(b.revenue_by_payment.get(&s("Cash")), Some(110.0));
        let city = b.revenue_by_city.as_ref().unwrap();
        assert_eq!(city.get(&s("Yangon")), Some(110.0));
        assert_eq!(city.get(&s("Mandalay")), Some(40.0));
        let rating = b.rating_by_city.as_ref().unwrap();
        assert_eq!(rating.get(&s("Yangon")), Some(7.5));
        assert!((b.payment_shares.total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_city_scope_filters_and_skips_city_tables() {
        let data = dataset();
        let jan = records_in_period(&data, PeriodKey::new(2019, 1));
        let b = build_breakdowns(&jan, &Scope::City(s("Mandalay")));
        assert_eq!(b.daily_revenue.len(), 1);
        assert_eq!(b.revenue_by_payment.get(&s("Ewallet")), Some(40.0));
        assert_eq!(b.revenue_by_payment.get(&s("Cash")), None);
        assert!(b.revenue_by_city.is_none());
        assert!(b.rating_by_city.is_none());
    }

    #[test]
    fn test_empty_scope_gives_empty_tables() {
        let data = dataset();
        let feb = records_in_period(&data, PeriodKey::new(2019, 2));
        let b = build_breakdowns(&feb, &Scope::City(s("Yangon")));
        assert!(b.daily_revenue.is_empty());
        assert!(b.revenue_by_product_line.is_empty());
        assert!(b.revenue_by_payment.is_empty());
        assert!(b.payment_shares.is_empty());
    }

    #[test]
    fn test_month_report_growth() {
        let data = dataset();
        let jan =
            generate_month_report(&data, PeriodKey::new(2019, 1), &[Scope::AllCities]).unwrap();
        assert_eq!(jan.kpis.total_revenue, 150.0);
        assert_eq!(jan.kpis.growth, Growth::Unavailable);
        assert_eq!(jan.previous_record_count, 0);

        let feb = generate_month_report(&data, PeriodKey::new(2019, 2), &[]).unwrap();
        assert_eq!(feb.kpis.total_revenue, 200.0);
        let pct = feb.kpis.growth.percent().unwrap();
        assert!((pct - 100.0 / 3.0).abs() < 1e-9);
        assert!(feb.breakdowns.is_empty());
    }

    #[test]
    fn test_gap_month_does_not_reach_back() {
        // March has no data, so April has no baseline even though February does.
        let data = dataset();
        let apr = generate_month_report(&data, PeriodKey::new(2019, 4), &[]).unwrap();
        assert_eq!(apr.previous_period, PeriodKey::new(2019, 3));
        assert_eq!(apr.kpis.growth, Growth::Unavailable);
    }

    #[test]
    fn test_unknown_period_fails_fast() {
        let data = dataset();
        let err = generate_month_report(&data, PeriodKey::new(2019, 3), &[]).unwrap_err();
        assert!(matches!(err, SalesError::PeriodNotFound(p) if p == PeriodKey::new(2019, 3)));
    }

    #[test]
    fn test_scope_serialization() {
        assert_eq!(
            serde_json::to_string(&Scope::AllCities).unwrap(),
            r#"{"scope":"all_cities"}"#
        );
        assert_eq!(
            serde_json::to_string(&Scope::City(s("Yangon"))).unwrap(),
            r#"{"scope":"city","city":"Yangon"}"#
        );
    }
}
