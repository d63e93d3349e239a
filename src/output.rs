// Console previews and file exports. Everything here is presentation:
// number formatting, currency prefixes and percentage signs stay out of
// the computation modules.
use crate::aggregate::AggregationResult;
use crate::error::Result;
use crate::kpi::{Growth, KpiSnapshot};
use crate::period::PeriodKey;
use crate::reports::{Breakdowns, MonthReport, Scope};
use crate::types::{BreakdownRow, KpiRow, PeriodRow, SalesRecord};
use crate::util::{format_money, format_number, format_percent_signed};
use serde::Serialize;
use std::fmt::Display;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn render_table<T: Tabled + Clone>(rows: &[T], max_rows: usize) -> String {
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn growth_text(growth: &Growth) -> String {
    match growth.percent() {
        Some(p) => format_percent_signed(p),
        None => "N/A".to_string(),
    }
}

pub fn kpi_rows(kpis: &KpiSnapshot, currency: &str) -> Vec<KpiRow> {
    let row = |metric: &str, value: String| KpiRow {
        metric: metric.to_string(),
        value,
    };
    vec![
        row("Total Revenue (Month)", format_money(currency, kpis.total_revenue)),
        row("Customer Satisfaction (0-10)", format_number(kpis.average_rating, 2)),
        row("Top Performing City", kpis.top_city.clone()),
        row("Most Used Payment", kpis.top_payment.clone()),
        row("Top Product Line", kpis.top_product.clone()),
        row("MoM Revenue Growth", growth_text(&kpis.growth)),
    ]
}

pub fn breakdown_rows<K>(
    table: &AggregationResult<K>,
    fmt_value: impl Fn(f64) -> String,
) -> Vec<BreakdownRow>
where
    K: Eq + Hash + Clone + Display,
{
    table
        .iter()
        .map(|(k, v)| BreakdownRow {
            key: k.to_string(),
            value: fmt_value(v),
        })
        .collect()
}

pub fn period_rows(records: &[SalesRecord], periods: &[PeriodKey]) -> Vec<PeriodRow> {
    periods
        .iter()
        .map(|p| PeriodRow {
            period: p.to_string(),
            label: p.label(),
            records: records.iter().filter(|r| r.period_key() == *p).count(),
        })
        .collect()
}

/// Named breakdown tables of one scope, as display rows.
pub fn breakdown_tables(
    b: &Breakdowns,
    currency: &str,
) -> Vec<(&'static str, Vec<BreakdownRow>)> {
    let money = |v: f64| format_money(currency, v);
    let mut tables = vec![
        ("daily_revenue", breakdown_rows(&b.daily_revenue, money)),
        (
            "revenue_by_product_line",
            breakdown_rows(&b.revenue_by_product_line.sorted_by_value_desc(), money),
        ),
        ("revenue_by_payment", breakdown_rows(&b.revenue_by_payment, money)),
        (
            "payment_shares",
            breakdown_rows(&b.payment_shares, |v| format!("{}%", format_number(v, 1))),
        ),
    ];
    if let Some(city) = &b.revenue_by_city {
        tables.push(("revenue_by_city", breakdown_rows(city, money)));
    }
    if let Some(rating) = &b.rating_by_city {
        tables.push(("rating_by_city", breakdown_rows(rating, |v| format_number(v, 2))));
    }
    tables
}

pub fn print_report(report: &MonthReport, currency: &str, max_rows: usize) {
    println!("Sales Dashboard");
    println!("Data for: {} ({} records)\n", report.label, report.record_count);
    println!("{}\n", render_table(&kpi_rows(&report.kpis, currency), usize::MAX));

    for b in &report.breakdowns {
        println!("== {} ==\n", b.scope);
        for (name, rows) in breakdown_tables(b, currency) {
            println!("{}", title_of(name));
            println!("{}\n", render_table(&rows, max_rows));
        }
    }
}

/// Writes `kpis.csv`, `report.json` and one CSV per breakdown table per
/// scope into `dir`. Returns the written paths.
pub fn export_report(dir: &Path, report: &MonthReport, currency: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let kpi_path = dir.join("kpis.csv");
    write_csv(&kpi_path, &kpi_rows(&report.kpis, currency))?;
    written.push(kpi_path);

    for b in &report.breakdowns {
        for (name, rows) in breakdown_tables(b, currency) {
            let path = dir.join(format!("{}_{}.csv", scope_slug(&b.scope), name));
            write_csv(&path, &rows)?;
            written.push(path);
        }
    }

    let json_path = dir.join("report.json");
    write_json(&json_path, report)?;
    written.push(json_path);
    Ok(written)
}

fn title_of(name: &str) -> String {
    match name {
        "daily_revenue" => "Daily Revenue",
        "revenue_by_product_line" => "Revenue by Product Line",
        "revenue_by_payment" => "Revenue by Payment Method",
        "payment_shares" => "Payment Method Share",
        "revenue_by_city" => "Total Revenue by Branch",
        "rating_by_city" => "Customer Rating by Branch",
        other => other,
    }
    .to_string()
}

pub fn scope_slug(scope: &Scope) -> String {
    match scope {
        Scope::AllCities => "all".to_string(),
        Scope::City(name) => name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect(),
    }
}
