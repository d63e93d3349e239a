use crate::error::{MalformedRecord, Result};
use crate::types::{RawRow, SalesRecord};
use crate::util::{parse_f64_safe, parse_time_safe, parse_timestamp, NumberFormat};
use csv::{ByteRecord, ReaderBuilder};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// What to do with a row that cannot be typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Stop at the first malformed row and return it as the error.
    #[default]
    Abort,
    /// Drop malformed rows and list them in `IngestReport::rejected`.
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub number_format: NumberFormat,
    pub policy: MalformedPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b';',
            number_format: NumberFormat::default(),
            policy: MalformedPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: Vec<MalformedRecord>,
}

/// Type raw rows into records sorted ascending by timestamp.
///
/// Rows with equal timestamps keep their input order.
pub fn ingest<I>(rows: I, opts: &LoadOptions) -> Result<(Vec<SalesRecord>, IngestReport)>
where
    I: IntoIterator<Item = RawRow>,
{
    ingest_indexed(rows.into_iter().map(Ok).enumerate(), opts)
}

/// Read a delimited file with a header row and ingest it.
pub fn load_csv<P: AsRef<Path>>(
    path: P,
    opts: &LoadOptions,
) -> Result<(Vec<SalesRecord>, IngestReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (records, report) = load_from_reader(file, opts)?;
    info!(
        path = %path.display(),
        rows = report.total_rows,
        accepted = report.accepted,
        rejected = report.rejected.len(),
        "loaded sales file"
    );
    Ok((records, report))
}

/// Like `load_csv`, over any reader. A row the csv decoder rejects is
/// handled as a malformed row under the configured policy, carrying its
/// cells (invalid UTF-8 replaced) as content.
pub fn load_from_reader<R: Read>(
    reader: R,
    opts: &LoadOptions,
) -> Result<(Vec<SalesRecord>, IngestReport)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.byte_headers()?.clone();

    let rows = rdr.byte_records().enumerate().map(|(index, result)| {
        let undecodable = |e: csv::Error, content: String| MalformedRecord {
            index,
            reason: format!("undecodable row: {e}"),
            content,
        };
        let row = match result {
            Ok(record) => record
                .deserialize::<RawRow>(Some(&headers))
                .map_err(|e| undecodable(e, lossy_content(&record))),
            Err(e) => Err(undecodable(e, String::new())),
        };
        (index, row)
    });
    ingest_indexed(rows, opts)
}

fn lossy_content(record: &ByteRecord) -> String {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(";")
}

fn ingest_indexed<I>(rows: I, opts: &LoadOptions) -> Result<(Vec<SalesRecord>, IngestReport)>
where
    I: Iterator<Item = (usize, std::result::Result<RawRow, MalformedRecord>)>,
{
    let mut report = IngestReport::default();
    let mut records = Vec::new();

    for (index, row) in rows {
        report.total_rows += 1;
        match row.and_then(|row| parse_row(index, &row, opts.number_format)) {
            Ok(rec) => records.push(rec),
            Err(bad) => reject(&mut report, bad, opts.policy)?,
        }
    }

    records.sort_by_key(|r| r.timestamp);
    report.accepted = records.len();
    Ok((records, report))
}

fn reject(report: &mut IngestReport, bad: MalformedRecord, policy: MalformedPolicy) -> Result<()> {
    match policy {
        MalformedPolicy::Abort => Err(bad.into()),
        MalformedPolicy::Skip => {
            warn!(row = bad.index, reason = %bad.reason, "skipping malformed row");
            report.rejected.push(bad);
            Ok(())
        }
    }
}

fn parse_row(
    index: usize,
    row: &RawRow,
    fmt: NumberFormat,
) -> std::result::Result<SalesRecord, MalformedRecord> {
    let malformed = |reason: String| MalformedRecord {
        index,
        reason,
        content: row.describe(),
    };

    let date_str = required(row.date.as_deref(), "Date").map_err(&malformed)?;
    let (mut timestamp, has_time) = parse_timestamp(date_str)
        .ok_or_else(|| malformed(format!("unparseable date '{date_str}'")))?;
    if !has_time {
        if let Some(time_str) = row.time.as_deref().filter(|t| !t.trim().is_empty()) {
            let time = parse_time_safe(time_str)
                .ok_or_else(|| malformed(format!("unparseable time '{time_str}'")))?;
            timestamp = timestamp.date().and_time(time);
        }
    }

    let city = required(row.city.as_deref(), "City").map_err(&malformed)?;
    let product_line =
        required(row.product_line.as_deref(), "Product line").map_err(&malformed)?;
    let payment_method = required(row.payment.as_deref(), "Payment").map_err(&malformed)?;
    let total = number(row.total.as_deref(), "Total", fmt).map_err(&malformed)?;
    let rating = number(row.rating.as_deref(), "Rating", fmt).map_err(&malformed)?;

    Ok(SalesRecord {
        timestamp,
        city: city.to_string(),
        product_line: product_line.to_string(),
        payment_method: payment_method.to_string(),
        total,
        rating,
    })
}

fn required<'a>(value: Option<&'a str>, column: &str) -> std::result::Result<&'a str, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing {column}")),
    }
}

fn number(
    value: Option<&str>,
    column: &str,
    fmt: NumberFormat,
) -> std::result::Result<f64, String> {
    let raw = required(value, column)?;
    parse_f64_safe(Some(raw), fmt).ok_or_else(|| format!("non-numeric {column} '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SalesError;
    use crate::period::PeriodKey;
    use chrono::{NaiveDate, Timelike};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Invoice ID;City;Product line;Payment;Total;Date;Time;Rating";

    fn feed(lines: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for l in lines {
            s.push('\n');
            s.push_str(l);
        }
        s
    }

    fn raw(date: &str, city: &str, total: &str) -> RawRow {
        RawRow {
            date: Some(date.to_string()),
            time: None,
            city: Some(city.to_string()),
            product_line: Some("Food and beverages".to_string()),
            payment: Some("Cash".to_string()),
            total: Some(total.to_string()),
            rating: Some("7,5".to_string()),
        }
    }

    #[test]
    fn test_ingest_sorts_by_timestamp() {
        let rows = vec![
            raw("2019-02-03", "Yangon", "200"),
            raw("05/01/2019", "Yangon", "100"),
            raw("20/01/2019", "Mandalay", "50"),
        ];
        let (records, report) = ingest(rows, &LoadOptions::default()).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.accepted, 3);
        let totals: Vec<f64> = records.iter().map(|r| r.total).collect();
        assert_eq!(totals, vec![100.0, 50.0, 200.0]);
        assert_eq!(records[0].rating, 7.5);
    }

    #[test]
    fn test_mixed_and_canonical_dates_give_same_partition() {
        let mixed = vec![
            raw("05/01/2019", "Yangon", "100"),
            raw("2019-01-20", "Yangon", "50"),
            raw("3/2/2019", "Yangon", "200"),
        ];
        let canonical = vec![
            raw("2019-01-05T00:00:00", "Yangon", "100"),
            raw("2019-01-20T00:00:00", "Yangon", "50"),
            raw("2019-02-03T00:00:00", "Yangon", "200"),
        ];
        let opts = LoadOptions::default();
        let (a, _) = ingest(mixed, &opts).unwrap();
        let (b, _) = ingest(canonical, &opts).unwrap();
        let keys = |recs: &[SalesRecord]| -> Vec<PeriodKey> {
            recs.iter().map(|r| r.period_key()).collect()
        };
        assert_eq!(keys(&a), keys(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_abort_policy_reports_first_bad_row() {
        let rows = vec![
            raw("05/01/2019", "Yangon", "100"),
            raw("not a date", "Yangon", "100"),
            raw("05/01/2019", "Yangon", "abc"),
        ];
        let err = ingest(rows, &LoadOptions::default()).unwrap_err();
        match err {
            SalesError::MalformedRecord(bad) => {
                assert_eq!(bad.index, 1);
                assert!(bad.reason.contains("unparseable date"));
                assert!(bad.content.contains("not a date"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_skip_policy_collects_bad_rows() {
        let mut missing_city = raw("05/01/2019", "", "10");
        missing_city.city = None;
        let rows = vec![
            raw("05/01/2019", "Yangon", "100"),
            raw("05/01/2019", "Yangon", "abc"),
            missing_city,
            raw("06/01/2019", "Mandalay", "1,5"),
        ];
        let opts = LoadOptions {
            policy: MalformedPolicy::Skip,
            ..LoadOptions::default()
        };
        let (records, report) = ingest(rows, &opts).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.accepted, 2);
        let bad: Vec<usize> = report.rejected.iter().map(|b| b.index).collect();
        assert_eq!(bad, vec![1, 2]);
        assert!(report.rejected[0].reason.contains("non-numeric Total"));
        assert!(report.rejected[1].reason.contains("missing City"));
        assert_eq!(records[1].total, 1.5);
    }

    #[test]
    fn test_load_csv_with_time_column() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            feed(&[
                "750-67-8428;Yangon;Health and beauty;Ewallet;548,9715;1/5/2019;13:08;9,1",
                "226-31-3081;Naypyitaw;Electronic accessories;Cash;80,22;3/8/2019;10:29;9,6",
            ])
        )
        .unwrap();

        let (records, report) = load_csv(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(
            records[0].timestamp.date(),
            NaiveDate::from_ymd_opt(2019, 5, 1).unwrap()
        );
        assert_eq!(records[0].timestamp.hour(), 13);
        assert_eq!(records[0].total, 548.9715);
        assert_eq!(records[1].city, "Naypyitaw");
        assert_eq!(records[1].period_key(), PeriodKey::new(2019, 8));
    }

    #[test]
    fn test_load_with_dot_decimals_and_comma_delimiter() {
        let csv = "Date,City,Product line,Payment,Total,Rating\n\
                   2019-01-05,Yangon,Home and lifestyle,Cash,\"1,234.50\",8.0\n";
        let opts = LoadOptions {
            delimiter: b',',
            number_format: NumberFormat {
                decimal: '.',
                thousands: Some(','),
            },
            policy: MalformedPolicy::Abort,
        };
        let (records, _) = load_from_reader(csv.as_bytes(), &opts).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total, 1234.5);
    }

    #[test]
    fn test_two_digit_year_is_malformed() {
        let rows = vec![
            raw("05/01/2019", "Yangon", "100"),
            raw("05/01/19", "Yangon", "100"),
        ];
        let err = ingest(rows, &LoadOptions::default()).unwrap_err();
        match err {
            SalesError::MalformedRecord(bad) => {
                assert_eq!(bad.index, 1);
                assert!(bad.reason.contains("unparseable date '05/01/19'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undecodable_row_keeps_its_content() {
        let mut bytes = b"Date;City;Product line;Payment;Total;Rating\n".to_vec();
        bytes.extend_from_slice(b"05/01/2019;Yang\xffon;Food and beverages;Cash;10;7\n");
        bytes.extend_from_slice(b"06/01/2019;Yangon;Food and beverages;Cash;5;8\n");
        let opts = LoadOptions {
            policy: MalformedPolicy::Skip,
            ..LoadOptions::default()
        };

        let (records, report) = load_from_reader(bytes.as_slice(), &opts).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.total_rows, 2);
        let bad = &report.rejected[0];
        assert_eq!(bad.index, 0);
        assert!(bad.reason.contains("undecodable"));
        assert!(bad.content.starts_with("05/01/2019;Yang"));
        assert!(bad.content.contains("Food and beverages;Cash;10;7"));

        let err = load_from_reader(bytes.as_slice(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SalesError::MalformedRecord(ref bad) if !bad.content.is_empty()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_csv("/nonexistent/sales.csv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SalesError::Io(_)));
    }
}
