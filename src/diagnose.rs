//! Read-only scan of the `Member` table for rows the application will choke on.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::config::DiagnoseConfig;
use crate::constants::{MEMBER_TABLE, TEXT_COLUMNS};
use crate::db::{count_rows, quote_ident, table_columns};
use crate::error::Result;
use crate::member::{id_length_in_bounds, DateField};

static ID_CHARSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());
static DIGITS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

const DISPLAY_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct DiagnoseOptions {
    pub sample_limit: usize,
    pub anomaly_limit: usize,
}

impl Default for DiagnoseOptions {
    fn default() -> Self {
        Self::from(&DiagnoseConfig::default())
    }
}

impl From<&DiagnoseConfig> for DiagnoseOptions {
    fn from(config: &DiagnoseConfig) -> Self {
        Self {
            sample_limit: config.sample_limit,
            anomaly_limit: config.anomaly_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    IdLength,
    IdCharacters,
    DateFormat,
    NonDigitPhone,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnomalyKind::IdLength => "invalid ID length",
            AnomalyKind::IdCharacters => "ID has unexpected characters",
            AnomalyKind::DateFormat => "malformed date",
            AnomalyKind::NonDigitPhone => "phone has non-digit characters",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub value: Option<String>,
    pub member_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    pub column: String,
    pub null_count: i64,
    /// Only computed for text columns.
    pub empty_count: Option<i64>,
    /// Total anomalies found; `anomalies` holds at most `anomaly_limit` of them.
    pub anomaly_total: usize,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleRow {
    pub values: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisSummary {
    pub total: i64,
    pub bad_ids: i64,
    pub missing_names: i64,
    pub missing_phones: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub columns: Vec<String>,
    pub column_reports: Vec<ColumnReport>,
    pub samples: Vec<SampleRow>,
    pub summary: DiagnosisSummary,
}

impl DiagnosisReport {
    pub fn problems_found(&self) -> bool {
        self.column_reports.iter().any(|c| c.anomaly_total > 0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.column_reports.iter().find(|c| c.column == name)
    }
}

pub fn diagnose(conn: &Connection, options: &DiagnoseOptions) -> Result<DiagnosisReport> {
    let columns = table_columns(conn, MEMBER_TABLE)?;
    info!("Scanning {} columns of {}", columns.len(), MEMBER_TABLE);

    let mut column_reports = Vec::with_capacity(columns.len());
    for column in &columns {
        column_reports.push(scan_column(conn, column, &columns, options)?);
    }

    let samples = sample_rows(conn, &columns, options.sample_limit)?;
    let summary = summarize(conn, &columns)?;

    Ok(DiagnosisReport {
        columns,
        column_reports,
        samples,
        summary,
    })
}

fn scan_column(
    conn: &Connection,
    column: &str,
    all_columns: &[String],
    options: &DiagnoseOptions,
) -> Result<ColumnReport> {
    debug!("Scanning column {}", column);
    let ident = quote_ident(column);
    let null_count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM Member WHERE {ident} IS NULL"),
        [],
        |row| row.get(0),
    )?;

    let empty_count = if TEXT_COLUMNS.contains(&column) {
        Some(conn.query_row(
            &format!("SELECT COUNT(*) FROM Member WHERE {ident} = ''"),
            [],
            |row| row.get(0),
        )?)
    } else {
        None
    };

    let anomalies = if column == "id" {
        column_anomalies(conn, column, all_columns, true, check_id)?
    } else if DateField::from_column(column).is_some() {
        column_anomalies(conn, column, all_columns, false, check_date)?
    } else if column == "phone" {
        column_anomalies(conn, column, all_columns, false, check_phone)?
    } else {
        Vec::new()
    };

    let anomaly_total = anomalies.len();
    let anomalies = anomalies.into_iter().take(options.anomaly_limit).collect();

    Ok(ColumnReport {
        column: column.to_string(),
        null_count,
        empty_count,
        anomaly_total,
        anomalies,
    })
}

fn check_id(value: Option<&str>) -> Vec<AnomalyKind> {
    match value {
        None => vec![AnomalyKind::IdLength],
        Some(id) => {
            let mut found = Vec::new();
            if !id_length_in_bounds(id) {
                found.push(AnomalyKind::IdLength);
            }
            if !ID_CHARSET.is_match(id) {
                found.push(AnomalyKind::IdCharacters);
            }
            found
        }
    }
}

fn check_date(value: Option<&str>) -> Vec<AnomalyKind> {
    match value {
        Some(v) if !v.is_empty() && !DATE_PREFIX.is_match(v) => vec![AnomalyKind::DateFormat],
        _ => Vec::new(),
    }
}

fn check_phone(value: Option<&str>) -> Vec<AnomalyKind> {
    match value {
        Some(v) if !v.is_empty() && !DIGITS_ONLY.is_match(v) => vec![AnomalyKind::NonDigitPhone],
        _ => Vec::new(),
    }
}

/// Run `check` over every value of `column`. NULLs are only passed to the
/// check when `include_nulls` is set.
fn column_anomalies(
    conn: &Connection,
    column: &str,
    all_columns: &[String],
    include_nulls: bool,
    check: fn(Option<&str>) -> Vec<AnomalyKind>,
) -> Result<Vec<Anomaly>> {
    let name_expr = if all_columns.iter().any(|c| c == "name") {
        "name"
    } else {
        "NULL"
    };
    let filter = if include_nulls {
        String::new()
    } else {
        format!(" WHERE {} IS NOT NULL", quote_ident(column))
    };
    let sql = format!(
        "SELECT {}, {} FROM Member{} ORDER BY rowid",
        quote_ident(column),
        name_expr,
        filter
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut anomalies = Vec::new();
    while let Some(row) = rows.next()? {
        let value = render_value(row.get_ref(0)?);
        let member_name = render_value(row.get_ref(1)?);
        for kind in check(value.as_deref()) {
            anomalies.push(Anomaly {
                kind,
                value: value.clone(),
                member_name: member_name.clone(),
            });
        }
    }
    Ok(anomalies)
}

fn sample_rows(conn: &Connection, columns: &[String], limit: usize) -> Result<Vec<SampleRow>> {
    let mut stmt = conn.prepare("SELECT * FROM Member ORDER BY rowid LIMIT ?1")?;
    let mut rows = stmt.query([limit as i64])?;
    let mut samples = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            values.push((column.clone(), render_value(row.get_ref(idx)?)));
        }
        samples.push(SampleRow { values });
    }
    Ok(samples)
}

fn summarize(conn: &Connection, columns: &[String]) -> Result<DiagnosisSummary> {
    let count_missing = |column: &str| -> Result<i64> {
        if !columns.iter().any(|c| c == column) {
            return Ok(0);
        }
        let ident = quote_ident(column);
        Ok(conn.query_row(
            &format!("SELECT COUNT(*) FROM Member WHERE {ident} IS NULL OR {ident} = ''"),
            [],
            |row| row.get(0),
        )?)
    };

    Ok(DiagnosisSummary {
        total: count_rows(conn, MEMBER_TABLE)?,
        bad_ids: count_missing("id")?,
        missing_names: count_missing("name")?,
        missing_phones: count_missing("phone")?,
    })
}

/// Text form of a stored value; `None` for SQL NULL.
fn render_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(format!("<blob {} bytes>", b.len())),
    }
}

fn display_value(value: Option<&str>) -> String {
    match value {
        None => "NULL".to_string(),
        Some("") => "(empty)".to_string(),
        Some(v) => v.chars().take(DISPLAY_WIDTH).collect(),
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "🔍 Scanning database for corrupt member rows")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "📋 Columns: {}", self.columns.join(", "))?;
        writeln!(f)?;

        for report in &self.column_reports {
            writeln!(f, "🔍 Column: {}", report.column)?;
            if report.null_count > 0 {
                writeln!(f, "   ⚠️  {} NULL values", report.null_count)?;
            }
            if let Some(empty) = report.empty_count.filter(|n| *n > 0) {
                writeln!(f, "   ⚠️  {} empty values", empty)?;
            }
            for anomaly in &report.anomalies {
                writeln!(
                    f,
                    "   ❌ {}: '{}' (member: {})",
                    anomaly.kind,
                    display_value(anomaly.value.as_deref()),
                    display_value(anomaly.member_name.as_deref())
                )?;
            }
            let hidden = report.anomaly_total - report.anomalies.len();
            if hidden > 0 {
                writeln!(f, "   … and {} more", hidden)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "{rule}")?;
        writeln!(f, "📊 First {} rows:", self.samples.len())?;
        writeln!(f, "{rule}")?;
        for (idx, sample) in self.samples.iter().enumerate() {
            writeln!(f, "\n🔹 Row #{}:", idx + 1)?;
            for (column, value) in &sample.values {
                writeln!(f, "   {:20}: {}", column, display_value(value.as_deref()))?;
            }
        }

        writeln!(f, "\n{rule}")?;
        writeln!(f, "📈 Summary:")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total rows: {}", self.summary.total)?;
        writeln!(f, "Rows with missing ID: {}", self.summary.bad_ids)?;
        writeln!(f, "Rows without name: {}", self.summary.missing_names)?;
        writeln!(f, "Rows without phone: {}", self.summary.missing_phones)?;
        writeln!(f, "\n{rule}")?;
        if self.problems_found() {
            writeln!(f, "❌ Data problems detected")?;
            writeln!(f, "💡 Run the clean command to repair them")?;
        } else {
            writeln!(f, "✅ No obvious problems detected")?;
            writeln!(f, "💡 If the app still fails, check the text encoding (UTF-8)")?;
        }
        write!(f, "{rule}")
    }
}
