//! Idempotent repair pass over the `Member` table.

use chrono::NaiveDateTime;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::constants::{
    MAX_ID_LEN, MEMBER_TABLE, PLACEHOLDER_PHONE, TIMESTAMP_FORMAT, ZERO_DEFAULT_COLUMNS,
};
use crate::db::{quote_ident, require_table, MemberStats};
use crate::error::Result;
use crate::member::{normalize_phone_digits, placeholder_name, DateField};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub phones_cleaned: usize,
    pub phone_placeholders: usize,
    pub start_dates_fixed: usize,
    pub expiry_dates_fixed: usize,
    pub created_dates_fixed: usize,
    pub numeric_fields_fixed: usize,
    pub names_fixed: usize,
    pub rows_deleted: usize,
    pub stats: Option<MemberStats>,
}

impl CleanReport {
    /// True when the pass found nothing to repair.
    pub fn is_noop(&self) -> bool {
        self.phones_cleaned == 0
            && self.start_dates_fixed == 0
            && self.expiry_dates_fixed == 0
            && self.created_dates_fixed == 0
            && self.numeric_fields_fixed == 0
            && self.names_fixed == 0
            && self.rows_deleted == 0
    }
}

/// Run every correction inside one transaction; `now` fills missing timestamps.
pub fn clean(conn: &mut Connection, now: NaiveDateTime) -> Result<CleanReport> {
    require_table(conn, MEMBER_TABLE)?;
    info!("🧹 Cleaning member table");

    let tx = conn.transaction()?;
    let mut report = CleanReport::default();

    clean_phones(&tx, &mut report)?;
    fill_missing_dates(&tx, now, &mut report)?;
    report.numeric_fields_fixed = fill_zero_defaults(&tx)?;
    report.names_fixed = fill_missing_names(&tx)?;
    report.rows_deleted = delete_malformed_rows(&tx)?;

    tx.commit()?;

    report.stats = Some(MemberStats::load(conn)?);
    info!(
        phones = report.phones_cleaned,
        names = report.names_fixed,
        deleted = report.rows_deleted,
        "Clean committed"
    );
    Ok(report)
}

fn clean_phones(tx: &Transaction<'_>, report: &mut CleanReport) -> Result<()> {
    let mut pending = Vec::new();
    {
        let mut stmt = tx.prepare("SELECT rowid, phone FROM Member ORDER BY rowid")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let rowid: i64 = row.get(0)?;
            let original = match row.get_ref(1)? {
                ValueRef::Null => None,
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
                ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => Some(String::new()),
            };
            let cleaned = normalize_phone_digits(original.as_deref().unwrap_or(""));
            if original.as_deref() != Some(cleaned.as_str()) {
                pending.push((rowid, original, cleaned));
            }
        }
    }

    let mut update = tx.prepare("UPDATE Member SET phone = ?1 WHERE rowid = ?2")?;
    for (rowid, original, cleaned) in pending {
        if cleaned == PLACEHOLDER_PHONE {
            warn!(rowid, original = ?original, "Phone replaced with placeholder");
            report.phone_placeholders += 1;
        }
        update.execute(params![cleaned, rowid])?;
        report.phones_cleaned += 1;
    }
    info!("📞 Cleaned {} phone numbers", report.phones_cleaned);
    Ok(())
}

fn fill_missing_dates(
    tx: &Transaction<'_>,
    now: NaiveDateTime,
    report: &mut CleanReport,
) -> Result<()> {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    for field in DateField::ALL {
        let column = quote_ident(field.column());
        let fixed = tx.execute(
            &format!("UPDATE Member SET {column} = ?1 WHERE {column} IS NULL OR {column} = ''"),
            params![stamp],
        )?;
        match field {
            DateField::Start => report.start_dates_fixed = fixed,
            DateField::Expiry => report.expiry_dates_fixed = fixed,
            DateField::Created => report.created_dates_fixed = fixed,
        }
    }
    info!(
        "📅 Fixed {} startDate, {} expiryDate, {} createdAt",
        report.start_dates_fixed, report.expiry_dates_fixed, report.created_dates_fixed
    );
    Ok(())
}

fn fill_zero_defaults(tx: &Transaction<'_>) -> Result<usize> {
    let mut fixed = 0;
    for (column, zero) in ZERO_DEFAULT_COLUMNS {
        let column = quote_ident(column);
        fixed += tx.execute(
            &format!("UPDATE Member SET {column} = {zero} WHERE {column} IS NULL"),
            [],
        )?;
    }
    info!("🔢 Reset {} NULL numeric fields", fixed);
    Ok(fixed)
}

fn fill_missing_names(tx: &Transaction<'_>) -> Result<usize> {
    let rowids = {
        let mut stmt =
            tx.prepare("SELECT rowid FROM Member WHERE name IS NULL OR name = '' ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids
    };

    let mut update = tx.prepare("UPDATE Member SET name = ?1 WHERE rowid = ?2")?;
    for (idx, rowid) in rowids.iter().enumerate() {
        let name = placeholder_name(idx + 1);
        warn!(rowid, name = %name, "Empty name replaced with placeholder");
        update.execute(params![name, rowid])?;
    }
    info!("👤 Filled {} empty names", rowids.len());
    Ok(rowids.len())
}

fn delete_malformed_rows(tx: &Transaction<'_>) -> Result<usize> {
    let deleted = tx.execute(
        "DELETE FROM Member WHERE id IS NULL OR id = '' OR LENGTH(id) > ?1",
        params![MAX_ID_LEN as i64],
    )?;
    if deleted > 0 {
        warn!("🗑️ Deleted {} rows with malformed IDs", deleted);
    }
    Ok(deleted)
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(
            f,
            "📞 Phones cleaned: {} ({} placeholders)",
            self.phones_cleaned, self.phone_placeholders
        )?;
        writeln!(
            f,
            "📅 Dates fixed: {} startDate, {} expiryDate, {} createdAt",
            self.start_dates_fixed, self.expiry_dates_fixed, self.created_dates_fixed
        )?;
        writeln!(f, "🔢 Numeric fields reset: {}", self.numeric_fields_fixed)?;
        writeln!(f, "👤 Empty names filled: {}", self.names_fixed)?;
        writeln!(f, "🗑️  Malformed rows deleted: {}", self.rows_deleted)?;
        if let Some(stats) = &self.stats {
            writeln!(f, "\n{rule}")?;
            writeln!(f, "📊 After cleaning:")?;
            writeln!(f, "   Total members: {}", stats.total)?;
            writeln!(f, "   Active members: {}", stats.active)?;
            writeln!(f, "   Inactive members: {}", stats.inactive)?;
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}
