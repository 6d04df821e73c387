//! Appends a time of day to date-only timestamps so the ORM can parse them.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::constants::{DATE_ONLY_LEN, MEMBER_TABLE};
use crate::db::{quote_ident, require_table};
use crate::error::Result;
use crate::member::DateField;

const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct DateSample {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub expiry_date: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixDatesReport {
    pub rows_scanned: usize,
    pub rows_updated: usize,
    pub samples: Vec<DateSample>,
}

/// The fixed value for `value` in `field`, or `None` when it needs no change.
pub fn with_time_suffix(field: DateField, value: &str) -> Option<String> {
    (value.chars().count() == DATE_ONLY_LEN).then(|| format!("{} {}", value, field.time_suffix()))
}

pub fn fix_dates(conn: &mut Connection) -> Result<FixDatesReport> {
    require_table(conn, MEMBER_TABLE)?;
    info!("📅 Normalizing date-only values");

    let tx = conn.transaction()?;
    let rows: Vec<(i64, [Option<String>; 3])> = {
        let mut stmt = tx.prepare(
            "SELECT rowid, CAST(startDate AS TEXT), CAST(expiryDate AS TEXT), CAST(createdAt AS TEXT)
             FROM Member ORDER BY rowid",
        )?;
        let mapped = stmt
            .query_map([], |row| Ok((row.get(0)?, [row.get(1)?, row.get(2)?, row.get(3)?])))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        mapped
    };

    let mut report = FixDatesReport {
        rows_scanned: rows.len(),
        ..Default::default()
    };

    for (rowid, values) in &rows {
        let mut changed = false;
        for (field, value) in DateField::ALL.into_iter().zip(values) {
            let Some(fixed) = value.as_deref().and_then(|v| with_time_suffix(field, v)) else {
                continue;
            };
            tx.execute(
                &format!("UPDATE Member SET {} = ?1 WHERE rowid = ?2", quote_ident(field.column())),
                params![fixed, rowid],
            )?;
            changed = true;
        }
        if changed {
            debug!(rowid, "Date fields fixed");
            report.rows_updated += 1;
        }
    }

    tx.commit()?;
    info!("✅ Updated {} of {} rows", report.rows_updated, report.rows_scanned);

    let mut stmt = conn.prepare(
        "SELECT name, startDate, expiryDate, createdAt FROM Member ORDER BY rowid LIMIT ?1",
    )?;
    report.samples = stmt
        .query_map([SAMPLE_SIZE as i64], |row| {
            Ok(DateSample {
                name: row.get(0)?,
                start_date: row.get(1)?,
                expiry_date: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(report)
}

impl fmt::Display for FixDatesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "✅ Updated {} of {} rows", self.rows_updated, self.rows_scanned)?;
        if !self.samples.is_empty() {
            writeln!(f, "\n📊 Sample of updated data:")?;
        }
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "NULL".to_string());
        for sample in &self.samples {
            writeln!(f, "\n   Name: {}", show(&sample.name))?;
            writeln!(f, "   Start date: {}", show(&sample.start_date))?;
            writeln!(f, "   Expiry date: {}", show(&sample.expiry_date))?;
            writeln!(f, "   Created at: {}", show(&sample.created_at))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bootstrap_schema;

    fn dates(conn: &Connection) -> Vec<(String, String, String)> {
        conn.prepare(
            "SELECT COALESCE(startDate, 'NULL'), COALESCE(expiryDate, 'NULL'),
                    COALESCE(createdAt, 'NULL')
             FROM Member ORDER BY rowid",
        )
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
    }

    #[test]
    fn suffix_depends_on_field() {
        assert_eq!(
            with_time_suffix(DateField::Start, "2024-01-31").as_deref(),
            Some("2024-01-31 00:00:00")
        );
        assert_eq!(
            with_time_suffix(DateField::Expiry, "2024-01-31").as_deref(),
            Some("2024-01-31 23:59:59")
        );
        assert_eq!(
            with_time_suffix(DateField::Created, "2024-01-31").as_deref(),
            Some("2024-01-31 00:00:00")
        );
        assert_eq!(with_time_suffix(DateField::Start, "2024-01-31 08:00:00"), None);
        assert_eq!(with_time_suffix(DateField::Start, "2024-1-1"), None);
    }

    #[test]
    fn only_date_only_values_change() {
        let mut conn = Connection::open_in_memory().unwrap();
        bootstrap_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO Member (id, name, startDate, expiryDate, createdAt)
                VALUES ('member000001', 'A', '2024-01-01', '2024-02-01', '2024-01-01 10:15:00');
             INSERT INTO Member (id, name, startDate, expiryDate, createdAt)
                VALUES ('member000002', 'B', '2024-01-01 00:00:00', '2024-02-01 23:59:59', '2024-01-01 00:00:00');
             INSERT INTO Member (id, name, startDate, expiryDate, createdAt)
                VALUES ('member000003', 'C', NULL, '', '2024-03-03');",
        )
        .unwrap();

        let report = fix_dates(&mut conn).unwrap();
        assert_eq!(report.rows_scanned, 3);
        assert_eq!(report.rows_updated, 2);
        assert_eq!(report.samples.len(), 3);

        let rows = dates(&conn);
        assert_eq!(
            rows[0],
            (
                "2024-01-01 00:00:00".to_string(),
                "2024-02-01 23:59:59".to_string(),
                "2024-01-01 10:15:00".to_string()
            )
        );
        assert_eq!(
            rows[2],
            ("NULL".to_string(), String::new(), "2024-03-03 00:00:00".to_string())
        );
    }

    #[test]
    fn running_twice_is_a_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        bootstrap_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO Member (id, startDate, expiryDate, createdAt)
             VALUES ('member000001', '2024-01-01', '2024-02-01', '2024-01-01')",
            [],
        )
        .unwrap();

        assert_eq!(fix_dates(&mut conn).unwrap().rows_updated, 1);
        let after_first = dates(&conn);
        assert_eq!(fix_dates(&mut conn).unwrap().rows_updated, 0);
        assert_eq!(dates(&conn), after_first);
        assert!(after_first
            .iter()
            .all(|(s, e, c)| s.len() == 19 && e.len() == 19 && c.len() == 19));
    }
}
