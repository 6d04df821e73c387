//! Deactivates members whose subscription ran out before today.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::constants::{DATE_FORMAT, MEMBER_TABLE};
use crate::db::{require_table, MemberStats};
use crate::error::Result;

const SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ExpiredMember {
    pub name: Option<String>,
    pub member_number: Option<i64>,
    pub expiry_date: String,
    pub days_expired: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpireReport {
    pub today: NaiveDate,
    pub deactivated: usize,
    /// Active members left alone because their expiry date does not parse.
    pub unparseable: usize,
    pub samples: Vec<ExpiredMember>,
    pub stats: MemberStats,
}

struct Candidate {
    rowid: i64,
    name: Option<String>,
    member_number: Option<i64>,
    expiry_date: String,
}

/// Only expiry dates starting with `YYYY-MM-DD` count; anything else is
/// reported and skipped rather than treated as past.
pub fn expire_members(conn: &mut Connection, today: NaiveDate) -> Result<ExpireReport> {
    require_table(conn, MEMBER_TABLE)?;
    info!("🔄 Deactivating members expired before {}", today.format(DATE_FORMAT));

    let tx = conn.transaction()?;
    let candidates = {
        let mut stmt = tx.prepare(
            "SELECT rowid, name, memberNumber, CAST(expiryDate AS TEXT) FROM Member
             WHERE isActive = 1 AND expiryDate IS NOT NULL AND expiryDate <> ''
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Candidate {
                    rowid: row.get(0)?,
                    name: row.get(1)?,
                    member_number: row.get(2)?,
                    expiry_date: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut deactivated = 0;
    let mut unparseable = 0;
    let mut samples = Vec::new();
    {
        let mut update = tx.prepare("UPDATE Member SET isActive = 0 WHERE rowid = ?1")?;
        for candidate in candidates {
            let Some(days_expired) = days_between(&candidate.expiry_date, today) else {
                warn!(
                    rowid = candidate.rowid,
                    expiry = %candidate.expiry_date,
                    "Expiry date is not YYYY-MM-DD, leaving member active"
                );
                unparseable += 1;
                continue;
            };
            if days_expired <= 0 {
                continue;
            }
            deactivated += update.execute(params![candidate.rowid])?;
            if samples.len() < SAMPLE_SIZE {
                samples.push(ExpiredMember {
                    name: candidate.name,
                    member_number: candidate.member_number,
                    expiry_date: candidate.expiry_date,
                    days_expired,
                });
            }
        }
    }
    tx.commit()?;
    info!("✅ Deactivated {} members", deactivated);

    Ok(ExpireReport {
        today,
        deactivated,
        unparseable,
        samples,
        stats: MemberStats::load(conn)?,
    })
}

/// Days from the date part of `expiry` to `today`; `None` when it is not a date.
fn days_between(expiry: &str, today: NaiveDate) -> Option<i64> {
    let date_part = expiry.get(..10)?;
    let expiry = NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()?;
    Some((today - expiry).num_days())
}

impl fmt::Display for ExpireReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📅 Today: {}", self.today.format(DATE_FORMAT))?;
        if self.deactivated == 0 {
            writeln!(f, "✅ No expired members need updating")?;
        } else {
            writeln!(f, "📋 First {} expired members:", self.samples.len())?;
            for (idx, m) in self.samples.iter().enumerate() {
                let number = m
                    .member_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                writeln!(
                    f,
                    "{}. {} (#{}) - expired {} days ago",
                    idx + 1,
                    m.name.as_deref().unwrap_or("(no name)"),
                    number,
                    m.days_expired
                )?;
            }
            writeln!(f, "✅ Deactivated {} members", self.deactivated)?;
        }
        if self.unparseable > 0 {
            writeln!(
                f,
                "⚠️  Skipped {} members with unreadable expiry dates",
                self.unparseable
            )?;
        }
        writeln!(f, "📈 Active: {}", self.stats.active)?;
        write!(f, "📉 Inactive: {}", self.stats.inactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bootstrap_schema;

    #[test]
    fn deactivates_only_active_members_past_expiry() {
        let mut conn = Connection::open_in_memory().unwrap();
        bootstrap_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO Member (id, name, memberNumber, isActive, expiryDate)
                VALUES ('member000001', 'Expired', 1001, 1, '2025-03-01 23:59:59');
             INSERT INTO Member (id, name, memberNumber, isActive, expiryDate)
                VALUES ('member000002', 'Today', 1002, 1, '2025-03-10');
             INSERT INTO Member (id, name, memberNumber, isActive, expiryDate)
                VALUES ('member000003', 'Already off', 1003, 0, '2024-01-01');
             INSERT INTO Member (id, name, memberNumber, isActive, expiryDate)
                VALUES ('member000004', 'No date', 1004, 1, NULL);",
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let report = expire_members(&mut conn, today).unwrap();
        assert_eq!(report.deactivated, 1);
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].name.as_deref(), Some("Expired"));
        assert_eq!(report.samples[0].days_expired, 9);
        assert_eq!(report.stats.active, 2);
        assert_eq!(report.stats.inactive, 2);

        let again = expire_members(&mut conn, today).unwrap();
        assert_eq!(again.deactivated, 0);
        assert!(again.to_string().contains("No expired members"));
    }

    #[test]
    fn unparseable_dates_have_no_day_count() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(days_between("2025-03-08", today), Some(2));
        assert_eq!(days_between("03/08", today), None);
    }

    #[test]
    fn malformed_expiry_dates_stay_active() {
        let mut conn = Connection::open_in_memory().unwrap();
        bootstrap_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO Member (id, name, isActive, expiryDate)
                VALUES ('member000001', 'Day first', 1, '15/08/2030');
             INSERT INTO Member (id, name, isActive, expiryDate)
                VALUES ('member000002', 'Epoch', 1, 1900000000000);
             INSERT INTO Member (id, name, isActive, expiryDate)
                VALUES ('member000003', 'Past', 1, '2025-05-01');",
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let report = expire_members(&mut conn, today).unwrap();
        assert_eq!(report.deactivated, 1);
        assert_eq!(report.unparseable, 2);
        assert_eq!(report.samples[0].name.as_deref(), Some("Past"));

        let active: Vec<String> = conn
            .prepare("SELECT name FROM Member WHERE isActive = 1 ORDER BY rowid")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(active, vec!["Day first", "Epoch"]);
        assert!(report.to_string().contains("Skipped 2 members"));
    }
}
