mod common;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use common::scratch_db;
use gym_maint::clean::clean;
use gym_maint::config::Config;
use gym_maint::constants::PLACEHOLDER_PHONE;
use gym_maint::db::Database;
use gym_maint::diagnose::{diagnose, AnomalyKind, DiagnoseOptions};
use gym_maint::expire::expire_members;
use gym_maint::fix_dates::fix_dates;

fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(10, 15, 0)
        .unwrap()
}

fn seed_dirty_members(conn: &Connection) -> Result<()> {
    let too_long = "m".repeat(31);
    conn.execute_batch(&format!(
        "INSERT INTO Member (id, memberNumber, name, phone, startDate, expiryDate, createdAt, isActive)
         VALUES ('member_ok_00001', 1001, 'Alice', '010-555-1234', '2024-01-01', '2024-12-31', '2024-01-01', 1);
         INSERT INTO Member (id, memberNumber, name, phone)
         VALUES ('member_ok_00002', 1002, NULL, '12');
         INSERT INTO Member (id, memberNumber, name, phone, expiryDate, isActive)
         VALUES ('member_ok_00003', 1003, 'Carol', '01099998888', '2030-01-01 23:59:59', 1);
         INSERT INTO Member (id, memberNumber, name, phone) VALUES ('{too_long}', 1004, 'Long', '0101111111');
         INSERT INTO Member (id, memberNumber, name, phone) VALUES ('', 1005, 'Empty', '0102222222');"
    ))?;
    Ok(())
}

fn all_strings(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let values = conn
        .prepare(sql)?
        .query_map([], |r| r.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(values)
}

#[test]
fn maintenance_pipeline_repairs_a_dirty_table() -> Result<()> {
    let (_dir, db_path) = scratch_db()?;
    {
        let db = Database::open(&db_path)?;
        seed_dirty_members(db.conn())?;
    }

    let before = {
        let db = Database::open_read_only(&db_path)?;
        diagnose(db.conn(), &DiagnoseOptions::default())?
    };
    assert!(before.problems_found());
    assert_eq!(before.summary.total, 5);
    assert_eq!(before.summary.bad_ids, 1);
    assert_eq!(before.summary.missing_names, 1);
    let id_report = before.column("id").unwrap();
    assert!(id_report
        .anomalies
        .iter()
        .any(|a| a.kind == AnomalyKind::IdLength));
    let phone_report = before.column("phone").unwrap();
    assert_eq!(phone_report.anomaly_total, 1);

    let mut db = Database::open(&db_path)?;
    let report = clean(db.conn_mut(), run_time())?;
    assert_eq!(report.rows_deleted, 2);
    assert_eq!(report.names_fixed, 1);
    assert_eq!(report.phone_placeholders, 1);
    let stats = report.stats.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 2);

    let phones = all_strings(db.conn(), "SELECT phone FROM Member ORDER BY rowid")?;
    assert_eq!(phones, vec!["0105551234", PLACEHOLDER_PHONE, "01099998888"]);
    for phone in &phones {
        assert!(phone.len() >= 10 && phone.chars().all(|c| c.is_ascii_digit()));
    }

    let after = diagnose(db.conn(), &DiagnoseOptions::default())?;
    assert!(!after.problems_found(), "still dirty:\n{after}");
    assert_eq!(after.summary.missing_names, 0);
    assert_eq!(after.summary.missing_phones, 0);

    let again = clean(db.conn_mut(), run_time())?;
    assert!(again.is_noop());
    Ok(())
}

#[test]
fn fix_dates_then_expire() -> Result<()> {
    let (_dir, db_path) = scratch_db()?;
    let mut db = Database::open(&db_path)?;
    seed_dirty_members(db.conn())?;
    clean(db.conn_mut(), run_time())?;

    let fixed = fix_dates(db.conn_mut())?;
    assert_eq!(fixed.rows_scanned, 3);
    // only Alice still has date-only values after cleaning
    assert_eq!(fixed.rows_updated, 1);

    let alice: (String, String, String) = db.conn().query_row(
        "SELECT startDate, expiryDate, createdAt FROM Member WHERE name = 'Alice'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    assert_eq!(
        alice,
        (
            "2024-01-01 00:00:00".to_string(),
            "2024-12-31 23:59:59".to_string(),
            "2024-01-01 00:00:00".to_string()
        )
    );
    for date in all_strings(db.conn(), "SELECT startDate FROM Member")? {
        assert_eq!(date.len(), 19);
    }

    let second = fix_dates(db.conn_mut())?;
    assert_eq!(second.rows_updated, 0);

    let expired = expire_members(db.conn_mut(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())?;
    assert_eq!(expired.deactivated, 1);
    assert_eq!(expired.samples[0].name.as_deref(), Some("Alice"));
    assert_eq!(expired.samples[0].days_expired, 152);
    assert_eq!(expired.stats.active, 1);

    let active = all_strings(db.conn(), "SELECT name FROM Member WHERE isActive = 1")?;
    assert_eq!(active, vec!["Carol"]);
    Ok(())
}

#[test]
fn read_only_handle_refuses_writes() -> Result<()> {
    let (_dir, db_path) = scratch_db()?;
    let db = Database::open_read_only(&db_path)?;
    assert!(db.conn().execute("DELETE FROM Member", []).is_err());
    Ok(())
}

#[test]
fn missing_database_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.db");
    assert!(Database::open(&missing).is_err());
    assert!(!missing.exists());
}

#[test]
fn config_file_and_flags_pick_the_database() -> Result<()> {
    let (dir, db_path) = scratch_db()?;
    let config_path = dir.path().join("gym_maint.toml");
    std::fs::write(
        &config_path,
        format!(
            "db_path = {:?}\n\n[diagnose]\nanomaly_limit = 2\n",
            db_path.to_string_lossy()
        ),
    )?;

    let mut config = Config::from_file(&config_path)?;
    config.apply_env_with(|_| None);
    assert_eq!(config.db_path, db_path);
    assert_eq!(config.diagnose.anomaly_limit, 2);

    let overridden = config.with_overrides(Some(dir.path().join("other.db")), None);
    assert_eq!(overridden.db_path, dir.path().join("other.db"));
    Ok(())
}
