#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gym_maint::db::Database;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

/// A scratch database file with the member tables created.
pub fn scratch_db() -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dev.db");
    let db = Database::create(&path)?;
    db.bootstrap_schema()?;
    Ok((dir, path))
}

pub enum Value<'a> {
    Blank,
    Text(&'a str),
    Number(f64),
}

/// Write a workbook laid out like the gym's export: an empty first row,
/// a row of column labels, then one row per member.
pub fn write_members_xlsx(path: &Path, rows: &[[Value<'_>; 4]]) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Members")?;

    for (col, label) in ["Remaining days", "Phone", "Member code", "Name"].iter().enumerate() {
        worksheet.write_string(1, col as u16, *label)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let sheet_row = idx as u32 + 2;
        for (col, value) in row.iter().enumerate() {
            match value {
                Value::Blank => {}
                Value::Text(s) => {
                    worksheet.write_string(sheet_row, col as u16, *s)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(sheet_row, col as u16, *n)?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}
