use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use super::sheet::{Cell, Sheet, EMPTY_CELL};
use crate::constants::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::error::{MaintenanceError, Result};
use crate::member::{generate_member_id, strip_phone_separators, Member, MemberCounter};

// Positional contract with the source spreadsheet
pub const COLUMN_REMAINING_DAYS: usize = 0;
pub const COLUMN_PHONE: usize = 1;
pub const COLUMN_MEMBER_NUMBER: usize = 2;
pub const COLUMN_NAME: usize = 3;
pub const MAPPED_COLUMNS: usize = 4;

/// Data rows of the sheet with the secondary header row removed.
///
/// When `expected_headers` is non-empty the secondary header must carry
/// exactly those labels in the first four columns.
pub fn member_rows<'a>(
    sheet: &'a Sheet,
    expected_headers: &[String],
) -> Result<&'a [Vec<Cell>]> {
    let data = sheet.data_rows();
    let Some((secondary_header, rows)) = data.split_first() else {
        return Err(MaintenanceError::EmptySheet(sheet.name.clone()));
    };
    if !expected_headers.is_empty() {
        validate_headers(secondary_header, expected_headers)?;
    }
    Ok(rows)
}

pub fn validate_headers(header: &[Cell], expected: &[String]) -> Result<()> {
    for (idx, expected) in expected.iter().enumerate().take(MAPPED_COLUMNS) {
        let found = header
            .get(idx)
            .and_then(Cell::as_text)
            .unwrap_or_default();
        if found != expected.trim() {
            return Err(MaintenanceError::HeaderMismatch {
                column: idx + 1,
                expected: expected.trim().to_string(),
                found,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based row number in the spreadsheet.
    pub sheet_row: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PreparedRows {
    pub members: Vec<Member>,
    pub skipped: Vec<SkippedRow>,
}

/// Turn spreadsheet rows into members, allocating fallback membership
/// numbers from `counter`. `first_sheet_row` is the 1-based position of
/// `rows[0]` in the sheet, used only for reporting.
pub fn prepare_members(
    rows: &[Vec<Cell>],
    first_sheet_row: usize,
    counter: &mut MemberCounter,
    now: NaiveDateTime,
) -> PreparedRows {
    let mut prepared = PreparedRows::default();
    for (offset, row) in rows.iter().enumerate() {
        let sheet_row = first_sheet_row + offset;
        match prepare_member(row, counter, now) {
            Some(member) => prepared.members.push(member),
            None => {
                debug!(sheet_row, "Skipping row without a name");
                prepared.skipped.push(SkippedRow {
                    sheet_row,
                    reason: "empty name".to_string(),
                });
            }
        }
    }
    prepared
}

/// Build one member from a row, or `None` when the row has no name.
pub fn prepare_member(
    row: &[Cell],
    counter: &mut MemberCounter,
    now: NaiveDateTime,
) -> Option<Member> {
    let cell = |col: usize| row.get(col).unwrap_or(&EMPTY_CELL);
    let name = cell(COLUMN_NAME).as_text()?;

    let phone = cell(COLUMN_PHONE)
        .as_text()
        .map(|p| strip_phone_separators(&p))
        .unwrap_or_default();

    let member_number = match cell(COLUMN_MEMBER_NUMBER).as_integer() {
        Some(n) if n > 0 => n,
        _ => {
            let n = counter.allocate();
            debug!(name = %name, member_number = n, "Assigned next membership number");
            n
        }
    };

    let raw_days = cell(COLUMN_REMAINING_DAYS);
    let days = raw_days.as_integer().unwrap_or_else(|| {
        if raw_days.as_text().is_some() {
            warn!(name = %name, value = ?raw_days, "Remaining days is not a number, using 0");
        }
        0
    });
    let remaining = days.max(0);

    let today = now.date();
    let expiry = add_days(today, remaining);
    let provenance = raw_days.as_text().unwrap_or_else(|| "0".to_string());

    Some(Member {
        id: generate_member_id(),
        member_number,
        name,
        phone,
        profile_image: None,
        in_body_scans: 0,
        invitations: 0,
        free_pt_sessions: 0,
        subscription_price: 0.0,
        remaining_amount: 0.0,
        notes: Some(format!("Imported from spreadsheet - remaining days: {provenance}")),
        is_active: remaining > 0,
        start_date: today.format(DATE_FORMAT).to_string(),
        expiry_date: expiry.format(DATE_FORMAT).to_string(),
        created_at: now.format(TIMESTAMP_FORMAT).to_string(),
    })
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64)).unwrap_or_else(|| {
        warn!(days, "Remaining days overflow the calendar, capping expiry");
        NaiveDate::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_number_falls_back_to_counter() {
        let mut counter = MemberCounter::starting_at(1001);
        let row = vec![Cell::Number(30.0), text("010-555 1234"), text(""), text("Test A")];
        let member = prepare_member(&row, &mut counter, now()).unwrap();

        assert_eq!(member.member_number, 1001);
        assert_eq!(member.phone, "0105551234");
        assert!(member.is_active);
        assert_eq!(member.start_date, "2025-01-15");
        assert_eq!(member.expiry_date, "2025-02-14");
        assert_eq!(member.created_at, "2025-01-15 14:05:09");
        assert_eq!(member.id.len(), 25);
        assert_eq!(member.notes.as_deref(), Some("Imported from spreadsheet - remaining days: 30"));
        assert_eq!(counter.last_assigned(), 1001);
    }

    #[test]
    fn negative_days_clamp_to_today_and_inactive() {
        let mut counter = MemberCounter::starting_at(1001);
        let row = vec![
            Cell::Number(-5.0),
            text("0115551111"),
            Cell::Number(2002.0),
            text("Test B"),
        ];
        let member = prepare_member(&row, &mut counter, now()).unwrap();

        assert_eq!(member.member_number, 2002);
        assert!(!member.is_active);
        assert_eq!(member.expiry_date, "2025-01-15");
        assert_eq!(member.notes.as_deref(), Some("Imported from spreadsheet - remaining days: -5"));
        // explicit number leaves the counter alone
        assert_eq!(counter.allocated_count(), 0);
    }

    #[test]
    fn non_positive_or_garbage_numbers_use_counter() {
        let mut counter = MemberCounter::starting_at(1500);
        for number in [Cell::Number(0.0), Cell::Number(-3.0), text("abc"), Cell::Empty] {
            let row = vec![text("x"), text("0100000001"), number, text("N")];
            prepare_member(&row, &mut counter, now()).unwrap();
        }
        assert_eq!(counter.allocated_count(), 4);
        assert_eq!(counter.last_assigned(), 1503);
    }

    #[test]
    fn unparseable_days_mean_zero() {
        let mut counter = MemberCounter::starting_at(1);
        let row = vec![text("soon"), Cell::Empty, Cell::Number(7.0), text("C")];
        let member = prepare_member(&row, &mut counter, now()).unwrap();
        assert!(!member.is_active);
        assert_eq!(member.expiry_date, member.start_date);
        assert_eq!(member.phone, "");
    }

    #[test]
    fn rows_without_names_are_skipped_with_position() {
        let mut counter = MemberCounter::starting_at(1001);
        let rows = vec![
            vec![Cell::Number(10.0), text("0100000001"), Cell::Empty, text("  ")],
            vec![Cell::Number(10.0), text("0100000002"), Cell::Empty, text("Kept")],
            vec![Cell::Number(10.0), text("0100000003")],
        ];
        let prepared = prepare_members(&rows, 3, &mut counter, now());
        assert_eq!(prepared.members.len(), 1);
        assert_eq!(prepared.members[0].member_number, 1001);
        let positions: Vec<usize> = prepared.skipped.iter().map(|s| s.sheet_row).collect();
        assert_eq!(positions, vec![3, 5]);
    }

    #[test]
    fn secondary_header_is_dropped_and_checked() {
        let sheet = Sheet::new(
            "Members",
            vec![
                vec![],
                vec![text("days"), text("phone"), text("code"), text("name")],
                vec![Cell::Number(1.0), text("0100000001"), Cell::Empty, text("A")],
            ],
        );
        let expected = labels(&["days", "phone", "code", "name"]);
        assert_eq!(member_rows(&sheet, &expected).unwrap().len(), 1);
        assert_eq!(member_rows(&sheet, &[]).unwrap().len(), 1);

        let wrong = labels(&["days", "name", "code", "phone"]);
        match member_rows(&sheet, &wrong).unwrap_err() {
            MaintenanceError::HeaderMismatch { column, expected, found } => {
                assert_eq!(column, 2);
                assert_eq!(expected, "name");
                assert_eq!(found, "phone");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sheet_without_secondary_header_is_rejected() {
        let sheet = Sheet::new("Empty", vec![vec![text("header")]]);
        assert!(matches!(
            member_rows(&sheet, &[]),
            Err(MaintenanceError::EmptySheet(_))
        ));
    }
}
