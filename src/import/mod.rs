//! Destructive reload of the member table from a spreadsheet.
//!
//! The whole reload (clearing dependent rows, allocating membership numbers,
//! inserting members, storing the counter) runs in one transaction, so a
//! failed import leaves the database exactly as it was.

pub mod sheet;
pub mod transform;

use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

use crate::constants::{INVITATION_TABLE, MEMBER_COUNTER_TABLE, MEMBER_TABLE, RECEIPT_TABLE};
use crate::db::{require_table, table_exists};
use crate::error::Result;
use crate::member::{Member, MemberCounter};

pub use sheet::{load_sheet, Cell, Sheet};
pub use transform::{member_rows, prepare_member, prepare_members, SkippedRow};

/// Sheet row (1-based) holding the first member, after the header and
/// the secondary header.
const FIRST_MEMBER_SHEET_ROW: usize = 3;
const PREVIEW_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Import instant; its date becomes every member's start date.
    pub now: NaiveDateTime,
    pub expected_headers: Vec<String>,
    /// Prepare everything, then roll back instead of committing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearedRows {
    pub members: usize,
    pub receipts: usize,
    pub invitations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub sheet_name: String,
    pub rows_read: usize,
    pub prepared: usize,
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
    pub cleared: ClearedRows,
    pub numbers_assigned: i64,
    pub last_member_number: i64,
    pub dry_run: bool,
    pub preview: Vec<Member>,
}

pub fn import_members(
    conn: &mut Connection,
    sheet: &Sheet,
    options: &ImportOptions,
) -> Result<ImportReport> {
    // Preconditions are checked before anything is touched
    require_table(conn, MEMBER_TABLE)?;
    require_table(conn, MEMBER_COUNTER_TABLE)?;
    info!("✅ {} table found", MEMBER_TABLE);
    let rows = member_rows(sheet, &options.expected_headers)?;
    info!("📊 {} candidate rows in sheet '{}'", rows.len(), sheet.name);

    let tx = conn.transaction()?;
    let cleared = clear_existing(&tx)?;

    let mut counter = MemberCounter::load(&tx)?;
    let prepared = prepare_members(rows, FIRST_MEMBER_SHEET_ROW, &mut counter, options.now);
    info!(
        "📦 {} members ready, {} rows skipped",
        prepared.members.len(),
        prepared.skipped.len()
    );

    let mut report = ImportReport {
        sheet_name: sheet.name.clone(),
        rows_read: rows.len(),
        prepared: prepared.members.len(),
        inserted: 0,
        cleared,
        numbers_assigned: counter.allocated_count(),
        last_member_number: counter.last_assigned(),
        dry_run: options.dry_run,
        preview: prepared.members.iter().take(PREVIEW_SIZE).cloned().collect(),
        skipped: prepared.skipped,
    };

    if options.dry_run {
        tx.rollback()?;
        info!("Dry run, nothing written");
        return Ok(report);
    }

    if let Err(e) = insert_all(&tx, &prepared.members, &counter) {
        error!("❌ Import failed, rolling back: {}", e);
        if let Err(rollback_err) = tx.rollback() {
            warn!("Rollback failed: {}", rollback_err);
        }
        return Err(e);
    }
    tx.commit()?;

    report.inserted = prepared.members.len();
    info!(
        "✅ Inserted {} members, last membership number {}",
        report.inserted, report.last_member_number
    );
    Ok(report)
}

fn clear_existing(tx: &Transaction<'_>) -> Result<ClearedRows> {
    info!("🧹 Clearing existing member data");
    let receipts = if table_exists(tx, RECEIPT_TABLE)? {
        tx.execute("DELETE FROM Receipt WHERE memberId IS NOT NULL", [])?
    } else {
        warn!("{} table not found, skipping", RECEIPT_TABLE);
        0
    };
    let invitations = if table_exists(tx, INVITATION_TABLE)? {
        tx.execute("DELETE FROM Invitation", [])?
    } else {
        warn!("{} table not found, skipping", INVITATION_TABLE);
        0
    };
    let members = tx.execute("DELETE FROM Member", [])?;
    Ok(ClearedRows {
        members,
        receipts,
        invitations,
    })
}

fn insert_all(tx: &Transaction<'_>, members: &[Member], counter: &MemberCounter) -> Result<()> {
    for member in members {
        member.insert(tx)?;
    }
    counter.store(tx)
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Would delete" } else { "Deleted" };
        writeln!(f, "📊 Sheet: {}", self.sheet_name)?;
        writeln!(
            f,
            "🗑️  {} {} members, {} receipts, {} invitations",
            verb, self.cleared.members, self.cleared.receipts, self.cleared.invitations
        )?;
        writeln!(f, "📦 Rows read: {}", self.rows_read)?;
        writeln!(f, "⚠️  Rows skipped: {}", self.skipped.len())?;
        for skipped in self.skipped.iter().take(10) {
            writeln!(f, "   - row {}: {}", skipped.sheet_row, skipped.reason)?;
        }
        if self.dry_run {
            writeln!(f, "🔎 Dry run: {} members prepared, nothing written", self.prepared)?;
            for member in &self.preview {
                writeln!(
                    f,
                    "   #{} {} ({}) expires {}",
                    member.member_number, member.name, member.phone, member.expiry_date
                )?;
            }
        } else {
            writeln!(f, "✅ Inserted {} members", self.inserted)?;
        }
        write!(
            f,
            "📊 Membership numbers assigned: {}, last used: {}",
            self.numbers_assigned, self.last_member_number
        )
    }
}
