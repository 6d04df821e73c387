use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::constants::{
    DEFAULT_FIRST_MEMBER_NUMBER, GENERATED_ID_LEN, MAX_ID_LEN, MIN_ID_LEN, MIN_PHONE_DIGITS,
    PLACEHOLDER_NAME_PREFIX, PLACEHOLDER_PHONE,
};
use crate::error::Result;

/// A member row as written by the importer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub id: String,
    pub member_number: i64,
    pub name: String,
    pub phone: String,
    pub profile_image: Option<String>,
    pub in_body_scans: i64,
    pub invitations: i64,
    pub free_pt_sessions: i64,
    pub subscription_price: f64,
    pub remaining_amount: f64,
    pub notes: Option<String>,
    pub is_active: bool,
    pub start_date: String,
    pub expiry_date: String,
    pub created_at: String,
}

impl Member {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO Member
             (id, memberNumber, name, phone, profileImage,
              inBodyScans, invitations, freePTSessions, subscriptionPrice,
              remainingAmount, notes, isActive, startDate, expiryDate, createdAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        stmt.execute(params![
            self.id,
            self.member_number,
            self.name,
            self.phone,
            self.profile_image,
            self.in_body_scans,
            self.invitations,
            self.free_pt_sessions,
            self.subscription_price,
            self.remaining_amount,
            self.notes,
            self.is_active,
            self.start_date,
            self.expiry_date,
            self.created_at,
        ])?;
        Ok(())
    }
}

/// The three timestamp columns of a member and the time-of-day each one
/// gets when only a date was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    Expiry,
    Created,
}

impl DateField {
    pub const ALL: [DateField; 3] = [DateField::Start, DateField::Expiry, DateField::Created];

    pub fn column(self) -> &'static str {
        match self {
            DateField::Start => "startDate",
            DateField::Expiry => "expiryDate",
            DateField::Created => "createdAt",
        }
    }

    pub fn time_suffix(self) -> &'static str {
        match self {
            DateField::Start | DateField::Created => "00:00:00",
            DateField::Expiry => "23:59:59",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }
}

/// Keep only ASCII digits; fall back to the placeholder when too short.
pub fn normalize_phone_digits(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        PLACEHOLDER_PHONE.to_string()
    } else {
        digits
    }
}

/// Spreadsheet phones only lose spaces and hyphens; other characters stay.
pub fn strip_phone_separators(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != ' ' && *c != '-').collect()
}

pub fn placeholder_name(sequence: usize) -> String {
    format!("{}{}", PLACEHOLDER_NAME_PREFIX, sequence)
}

/// A 25-character identifier taken from a v4 UUID with separators removed.
pub fn generate_member_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_ID_LEN);
    id
}

pub fn id_length_in_bounds(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.chars().count())
}

/// Hands out sequential membership numbers backed by the `MemberCounter` row.
#[derive(Debug)]
pub struct MemberCounter {
    next: i64,
    initial_next: i64,
}

impl MemberCounter {
    /// Read the counter, creating it when absent. Must run inside the
    /// caller's transaction so a failed import leaves no trace.
    pub fn load(conn: &Connection) -> Result<Self> {
        let current: Option<i64> = conn
            .query_row("SELECT current FROM MemberCounter WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        let next = match current {
            Some(current) => current + 1,
            None => {
                info!(
                    "MemberCounter row missing, starting at {}",
                    DEFAULT_FIRST_MEMBER_NUMBER
                );
                conn.execute(
                    "INSERT INTO MemberCounter (id, current) VALUES (1, ?1)",
                    params![DEFAULT_FIRST_MEMBER_NUMBER - 1],
                )?;
                DEFAULT_FIRST_MEMBER_NUMBER
            }
        };
        Ok(Self {
            next,
            initial_next: next,
        })
    }

    pub fn starting_at(next: i64) -> Self {
        Self {
            next,
            initial_next: next,
        }
    }

    pub fn allocate(&mut self) -> i64 {
        let number = self.next;
        self.next += 1;
        number
    }

    pub fn last_assigned(&self) -> i64 {
        self.next - 1
    }

    pub fn allocated_count(&self) -> i64 {
        self.next - self.initial_next
    }

    pub fn store(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "UPDATE MemberCounter SET current = ?1 WHERE id = 1",
            params![self.last_assigned()],
        )?;
        Ok(())
    }
}
