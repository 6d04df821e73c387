use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MaintenanceError, Result};

/// A spreadsheet cell reduced to what the importer cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Trimmed text form; `None` for empty or whitespace-only cells.
    /// Whole numbers render without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Integer value, truncating fractional numbers. Text must be a plain
    /// integer literal.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Cell::Number(_) => None,
            Cell::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

/// First worksheet of a workbook, with cells at their absolute positions
/// (row 0 is the sheet's first row even when it is blank).
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

pub(crate) static EMPTY_CELL: Cell = Cell::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Rows below the header row.
    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

pub fn load_sheet<P: AsRef<Path>>(path: P) -> Result<Sheet> {
    let path = path.as_ref();
    info!("📖 Reading spreadsheet {}", path.display());
    let mut workbook = open_workbook_auto(path)?;

    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| MaintenanceError::EmptySheet(path.display().to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MaintenanceError::EmptySheet(path.display().to_string()))??;

    let Some((start_row, start_col)) = range.start() else {
        return Err(MaintenanceError::EmptySheet(path.display().to_string()));
    };

    // calamine ranges begin at the first used cell; pad back to A1
    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }

    debug!(sheet = %name, rows = rows.len(), "Spreadsheet loaded");
    Ok(Sheet::new(name, rows))
}
