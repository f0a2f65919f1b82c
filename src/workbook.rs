//! In-memory workbook model.
//!
//! Rows and columns are 1-based, matching what users see in a spreadsheet.

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Scalar value of a single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date or date-time kept as its Excel serial number (days since 1899-12-30)
    DateTime(f64),
}

impl CellValue {
    pub fn text(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }

    /// Empty cells and empty strings are blank; whitespace is content
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) | CellValue::DateTime(_) => false,
        }
    }

    /// Text of a non-blank cell
    pub fn non_blank_text(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
            CellValue::DateTime(serial) => match excel_serial_to_datetime(*serial) {
                Some(datetime) if has_time_of_day(*serial) => {
                    write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M:%S"))
                }
                Some(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d")),
                None => write!(f, "{}", serial),
            },
        }
    }
}

pub fn has_time_of_day(serial: f64) -> bool {
    serial.fract() != 0.0
}

/// Convert an Excel serial date (1900 date system) to a calendar date-time.
///
/// Serials below 60 predate Excel's phantom 1900-02-29 and shift by one day.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let mut days = serial.trunc() as i64;
    if serial < 60.0 {
        days += 1;
    }
    let seconds = (serial.fract() * 86_400.0).round() as i64;

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(TimeDelta::try_days(days)? + TimeDelta::try_seconds(seconds)?)
}

/// One worksheet as a grid of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    /// Build a sheet from rows of text starting at cell A1; empty strings stay blank
    #[cfg(test)]
    pub fn from_text_rows(name: &str, rows: &[&[&str]]) -> Self {
        let mut sheet = Self::new(name);
        for (row_index, row) in rows.iter().enumerate() {
            for (column_index, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.set_cell(
                        row_index as u32 + 1,
                        column_index as u32 + 1,
                        CellValue::text(value),
                    );
                }
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at (row, column); cells outside the grid are empty
    pub fn cell(&self, row: u32, column: u32) -> &CellValue {
        if row == 0 || column == 0 {
            return &EMPTY_CELL;
        }

        self.rows
            .get(row as usize - 1)
            .and_then(|cells| cells.get(column as usize - 1))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Set a cell, growing the grid as needed
    pub fn set_cell(&mut self, row: u32, column: u32, value: CellValue) {
        if row == 0 || column == 0 {
            return;
        }

        let (row, column) = (row as usize, column as usize);
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }

        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize_with(column, CellValue::default);
        }
        cells[column - 1] = value;
    }

    /// Last row holding any cell
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest row
    pub fn max_column(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    /// Non-blank cells as (row, column, value), row-major
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.rows.iter().enumerate().flat_map(|(row_index, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_blank())
                .map(move |(column_index, value)| {
                    (row_index as u32 + 1, column_index as u32 + 1, value)
                })
        })
    }
}

/// All sheets of a workbook; the first one is the active sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Result<Self> {
        if sheets.is_empty() {
            bail!("Workbook has no worksheet");
        }

        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[0]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[0]
    }
}
