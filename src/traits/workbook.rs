use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use rust_xlsxwriter::Format;
use tempfile::NamedTempFile;

use crate::workbook::{CellValue, Sheet, Workbook, has_time_of_day};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Trait for loading and saving workbooks to enable testing with mocks
pub trait WorkbookStore: Send + Sync {
    /// Read every sheet of the workbook at `path`
    fn load(&self, path: &Path) -> Result<Workbook>;

    /// Write the workbook back to `path`, replacing the file
    fn save(&self, path: &Path, workbook: &Workbook) -> Result<()>;
}

/// Excel store reading with calamine and writing with rust_xlsxwriter.
///
/// Cell values of every sheet survive a round trip, dates keep a date format;
/// other cell styling does not. Saves go through a temporary file in the same
/// directory that replaces the target only once it is complete.
pub struct XlsxWorkbookStore;

impl WorkbookStore for XlsxWorkbookStore {
    fn load(&self, path: &Path) -> Result<Workbook> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {:?}", path))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names().to_owned() {
            let range = workbook
                .worksheet_range(&name)
                .with_context(|| format!("Failed to read worksheet '{}' in {:?}", name, path))?;

            let (start_row, start_column) = range.start().unwrap_or((0, 0));
            let mut sheet = Sheet::new(&name);

            for (row, column, data) in range.cells() {
                let value = cell_value(data);
                if !value.is_blank() {
                    sheet.set_cell(
                        start_row + row as u32 + 1,
                        start_column + column as u32 + 1,
                        value,
                    );
                }
            }

            sheets.push(sheet);
        }

        Workbook::new(sheets).with_context(|| format!("Failed to load workbook: {:?}", path))
    }

    fn save(&self, path: &Path, workbook: &Workbook) -> Result<()> {
        let mut output = rust_xlsxwriter::Workbook::new();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

        for sheet in workbook.sheets() {
            let worksheet = output.add_worksheet();
            worksheet
                .set_name(sheet.name())
                .with_context(|| format!("Invalid worksheet name: {}", sheet.name()))?;

            for (row, column, value) in sheet.cells() {
                let row = row - 1;
                let column = u16::try_from(column - 1)
                    .with_context(|| format!("Column {} is out of range", column))?;

                match value {
                    CellValue::Text(text) => {
                        worksheet.write_string(row, column, text)?;
                    }
                    CellValue::Number(number) => {
                        worksheet.write_number(row, column, *number)?;
                    }
                    CellValue::Bool(flag) => {
                        worksheet.write_boolean(row, column, *flag)?;
                    }
                    CellValue::DateTime(serial) => {
                        let format = if has_time_of_day(*serial) {
                            &datetime_format
                        } else {
                            &date_format
                        };
                        worksheet.write_number_with_format(row, column, *serial, format)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }

        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let temp = NamedTempFile::new_in(directory)
            .with_context(|| format!("Failed to create a temporary file in {:?}", directory))?;
        if let Ok(metadata) = std::fs::metadata(path) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .with_context(|| format!("Failed to copy permissions of {:?}", path))?;
        }

        output
            .save(temp.path())
            .with_context(|| format!("Failed to save workbook: {:?}", path))?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace workbook: {:?}", path))?;

        Ok(())
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(number) => CellValue::Number(*number),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::DateTime(datetime) if datetime.is_duration() => CellValue::Number(datetime.as_f64()),
        Data::DateTime(datetime) => CellValue::DateTime(datetime.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// In-memory workbook store for testing; remembers every save
#[cfg(test)]
pub struct MemoryWorkbookStore {
    workbook: std::sync::Mutex<Option<Workbook>>,
    saves: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl MemoryWorkbookStore {
    pub fn new(workbook: Workbook) -> Self {
        Self {
            workbook: std::sync::Mutex::new(Some(workbook)),
            saves: std::sync::Mutex::new(0),
        }
    }

    /// Workbook as last saved (or as seeded when never saved)
    pub fn workbook(&self) -> Workbook {
        self.workbook
            .lock()
            .unwrap()
            .clone()
            .expect("memory store holds a workbook")
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[cfg(test)]
impl WorkbookStore for MemoryWorkbookStore {
    fn load(&self, path: &Path) -> Result<Workbook> {
        self.workbook
            .lock()
            .unwrap()
            .clone()
            .with_context(|| format!("Workbook not found in memory store: {:?}", path))
    }

    fn save(&self, _path: &Path, workbook: &Workbook) -> Result<()> {
        *self.workbook.lock().unwrap() = Some(workbook.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
