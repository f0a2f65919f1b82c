use super::headers::{HeaderMap, is_reserved};
use crate::workbook::{CellValue, Sheet};

/// One data row of the source: cell values keyed by header, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: u32,
    values: Vec<(String, CellValue)>,
}

impl Row {
    #[cfg(test)]
    pub fn new(index: u32, values: Vec<(String, CellValue)>) -> Self {
        Self { index, values }
    }

    /// Snapshot of row `index` restricted to the known headers
    pub fn from_sheet(sheet: &Sheet, headers: &HeaderMap, index: u32) -> Self {
        let values = headers
            .in_column_order()
            .into_iter()
            .map(|(name, column)| (name.to_string(), sheet.cell(index, column).clone()))
            .collect();

        Self { index, values }
    }

    /// Row of text cells, mainly for tests
    #[cfg(test)]
    pub fn from_pairs(index: u32, pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), CellValue::text(value)))
            .collect();

        Self { index, values }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn values(&self) -> &[(String, CellValue)] {
        &self.values
    }

    /// Text of the named column, or None when the column is missing or blank
    pub fn text(&self, header: &str) -> Option<String> {
        let header = header.trim();
        self.values
            .iter()
            .find(|(name, _)| name == header)
            .and_then(|(_, value)| value.non_blank_text())
    }

    /// Non-blank cells under non-reserved headers, in column order
    pub fn custom_fields(&self) -> Vec<(&str, String)> {
        self.values
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .filter_map(|(name, value)| value.non_blank_text().map(|text| (name.as_str(), text)))
            .collect()
    }
}
