use std::collections::HashMap;

use crate::workbook::Sheet;

pub const APPLICATION_NAME: &str = "Application Name";
pub const BUSINESS_CRITICALITY: &str = "Business Criticality";
pub const POLICY: &str = "Policy";
pub const SUBMITTING_PARTY: &str = "Submitting party";
pub const VENDOR: &str = "Vendor";
pub const ORIGIN: &str = "Origin";
pub const INDUSTRY: &str = "Industry";
pub const APPLICATION_PURPOSE: &str = "Application Purpose";
pub const DEPLOYMENT_METHOD: &str = "Deployment Method";
pub const DESCRIPTION: &str = "Description";
pub const TAGS: &str = "Tags";
pub const BUSINESS_UNIT: &str = "Business Unit";
pub const BUSINESS_OWNER: &str = "Business Owner";
pub const OWNER_EMAIL: &str = "Owner Email";
pub const TEAMS: &str = "Teams";
pub const DYNAMIC_SCAN_APPROVAL: &str = "Dynamic Scan Approval";
pub const ARCHER_APPLICATION_NAME: &str = "Archer Application Name";

/// Headers with a fixed meaning; every other header is a custom field.
/// `Submitting party` and `Vendor` are only listed so they are ignored.
pub const RESERVED_HEADERS: [&str; 17] = [
    APPLICATION_NAME,
    BUSINESS_CRITICALITY,
    POLICY,
    SUBMITTING_PARTY,
    VENDOR,
    ORIGIN,
    INDUSTRY,
    APPLICATION_PURPOSE,
    DEPLOYMENT_METHOD,
    DESCRIPTION,
    TAGS,
    BUSINESS_UNIT,
    BUSINESS_OWNER,
    OWNER_EMAIL,
    TEAMS,
    DYNAMIC_SCAN_APPROVAL,
    ARCHER_APPLICATION_NAME,
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_HEADERS.contains(&name)
}

/// Column index of every header name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    columns: HashMap<String, u32>,
    last_column: u32,
}

impl HeaderMap {
    /// Read header names left to right from `header_row`, stopping at the first blank cell
    pub fn from_sheet(sheet: &Sheet, header_row: u32) -> Self {
        let mut headers = Self::default();

        for column in 1..=sheet.max_column() {
            let name = sheet.cell(header_row, column).to_string();
            let name = name.trim();
            if name.is_empty() {
                break;
            }
            headers.insert(name, column);
        }

        headers
    }

    /// Headers occupying consecutive columns starting at column 1
    #[cfg(test)]
    pub fn from_names(names: &[&str]) -> Self {
        let mut headers = Self::default();
        for (index, name) in names.iter().enumerate() {
            headers.insert(name.trim(), index as u32 + 1);
        }
        headers
    }

    fn insert(&mut self, name: &str, column: u32) {
        self.columns.insert(name.to_string(), column);
        self.last_column = self.last_column.max(column);
    }

    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<u32> {
        self.columns.get(name.trim()).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column holding each row's import outcome, right after the last header
    pub fn status_column(&self) -> u32 {
        self.last_column + 1
    }

    /// (name, column) pairs ordered by column
    pub fn in_column_order(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self
            .columns
            .iter()
            .map(|(name, column)| (name.as_str(), *column))
            .collect();
        entries.sort_by_key(|(_, column)| *column);
        entries
    }

    /// Headers that become custom fields, in column order
    pub fn custom_field_names(&self) -> Vec<&str> {
        self.in_column_order()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| !is_reserved(name))
            .collect()
    }
}
