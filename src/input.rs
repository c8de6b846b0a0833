// src/input.rs

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of the package list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub repository_type: String,
    pub repository_url: String,
    /// Name of the package depending on this one, if any
    #[serde(default)]
    pub depended_by: String,
}

impl PackageRecord {
    fn validate(mut self, row: usize) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.repository_type = self.repository_type.trim().to_string();
        self.repository_url = self.repository_url.trim().to_string();
        self.depended_by = self.depended_by.trim().to_string();

        if self.name.is_empty() {
            return Err(Error::InvalidRecord { row, reason: "empty name".into() });
        }
        if self.repository_url.is_empty() {
            return Err(Error::InvalidRecord { row, reason: format!("empty repository_url for {:?}", self.name) });
        }
        Ok(self)
    }

    pub fn dependent(&self) -> Option<&str> {
        Some(self.depended_by.as_str()).filter(|name| !name.is_empty())
    }
}

pub fn read_records(path: &Path) -> Result<Vec<PackageRecord>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    records_from_reader(file)
}

/// Parses and validates CSV rows; names must be unique.
pub fn records_from_reader<R: Read>(reader: R) -> Result<Vec<PackageRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<PackageRecord>().enumerate() {
        let row_number = index + 1;
        let record = row
            .map_err(|e| Error::InvalidRecord { row: row_number, reason: e.to_string() })?
            .validate(row_number)?;
        if !seen.insert(record.name.clone()) {
            return Err(Error::InvalidRecord { row: row_number, reason: format!("duplicate package name {:?}", record.name) });
        }
        records.push(record);
    }
    Ok(records)
}
