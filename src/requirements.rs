// src/requirements.rs

//! Collects package names from `requirements*.txt` files, producing a list
//! that can be completed into a package CSV.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub repository_path: String,
    pub requirements_filename: String,
    pub package: String,
}

/// Package named by one requirements line, `None` for blanks, comments and
/// options. URLs are returned whole.
pub fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }
    if line.starts_with("http:") || line.starts_with("https:") {
        return Some(line.to_string());
    }
    line.split(|c: char| matches!(c, ' ' | '>' | '<' | '=' | ',')).next().map(String::from)
}

fn is_requirements_file(path: &Path) -> bool {
    let is_txt = path.extension().map_or(false, |ext| ext == "txt");
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
    is_txt && name.contains("requirements")
}

/// Requirements files below `root`, in file-name order.
pub fn find_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::io(root, e.into()))?;
        if entry.file_type().is_file() && is_requirements_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn scan(root: &Path) -> Result<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for file in find_files(root)? {
        let text = fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
        let filename = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        requirements.extend(text.lines().filter_map(parse_line).map(|package| Requirement {
            repository_path: root.display().to_string(),
            requirements_filename: filename.clone(),
            package,
        }));
    }
    Ok(requirements)
}

/// Scans every root and writes the results as CSV. Returns the row count.
pub fn write_csv(output: &Path, roots: &[PathBuf]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output)?;
    let mut total = 0;
    for root in roots {
        let found = scan(root)?;
        tracing::info!("{}: {} requirements found", root.display(), found.len());
        for requirement in &found {
            writer.serialize(requirement)?;
        }
        total += found.len();
    }
    writer.flush().map_err(|e| Error::io(output, e))?;
    Ok(total)
}
