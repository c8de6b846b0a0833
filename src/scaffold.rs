// src/scaffold.rs

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Copies the template tree into `output`, overwriting files that exist in
/// both. Returns the number of files copied.
pub fn copy_template(template: &Path, output: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(template).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::io(template, e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(template) else { continue };
        let target = output.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
            copied += 1;
        }
    }
    debug!("Copied {} template files into {}", copied, output.display());
    Ok(copied)
}
