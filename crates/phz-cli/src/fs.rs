//! Input discovery.
//!
//! Positional arguments may be files or directories; directories are walked
//! recursively for `*.php`. Results are sorted so repeated runs see the
//! same order.

use anyhow::{bail, Result};
use std::path::PathBuf;
use walkdir::WalkDir;

pub fn discover_php_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut from_dir: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("php"))
                })
                .collect();
            from_dir.sort();
            files.extend(from_dir);
        } else {
            bail!("path `{}` does not exist", path.display());
        }
    }
    Ok(files)
}
