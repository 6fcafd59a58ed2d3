use crate::instrument;

use anyhow::Context;
use rayon::prelude::*;

/// Date of the terminal record of a price file.
///
/// Blank lines are dropped first, so trailing newlines or padding do not hide
/// the real last record. The date is the first comma-separated field.
///
/// # Returns
/// * `Option<&str>` - `None` for a file without any non-blank line.
pub fn last_record_date(contents: &str) -> Option<&str> {
    let last = contents.lines().map(str::trim).filter(|l| !l.is_empty()).next_back()?;
    last.split(',').next().map(str::trim)
}

/// Instrument identifier for a file: its base name up to the first `.`.
fn instrument_id<P: AsRef<std::path::Path>>(path: P) -> Option<String> {
    let file_name = path.as_ref().file_name()?.to_str()?;
    file_name.split('.').next().map(str::to_string)
}

/// Dotfiles such as `.DS_Store` are not instrument files.
fn is_hidden(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Scans one category directory and returns the instruments whose last record
/// is dated `last_date`.
///
/// Files are read in parallel. Any unreadable file aborts the scan.
fn scan_category(
    data_dir: &std::path::Path,
    asset_type: instrument::AssetType,
    last_date: &str,
) -> anyhow::Result<Vec<(String, instrument::InstrumentRecord)>> {
    let dir_path = data_dir.join(asset_type.dir_name());
    let mut paths = std::fs::read_dir(&dir_path)
        .with_context(|| format!("failed to list {}", dir_path.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|p| p.is_file() && !is_hidden(p));
    paths.sort();

    let selected = paths
        .par_iter()
        .map(|path| {
            tracing::debug!("Reading {}", path.display());
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            let record = match (last_record_date(&contents), instrument_id(path)) {
                (Some(date), Some(id)) if date == last_date => Some((
                    id,
                    instrument::InstrumentRecord {
                        asset_type,
                        filepath: path.clone(),
                    },
                )),
                _ => None,
            };
            anyhow::Ok(record)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    anyhow::Ok(selected.into_iter().flatten().collect())
}

/// Selects every instrument under `<data_dir>/stocks` and `<data_dir>/etfs`
/// whose most recent record is dated `last_date`, and persists the selection
/// to the manifest file.
///
/// # Arguments
/// * `data_dir` - Root directory holding the `stocks` and `etfs` directories.
/// * `last_date` - Expected date of the terminal record, `YYYY-MM-DD`.
///
/// # Returns
/// * `anyhow::Result<instrument::Manifest>` - The selection that was written.
///
/// # Errors
/// * If a category directory is missing or a file cannot be read.
/// * If the manifest cannot be written.
pub fn pick_assets<P: AsRef<std::path::Path>>(
    data_dir: P,
    last_date: &str,
) -> anyhow::Result<instrument::Manifest> {
    let data_dir = data_dir.as_ref();
    let mut manifest = instrument::Manifest::new();

    for asset_type in instrument::AssetType::ALL {
        let selected = scan_category(data_dir, asset_type, last_date)?;
        tracing::info!(
            category = asset_type.dir_name(),
            selected = selected.len(),
            "scanned category"
        );
        for (id, record) in selected {
            if let Some(previous) = manifest.insert(id.clone(), record) {
                tracing::warn!("{} found in several categories, replacing {}", id, previous.filepath.display());
            }
        }
    }

    instrument::save_manifest(data_dir, &manifest)?;
    tracing::info!("✅ Selected {} instrument(s) ending on {}", manifest.len(), last_date);
    anyhow::Ok(manifest)
}
