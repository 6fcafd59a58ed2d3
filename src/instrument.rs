use anyhow::Context;

/// File name of the selection manifest inside the data directory.
pub const MANIFEST_FILE: &str = "selected_assets.txt";

/// Category directory an instrument file was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stocks,
    Etfs,
}

impl AssetType {
    pub const ALL: [AssetType; 2] = [AssetType::Stocks, AssetType::Etfs];

    /// Sub-directory name under the data directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetType::Stocks => "stocks",
            AssetType::Etfs => "etfs",
        }
    }
}

/// Manifest entry for one selected instrument.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InstrumentRecord {
    pub asset_type: AssetType,
    pub filepath: std::path::PathBuf,
}

/// Instrument identifier → record, iterated in identifier order.
pub type Manifest = std::collections::BTreeMap<String, InstrumentRecord>;

pub fn manifest_path<P: AsRef<std::path::Path>>(data_dir: P) -> std::path::PathBuf {
    data_dir.as_ref().join(MANIFEST_FILE)
}

/// Writes the manifest as a JSON object to `<data_dir>/selected_assets.txt`.
pub fn save_manifest<P: AsRef<std::path::Path>>(data_dir: P, manifest: &Manifest) -> anyhow::Result<()> {
    let path = manifest_path(data_dir);
    let json = serde_json::to_string(manifest)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write manifest {}", path.display()))?;
    anyhow::Ok(())
}

/// Reads the manifest written by a previous selection run.
pub fn load_manifest<P: AsRef<std::path::Path>>(data_dir: P) -> anyhow::Result<Manifest> {
    let path = manifest_path(data_dir);
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = serde_json::from_str(&data)
        .with_context(|| format!("malformed manifest {}", path.display()))?;
    anyhow::Ok(manifest)
}
