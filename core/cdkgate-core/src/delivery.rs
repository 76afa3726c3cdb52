//! Access-gated delivery of the staged download asset.
//!
//! The authorization check runs before anything touches the filesystem, so
//! an unauthorized caller learns nothing about whether an asset exists —
//! only the generic `Unauthorized`.

use crate::{device::is_device_authorized, CoreError, CoreResult};
use cdkgate_store::CdkStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive extensions considered downloadable assets.
pub const ASSET_EXTENSIONS: &[&str] = &[".zip", ".rar", ".7z", ".tar.gz"];

/// A resolved downloadable asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    /// Full path to the asset on disk.
    pub path: PathBuf,
    /// File name for the content-disposition header.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Resolves the staged asset, if any: the first archive in the directory by
/// lexicographic filename order. At most one asset is expected to be staged
/// at a time; the ordering only makes the multi-asset case deterministic.
///
/// # Errors
///
/// Propagates IO errors other than the directory not existing (which is
/// simply "nothing staged").
pub fn find_staged_asset(assets_dir: &Path) -> CoreResult<Option<AssetHandle>> {
    let entries = match std::fs::read_dir(assets_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name().into_string().ok()?;
            let lower = name.to_ascii_lowercase();
            ASSET_EXTENSIONS
                .iter()
                .any(|ext| lower.ends_with(ext))
                .then_some(name)
        })
        .collect();
    names.sort();

    let Some(name) = names.into_iter().next() else {
        return Ok(None);
    };
    let path = assets_dir.join(&name);
    let size = std::fs::metadata(&path)?.len();
    Ok(Some(AssetHandle {
        path,
        file_name: name,
        size,
    }))
}

/// Fetches the staged asset for an authorized device.
///
/// # Errors
///
/// - `CoreError::Unauthorized` if the device holds no binding (checked
///   before the filesystem is touched)
/// - `CoreError::NotFound` if no asset is staged
/// - `CoreError::Validation` for an empty device id
pub fn fetch_asset_for_device(
    store: &dyn CdkStore,
    assets_dir: &Path,
    raw_device: &str,
) -> CoreResult<AssetHandle> {
    if !is_device_authorized(store, raw_device)? {
        return Err(CoreError::Unauthorized);
    }

    match find_staged_asset(assets_dir)? {
        Some(asset) => {
            debug!(file = %asset.file_name, size = asset.size, "resolved staged asset");
            Ok(asset)
        }
        None => Err(CoreError::NotFound(
            "no downloadable asset staged".to_string(),
        )),
    }
}
