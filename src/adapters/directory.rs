//! Directory-backed photo library.
//!
//! Treats every image file directly inside a directory as an asset. Asset
//! ids are derived from the file name, so they stay stable across runs as
//! long as files are not renamed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};

use super::{LibraryError, LibrarySource};
use crate::domain::{sort_newest_first, Asset, AssetId, DecodedImage, TargetSize};

/// Folder (inside the library) that removed assets are moved to
pub const TRASH_DIR_NAME: &str = ".sortify-trash";

/// File patterns treated as images when none are configured
pub fn default_include_patterns() -> Vec<String> {
    ["*.jpg", "*.jpeg", "*.png", "*.heic", "*.heif", "*.gif", "*.webp"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Photo library over a flat directory of image files
pub struct DirectoryLibrary {
    /// Directory holding the images
    root: PathBuf,

    /// File name patterns that count as images
    patterns: Vec<Pattern>,

    /// Where removed images are moved
    trash_dir: PathBuf,

    /// Display name
    name: String,
}

impl DirectoryLibrary {
    /// Open a library with the default image patterns
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        Self::with_patterns(root, &default_include_patterns())
    }

    /// Open a library matching files against custom glob patterns
    pub fn with_patterns(
        root: impl Into<PathBuf>,
        include: &[String],
    ) -> Result<Self, LibraryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(LibraryError::DirectoryNotFound(root));
        }

        let patterns = include
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| LibraryError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());

        Ok(Self {
            trash_dir: root.join(TRASH_DIR_NAME),
            root,
            patterns,
            name,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    /// Check whether a file name matches any include pattern
    pub fn is_image(&self, file_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(file_name, MATCH_OPTIONS))
    }
}

#[async_trait]
impl LibrarySource for DirectoryLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, LibraryError> {
        let mut assets = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !self.is_image(name) {
                continue;
            }

            let metadata = entry.metadata().await?;
            let created = metadata.created().or_else(|_| metadata.modified())?;

            assets.push(
                Asset::new(asset_id_for(name), DateTime::<Utc>::from(created))
                    .with_location(entry.path()),
            );
        }

        // read_dir order is platform-defined; fix it before the date sort
        assets.sort_by(|a, b| a.location.cmp(&b.location));
        sort_newest_first(&mut assets);

        debug!(library = %self.name, count = assets.len(), "Listed library assets");
        Ok(assets)
    }

    async fn decode(
        &self,
        asset: &Asset,
        target: TargetSize,
    ) -> Result<Option<DecodedImage>, LibraryError> {
        let path = asset
            .location()
            .ok_or_else(|| LibraryError::NoLocation(asset.id.to_string()))?;

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(DecodedImage::new(asset.id.clone(), bytes, target)))
    }

    async fn remove(&self, asset: &Asset) -> Result<(), LibraryError> {
        let path = asset
            .location()
            .ok_or_else(|| LibraryError::NoLocation(asset.id.to_string()))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| LibraryError::NoLocation(asset.id.to_string()))?;

        fs::create_dir_all(&self.trash_dir).await?;

        let mut destination = self.trash_dir.join(file_name);
        let mut attempt = 1u32;
        while fs::try_exists(&destination).await? {
            destination = self.trash_dir.join(format!(
                "{}-{}-{}",
                asset.id,
                attempt,
                file_name.to_string_lossy()
            ));
            attempt += 1;
        }

        fs::rename(path, &destination).await?;
        info!(asset_id = %asset.id, to = %destination.display(), "Moved asset to trash");

        Ok(())
    }
}

/// Derive a stable asset id from a file name (first 16 hex chars of SHA256)
pub fn asset_id_for(file_name: &str) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    let result = hasher.finalize();
    AssetId::new(hex::encode(&result[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_with(files: &[&str]) -> (DirectoryLibrary, TempDir) {
        let temp = TempDir::new().unwrap();
        for file in files {
            std::fs::write(temp.path().join(file), b"not really a jpeg").unwrap();
        }
        let library = DirectoryLibrary::open(temp.path()).unwrap();
        (library, temp)
    }

    #[test]
    fn test_asset_id_is_stable() {
        let id1 = asset_id_for("IMG_0001.JPG");
        let id2 = asset_id_for("IMG_0001.JPG");
        let id3 = asset_id_for("IMG_0002.JPG");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1.as_str().len(), 16);
    }

    #[test]
    fn test_image_patterns_ignore_case_and_dotfiles() {
        let (library, _temp) = library_with(&[]);

        assert!(library.is_image("IMG_0001.JPG"));
        assert!(library.is_image("holiday.heic"));
        assert!(!library.is_image("notes.txt"));
        assert!(!library.is_image(".hidden.jpg"));
    }

    #[test]
    fn test_open_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let result = DirectoryLibrary::open(&missing);
        assert!(matches!(result, Err(LibraryError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let temp = TempDir::new().unwrap();
        let result = DirectoryLibrary::with_patterns(temp.path(), &["[".to_string()]);
        assert!(matches!(result, Err(LibraryError::Pattern { .. })));
    }

    #[tokio::test]
    async fn test_list_skips_non_images() {
        let (library, _temp) = library_with(&["a.jpg", "b.png", "readme.md"]);

        let assets = library.list_assets().await.unwrap();
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|a| a.location.is_some()));
    }

    #[tokio::test]
    async fn test_decode_reads_bytes_and_handles_missing_file() {
        let (library, temp) = library_with(&["a.jpg"]);
        let assets = library.list_assets().await.unwrap();
        let asset = &assets[0];

        let image = library
            .decode(asset, TargetSize::MAXIMUM)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(image.asset_id, asset.id);
        assert_eq!(&image.bytes[..], b"not really a jpeg");

        std::fs::remove_file(temp.path().join("a.jpg")).unwrap();
        let missing = library.decode(asset, TargetSize::MAXIMUM).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_remove_moves_to_trash() {
        let (library, temp) = library_with(&["a.jpg", "b.jpg"]);
        let assets = library.list_assets().await.unwrap();
        let victim = assets
            .iter()
            .find(|a| a.location().unwrap().ends_with("a.jpg"))
            .unwrap();

        library.remove(victim).await.unwrap();

        assert!(!temp.path().join("a.jpg").exists());
        assert!(temp.path().join(TRASH_DIR_NAME).join("a.jpg").exists());

        // Trash folder is a directory, so it never shows up as an asset
        let remaining = library.list_assets().await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
