use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::{Result, TourError};

/// Source of static assets (audio, timeline JSON, gallery manifests).
///
/// URLs are plain slash separated paths. Implementations report a missing
/// asset with [`TourError::AssetNotFound`].
pub trait AssetSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch(url)?;
        String::from_utf8(bytes).map_err(|_| TourError::msg(format!("asset `{url}` is not UTF-8")))
    }
}

/// Serves assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a URL onto a path below the root. Parent segments cannot escape it.
    pub fn resolve(&self, url: &str) -> PathBuf {
        let mut path = self.root.clone();
        for component in Path::new(url.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::ParentDir => {
                    if path != self.root {
                        path.pop();
                    }
                }
                _ => {}
            }
        }
        path
    }
}

impl AssetSource for DirectoryAssets {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(TourError::AssetNotFound(url.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Registry of in-memory assets keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(url.into(), bytes.into());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.assets.contains_key(url)
    }
}

impl AssetSource for MemoryAssets {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| TourError::AssetNotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_registered_assets() {
        let mut assets = MemoryAssets::new();
        assets.insert("tour/events.json", r#"{"events":[]}"#);

        assert_eq!(assets.fetch_text("tour/events.json").unwrap(), r#"{"events":[]}"#);
    }

    #[test]
    fn errors_on_missing_assets() {
        let assets = MemoryAssets::new();
        let err = assets.fetch("missing.mp3").unwrap_err();
        assert!(format!("{err}").contains("missing.mp3"));
    }

    #[test]
    fn directory_assets_stay_below_root() {
        let assets = DirectoryAssets::new("/srv/site");
        assert_eq!(assets.resolve("/audio/tour.mp3"), PathBuf::from("/srv/site/audio/tour.mp3"));
        assert_eq!(assets.resolve("../../etc/passwd"), PathBuf::from("/srv/site/etc/passwd"));
    }

    #[test]
    fn directory_assets_read_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("events.json"), b"{}").unwrap();
        let assets = DirectoryAssets::new(dir.path());

        assert_eq!(assets.fetch("events.json").unwrap(), b"{}");
        assert!(matches!(
            assets.fetch("nope.json"),
            Err(TourError::AssetNotFound(url)) if url == "nope.json"
        ));
    }
}
