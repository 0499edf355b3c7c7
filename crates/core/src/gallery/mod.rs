//! Ranked image gallery with a lightbox viewer.
//!
//! Images fetched from a manifest can finish loading in any order, so every
//! image carries a rank reserved up front and the gallery always keeps them
//! ordered by rank.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{Result, TourError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub src: String,
    pub alt: Option<String>,
    pub classes: Vec<String>,
}

impl GalleryImage {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: None,
            classes: Vec::new(),
        }
    }
}

/// An image listed in a manifest whose rank is already reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub rank: u64,
    pub image: GalleryImage,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    url: Option<String>,
    alt: Option<String>,
    class: Option<String>,
    #[serde(default)]
    classes: Vec<String>,
}

/// Parsed gallery manifest: `{ "images": [...], "rootURL"?, "relativeURL"? }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryManifest {
    /// Prefix for every image URL; empty or ending in `/`.
    pub root: String,
    pub images: Vec<GalleryImage>,
}

impl GalleryManifest {
    /// Parses a manifest fetched from `manifest_url`. Entries without a `url`
    /// are reported and skipped.
    pub fn parse(bytes: &[u8], manifest_url: &str) -> Result<Self> {
        let mut root: Value = serde_json::from_slice(bytes)?;
        let entries = match root.get_mut("images").map(Value::take) {
            Some(Value::Array(entries)) => entries,
            _ => return Err(TourError::MissingImageList),
        };

        let mut prefix = match root.get("rootURL").and_then(Value::as_str) {
            Some(url) if root.get("relativeURL").and_then(Value::as_bool) == Some(true) => {
                resolve_relative(manifest_url, url)?
            }
            Some(url) => url.to_string(),
            None => String::new(),
        };
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        let mut images = Vec::with_capacity(entries.len());
        for (index, value) in entries.into_iter().enumerate() {
            let entry: ManifestEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::error!(index, error = %err, "skipping malformed gallery entry");
                    continue;
                }
            };
            let Some(url) = entry.url else {
                tracing::error!(index, "gallery entry has no `url`");
                continue;
            };

            let mut classes: Vec<String> = entry.class.into_iter().collect();
            classes.extend(entry.classes);
            images.push(GalleryImage {
                src: format!("{prefix}{url}"),
                alt: entry.alt,
                classes,
            });
        }

        Ok(Self { root: prefix, images })
    }
}

/// Base that site-relative URLs are joined against. Only its path survives
/// into the result.
const SITE_BASE: &str = "http://site.invalid/";

/// Resolves `relative` against `base` with browser URL semantics (dot
/// segments, queries, percent-encoding). Results on the site stay
/// site-relative and keep a leading `/` only when `base` or `relative` had
/// one; anything resolving to another origin is returned in full.
pub fn resolve_relative(base: &str, relative: &str) -> Result<String> {
    let site = Url::parse(SITE_BASE)?;
    let resolved = site.join(base)?.join(relative)?;
    if resolved.origin() != site.origin() {
        return Ok(resolved.into());
    }

    let mut path = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        path.push('?');
        path.push_str(query);
    }
    if !base.starts_with('/') && !relative.starts_with('/') {
        path.remove(0);
    }
    Ok(path)
}

/// Keys the lightbox responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Escape,
}

#[derive(Debug, Default)]
pub struct ImageGallery {
    images: BTreeMap<u64, GalleryImage>,
    next_rank: u64,
    viewing: Option<u64>,
}

impl ImageGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves ranks for every manifest image, in manifest order.
    pub fn queue_manifest(&mut self, manifest: GalleryManifest) -> Vec<PendingImage> {
        manifest
            .images
            .into_iter()
            .map(|image| PendingImage {
                rank: self.reserve_rank(),
                image,
            })
            .collect()
    }

    fn reserve_rank(&mut self) -> u64 {
        let rank = self.next_rank;
        self.next_rank = rank.saturating_add(1);
        rank
    }

    /// Adds a loaded image. Without a rank the next free one is used.
    pub fn add_image(&mut self, image: GalleryImage, rank: Option<u64>) -> Result<u64> {
        let rank = match rank {
            Some(rank) => rank,
            None => self.reserve_rank(),
        };
        if self.images.contains_key(&rank) {
            tracing::error!(rank, src = %image.src, "could not add image to gallery");
            return Err(TourError::RankConflict(rank));
        }

        self.next_rank = self.next_rank.max(rank.saturating_add(1));
        self.images.insert(rank, image);
        Ok(rank)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = (u64, &GalleryImage)> {
        self.images.iter().map(|(&rank, image)| (rank, image))
    }

    /// Opens the viewer on the image with `rank`.
    pub fn open(&mut self, rank: u64) -> Result<&GalleryImage> {
        let image = self
            .images
            .get(&rank)
            .ok_or(TourError::NoViewerImage("selected"))?;
        self.viewing = Some(rank);
        Ok(image)
    }

    pub fn is_open(&self) -> bool {
        self.viewing.is_some()
    }

    pub fn current(&self) -> Option<&GalleryImage> {
        self.viewing.and_then(|rank| self.images.get(&rank))
    }

    pub fn current_rank(&self) -> Option<u64> {
        self.viewing
    }

    fn neighbour_after(&self) -> Option<u64> {
        let rank = self.viewing?;
        self.images.range(rank.checked_add(1)?..).next().map(|(&rank, _)| rank)
    }

    fn neighbour_before(&self) -> Option<u64> {
        let rank = self.viewing?;
        self.images.range(..rank).next_back().map(|(&rank, _)| rank)
    }

    /// Whether the "next" button is enabled.
    pub fn can_next(&self) -> bool {
        self.neighbour_after().is_some()
    }

    pub fn can_prev(&self) -> bool {
        self.neighbour_before().is_some()
    }

    pub fn next(&mut self) -> Result<&GalleryImage> {
        let rank = self.neighbour_after().ok_or(TourError::NoViewerImage("next"))?;
        self.open(rank)
    }

    pub fn prev(&mut self) -> Result<&GalleryImage> {
        let rank = self.neighbour_before().ok_or(TourError::NoViewerImage("previous"))?;
        self.open(rank)
    }

    pub fn exit(&mut self) {
        self.viewing = None;
    }

    /// Keyboard navigation. Ignored while the viewer is closed or when the
    /// direction is disabled. Returns whether the key did anything.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.is_open() {
            return false;
        }
        match key {
            Key::Right if self.can_next() => self.next().is_ok(),
            Key::Left if self.can_prev() => self.prev().is_ok(),
            Key::Escape => {
                self.exit();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_resolves_relative_root() {
        let json = br#"{
            "rootURL": "../images/",
            "relativeURL": true,
            "images": [
                { "url": "a.png", "alt": "first", "class": "pixel-art" },
                { "alt": "no url" },
                { "url": "b.gif", "classes": ["wide", "framed"] }
            ]
        }"#;

        let manifest = GalleryManifest::parse(json, "/projects/outbreak/gallery.json").unwrap();
        assert_eq!(manifest.root, "/projects/images/");
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(manifest.images[0].src, "/projects/images/a.png");
        assert_eq!(manifest.images[0].classes, ["pixel-art"]);
        assert_eq!(manifest.images[1].classes, ["wide", "framed"]);
    }

    #[test]
    fn manifest_absolute_root_gets_trailing_slash() {
        let json = br#"{ "rootURL": "https://cdn.example/img", "images": [ { "url": "x.png" } ] }"#;
        let manifest = GalleryManifest::parse(json, "gallery.json").unwrap();
        assert_eq!(manifest.images[0].src, "https://cdn.example/img/x.png");

        assert!(matches!(
            GalleryManifest::parse(b"{}", "gallery.json"),
            Err(TourError::MissingImageList)
        ));
    }

    #[test]
    fn relative_resolution() {
        let resolve = |base, relative| resolve_relative(base, relative).unwrap();
        assert_eq!(resolve("a/b/gallery.json", "imgs"), "a/b/imgs");
        assert_eq!(resolve("a/b/gallery.json", "./imgs/"), "a/b/imgs/");
        assert_eq!(resolve("gallery.json", "imgs"), "imgs");
        assert_eq!(resolve("/a/gallery.json", "/root"), "/root");
        assert_eq!(resolve("/a/gallery.json", "my pics/?v=2"), "/a/my%20pics/?v=2");
        assert_eq!(
            resolve("/a/gallery.json", "https://cdn.example/x/../img/"),
            "https://cdn.example/img/"
        );
    }

    #[test]
    fn out_of_order_loads_keep_manifest_order() {
        let mut gallery = ImageGallery::new();
        let manifest = GalleryManifest {
            root: String::new(),
            images: vec![
                GalleryImage::new("1.png"),
                GalleryImage::new("2.png"),
                GalleryImage::new("3.png"),
            ],
        };
        let mut pending = gallery.queue_manifest(manifest);
        pending.reverse();

        for item in pending {
            gallery.add_image(item.image, Some(item.rank)).unwrap();
        }

        let order: Vec<&str> = gallery.images().map(|(_, image)| image.src.as_str()).collect();
        assert_eq!(order, ["1.png", "2.png", "3.png"]);
        assert_eq!(gallery.add_image(GalleryImage::new("4.png"), None).unwrap(), 3);
    }

    #[test]
    fn duplicate_rank_is_rejected() {
        let mut gallery = ImageGallery::new();
        gallery.add_image(GalleryImage::new("a.png"), Some(4)).unwrap();
        assert!(matches!(
            gallery.add_image(GalleryImage::new("b.png"), Some(4)),
            Err(TourError::RankConflict(4))
        ));
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn highest_rank_does_not_overflow() {
        let mut gallery = ImageGallery::new();
        gallery.add_image(GalleryImage::new("a.png"), Some(1)).unwrap();
        gallery.add_image(GalleryImage::new("z.png"), Some(u64::MAX)).unwrap();

        assert_eq!(gallery.open(u64::MAX).unwrap().src, "z.png");
        assert!(!gallery.can_next());
        assert!(!gallery.handle_key(Key::Right));
        assert!(gallery.can_prev());

        assert!(matches!(
            gallery.add_image(GalleryImage::new("b.png"), None),
            Err(TourError::RankConflict(u64::MAX))
        ));
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn viewer_navigation() {
        let mut gallery = ImageGallery::new();
        for src in ["a.png", "b.png", "c.png"] {
            gallery.add_image(GalleryImage::new(src), None).unwrap();
        }

        assert!(!gallery.handle_key(Key::Right));
        gallery.open(0).unwrap();
        assert!(!gallery.can_prev());
        assert!(!gallery.handle_key(Key::Left));

        assert!(gallery.handle_key(Key::Right));
        assert!(gallery.handle_key(Key::Right));
        assert_eq!(gallery.current().unwrap().src, "c.png");
        assert!(!gallery.can_next());
        assert!(gallery.next().is_err());

        assert_eq!(gallery.prev().unwrap().src, "b.png");
        assert!(gallery.handle_key(Key::Escape));
        assert!(!gallery.is_open());
        assert!(gallery.current().is_none());
    }
}
