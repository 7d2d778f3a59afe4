//! The resource cache
//!
//! The cache maps string identifiers to lazily loaded resources. It's filled by an
//! [inventory pass](ResourceCache::inventory), which only records where everything lives, and
//! resources get decoded on the first `get_*` call asking for them.
//!
//! One cache is meant to exist for the whole lifetime of the editor, shared by reference. It's
//! `Send + Sync`, and every resource is decoded at most once, even when several threads ask for
//! it at the same time.

use crate::{
    descriptor::read_descriptor, image::decode_image_file, AssetConfig, ResourceError,
};
use ahash::AHashMap;
use log::*;
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

mod entry;
pub use entry::*;
mod inventory;
pub use inventory::*;

/// Load counters, mostly useful for verifying that nothing gets decoded twice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub images_decoded: u64,
    pub descriptors_read: u64,
}

pub struct ResourceCache {
    config: AssetConfig,
    entries: RwLock<AHashMap<String, Arc<ResourceEntry>>>,

    images_decoded: AtomicU64,
    descriptors_read: AtomicU64,
}

impl ResourceCache {
    pub fn new(config: AssetConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(AHashMap::new()),
            images_decoded: AtomicU64::new(0),
            descriptors_read: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Registers an entry under `id`, replacing any previous entry with that identifier.
    /// Returns `true` if something got replaced.
    pub fn insert(&self, id: impl Into<String>, entry: ResourceEntry) -> bool {
        let id = id.into();
        let replaced = self.entries.write().insert(id.clone(), Arc::new(entry));
        if let Some(previous) = &replaced {
            trace!(
                "Resource `{id}` re-registered, replacing {} `{}`",
                previous.kind(),
                previous.path().display()
            );
        }
        replaced.is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<ResourceKind> {
        self.entries.read().get(id).map(|entry| entry.kind())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All registered identifiers with their kinds, sorted by identifier.
    pub fn identifiers(&self) -> Vec<(String, ResourceKind)> {
        let mut ids: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.kind()))
            .collect();
        ids.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            images_decoded: self.images_decoded.load(Ordering::Relaxed),
            descriptors_read: self.descriptors_read.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, id: &str) -> Result<Arc<ResourceEntry>, ResourceError> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ResourceError::ResourceNotFound { id: id.to_string() })
    }

    /// Returns a sprite, decoding its image if that hasn't happened yet.
    pub fn get_sprite(&self, id: &str) -> Result<SpriteHandle, ResourceError> {
        let entry = self.lookup(id)?;
        let ResourceEntry::Sprite { image, region } = &*entry else {
            return Err(ResourceError::TypeMismatch {
                id: id.to_string(),
                expected: ResourceKind::Sprite,
                found: entry.kind(),
            });
        };

        let decoded = image.get_or_load(|path| {
            debug!("Decoding `{}` for sprite `{id}`", path.display());
            self.images_decoded.fetch_add(1, Ordering::Relaxed);
            decode_image_file(path)
        })?;

        if let Some(region) = region {
            if !region.rect.fits_within(decoded.width(), decoded.height()) {
                return Err(ResourceError::RegionOutOfBounds {
                    id: id.to_string(),
                    rect: region.rect,
                    width: decoded.width(),
                    height: decoded.height(),
                });
            }
        }

        Ok(SpriteHandle {
            image: decoded,
            region: region.as_ref().map(|region| region.rect),
        })
    }

    /// Returns a template descriptor, reading it if that hasn't happened yet.
    pub fn get_template(&self, id: &str) -> Result<DescriptorHandle, ResourceError> {
        self.get_descriptor(id, ResourceKind::Template)
    }

    /// Returns an item descriptor, reading it if that hasn't happened yet.
    pub fn get_item(&self, id: &str) -> Result<DescriptorHandle, ResourceError> {
        self.get_descriptor(id, ResourceKind::Item)
    }

    fn get_descriptor(
        &self,
        id: &str,
        expected: ResourceKind,
    ) -> Result<DescriptorHandle, ResourceError> {
        let entry = self.lookup(id)?;
        let descriptor = match (&*entry, expected) {
            (ResourceEntry::Template(descriptor), ResourceKind::Template)
            | (ResourceEntry::Item(descriptor), ResourceKind::Item) => descriptor,
            _ => {
                return Err(ResourceError::TypeMismatch {
                    id: id.to_string(),
                    expected,
                    found: entry.kind(),
                })
            }
        };

        descriptor.get_or_load(|path| {
            debug!("Reading {expected} `{id}` from `{}`", path.display());
            self.descriptors_read.fetch_add(1, Ordering::Relaxed);
            read_descriptor(id, path)
        })
    }

    /// Drops the loaded data of a single resource. Its registration stays. Returns whether
    /// anything was loaded.
    ///
    /// Atlas sprites share their image with the atlas and with each other, so unloading any of
    /// them unloads all of them.
    pub fn unload(&self, id: &str) -> Result<bool, ResourceError> {
        Ok(self.lookup(id)?.unload())
    }

    /// Drops all loaded data. Every entry stays registered, and gets loaded again on the next
    /// request.
    pub fn unload_all(&self) {
        let unloaded = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.unload())
            .count();
        debug!("Unloaded {unloaded} resources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode_image, AtlasEntry, AtlasRect, DecodedImage};
    use std::{fs, path::Path, thread};

    fn write_image(path: &Path, width: u32, height: u32) -> DecodedImage {
        let pixels = (0..width * height * 4).map(|i| (i * 7 % 251) as u8).collect();
        let image = DecodedImage::new(width, height, pixels).unwrap();
        fs::write(path, encode_image(&image, 1).unwrap()).unwrap();
        image
    }

    #[test]
    fn sprites_decode_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ball.ctex");
        let image = write_image(&path, 8, 8);

        let cache = ResourceCache::new(AssetConfig::default());
        cache.insert("ball", ResourceEntry::sprite(&path));

        let first = cache.get_sprite("ball").unwrap();
        let second = cache.get_sprite("ball").unwrap();
        assert!(Arc::ptr_eq(first.image(), second.image()));
        assert_eq!(**first.image(), image);
        assert_eq!(cache.stats().images_decoded, 1);
    }

    #[test]
    fn concurrent_first_access_decodes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.ctex");
        write_image(&path, 256, 256);

        let cache = ResourceCache::new(AssetConfig::default());
        cache.insert("big", ResourceEntry::sprite(&path));

        let handles: Vec<_> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_sprite("big").unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(cache.stats().images_decoded, 1);
        assert!(handles
            .windows(2)
            .all(|pair| Arc::ptr_eq(pair[0].image(), pair[1].image())));
    }

    #[test]
    fn unload_all_keeps_entries_decodable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peg.ctex");
        write_image(&path, 4, 4);

        let cache = ResourceCache::new(AssetConfig::default());
        cache.insert("peg", ResourceEntry::sprite(&path));

        let before = cache.get_sprite("peg").unwrap();
        cache.unload_all();
        assert!(cache.contains("peg"));

        let after = cache.get_sprite("peg").unwrap();
        assert!(!Arc::ptr_eq(before.image(), after.image()));
        assert_eq!(before.image(), after.image());
        assert_eq!(cache.stats().images_decoded, 2);
    }

    #[test]
    fn missing_and_mismatched_lookups() {
        let cache = ResourceCache::new(AssetConfig::default());
        cache.insert("ball/heavy", ResourceEntry::template("heavy.json"));

        assert!(matches!(
            cache.get_sprite("nothing"),
            Err(ResourceError::ResourceNotFound { .. })
        ));
        assert!(matches!(
            cache.get_sprite("ball/heavy"),
            Err(ResourceError::TypeMismatch {
                expected: ResourceKind::Sprite,
                found: ResourceKind::Template,
                ..
            })
        ));
        assert!(matches!(
            cache.get_item("ball/heavy"),
            Err(ResourceError::TypeMismatch {
                expected: ResourceKind::Item,
                ..
            })
        ));
    }

    #[test]
    fn failed_decodes_are_returned_and_retried_on_next_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.ctex");

        let cache = ResourceCache::new(AssetConfig::default());
        cache.insert("late", ResourceEntry::sprite(&path));

        assert!(matches!(
            cache.get_sprite("late"),
            Err(ResourceError::FileOpen { .. })
        ));

        write_image(&path, 2, 2);
        assert!(cache.get_sprite("late").is_ok());
    }

    #[test]
    fn atlas_regions_share_the_atlas_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pegs.ctex");
        let atlas = write_image(&path, 32, 16);

        let cache = ResourceCache::new(AssetConfig::default());
        let backing = ResourceEntry::sprite(&path);
        let ResourceEntry::Sprite { image, .. } = &backing else {
            unreachable!()
        };
        let image = image.clone();
        cache.insert("pegs", backing);

        for (id, x) in [("blue", 0), ("orange", 16)] {
            let entry = AtlasEntry {
                id: id.to_string(),
                rect: AtlasRect {
                    x,
                    y: 0,
                    width: 16,
                    height: 16,
                },
                atlas_id: String::from("pegs"),
            };
            cache.insert(id, ResourceEntry::atlas_region(image.clone(), entry));
        }

        let blue = cache.get_sprite("blue").unwrap();
        let orange = cache.get_sprite("orange").unwrap();
        let whole = cache.get_sprite("pegs").unwrap();
        assert!(Arc::ptr_eq(blue.image(), orange.image()));
        assert!(Arc::ptr_eq(blue.image(), whole.image()));
        assert_eq!(cache.stats().images_decoded, 1);

        assert_eq!((orange.width(), orange.height()), (16, 16));
        assert_eq!((whole.width(), whole.height()), (32, 16));
        let orange_pixels = orange.to_rgba().unwrap();
        assert_eq!(&orange_pixels.pixels()[..16 * 4], &atlas.pixels()[16 * 4..32 * 4]);
    }

    #[test]
    fn unloading_a_region_unloads_the_whole_atlas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pegs.ctex");
        write_image(&path, 16, 8);
        let other = dir.path().join("ball.ctex");
        write_image(&other, 2, 2);

        let cache = ResourceCache::new(AssetConfig::default());
        let image = Arc::new(LazyResource::new(&path));
        cache.insert(
            "pegs",
            ResourceEntry::Sprite {
                image: image.clone(),
                region: None,
            },
        );
        for (id, x) in [("blue", 0), ("orange", 8)] {
            let entry = AtlasEntry {
                id: id.to_string(),
                rect: AtlasRect {
                    x,
                    y: 0,
                    width: 8,
                    height: 8,
                },
                atlas_id: String::from("pegs"),
            };
            cache.insert(id, ResourceEntry::atlas_region(image.clone(), entry));
        }
        cache.insert("ball", ResourceEntry::sprite(&other));

        cache.get_sprite("blue").unwrap();
        cache.get_sprite("ball").unwrap();
        assert_eq!(cache.stats().images_decoded, 2);

        assert!(cache.unload("blue").unwrap());
        assert!(!cache.unload("orange").unwrap());
        assert!(!cache.unload("pegs").unwrap());
        assert!(!image.is_loaded());
        assert!(cache.contains("blue"));
        assert!(matches!(
            cache.unload("nothing"),
            Err(ResourceError::ResourceNotFound { .. })
        ));

        // Untouched by the atlas unload
        cache.get_sprite("ball").unwrap();
        assert_eq!(cache.stats().images_decoded, 2);

        let orange = cache.get_sprite("orange").unwrap();
        let whole = cache.get_sprite("pegs").unwrap();
        assert!(Arc::ptr_eq(orange.image(), whole.image()));
        assert_eq!(cache.stats().images_decoded, 3);
    }

    #[test]
    fn regions_outside_the_atlas_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.ctex");
        write_image(&path, 8, 8);

        let cache = ResourceCache::new(AssetConfig::default());
        let entry = AtlasEntry {
            id: String::from("oops"),
            rect: AtlasRect {
                x: 4,
                y: 4,
                width: 8,
                height: 8,
            },
            atlas_id: String::from("small"),
        };
        cache.insert(
            "oops",
            ResourceEntry::atlas_region(Arc::new(LazyResource::new(&path)), entry),
        );

        assert!(matches!(
            cache.get_sprite("oops"),
            Err(ResourceError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn reinserting_replaces_the_entry() {
        let cache = ResourceCache::new(AssetConfig::default());
        assert!(!cache.insert("thing", ResourceEntry::sprite("a.ctex")));
        assert!(cache.insert("thing", ResourceEntry::item("thing.json")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.kind_of("thing"), Some(ResourceKind::Item));
    }
}
