use crate::{AtlasEntry, AtlasRect, DecodedImage, Descriptor, ResourceError};
use parking_lot::Mutex;
use std::{
    fmt::{self, Display},
    mem,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Sprite,
    Template,
    Item,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Sprite => "sprite",
            ResourceKind::Template => "template",
            ResourceKind::Item => "item",
        })
    }
}

#[derive(Debug)]
pub enum LoadState<T> {
    Unloaded,
    Loaded(Arc<T>),
}

/// A resource that only knows where it lives until someone asks for it.
///
/// The state lock is held for the whole load, so concurrent first accesses load once, and
/// everyone else waits for the result.
#[derive(Debug)]
pub struct LazyResource<T> {
    path: PathBuf,
    state: Mutex<LoadState<T>>,
}

impl<T> LazyResource<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Loaded(_))
    }

    /// Returns the cached value, or loads it with `load` first. Failed loads leave the resource
    /// unloaded.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, ResourceError>
    where
        F: FnOnce(&Path) -> Result<T, ResourceError>,
    {
        let mut state = self.state.lock();
        if let LoadState::Loaded(value) = &*state {
            return Ok(value.clone());
        }

        let value = Arc::new(load(&self.path)?);
        *state = LoadState::Loaded(value.clone());
        Ok(value)
    }

    /// Drops the cached value, if any. Returns whether there was one.
    pub fn unload(&self) -> bool {
        let previous = mem::replace(&mut *self.state.lock(), LoadState::Unloaded);
        matches!(previous, LoadState::Loaded(_))
    }
}

/// A single entry of the [`ResourceCache`](crate::ResourceCache).
#[derive(Debug)]
pub enum ResourceEntry {
    /// A sprite. Atlas sprites share the `image` of their atlas and carry the region within it.
    Sprite {
        image: Arc<LazyResource<DecodedImage>>,
        region: Option<AtlasEntry>,
    },
    Template(LazyResource<Descriptor>),
    Item(LazyResource<Descriptor>),
}

impl ResourceEntry {
    /// A standalone sprite, decoded from the image container at `path`.
    pub fn sprite(path: impl Into<PathBuf>) -> Self {
        Self::Sprite {
            image: Arc::new(LazyResource::new(path)),
            region: None,
        }
    }

    /// A sprite within an atlas, sharing the atlas' image.
    pub fn atlas_region(image: Arc<LazyResource<DecodedImage>>, entry: AtlasEntry) -> Self {
        Self::Sprite {
            image,
            region: Some(entry),
        }
    }

    pub fn template(path: impl Into<PathBuf>) -> Self {
        Self::Template(LazyResource::new(path))
    }

    pub fn item(path: impl Into<PathBuf>) -> Self {
        Self::Item(LazyResource::new(path))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Sprite { .. } => ResourceKind::Sprite,
            Self::Template(_) => ResourceKind::Template,
            Self::Item(_) => ResourceKind::Item,
        }
    }

    /// Path of the file backing the entry. For atlas sprites, that's the atlas image.
    pub fn path(&self) -> &Path {
        match self {
            Self::Sprite { image, .. } => image.path(),
            Self::Template(descriptor) | Self::Item(descriptor) => descriptor.path(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            Self::Sprite { image, .. } => image.is_loaded(),
            Self::Template(descriptor) | Self::Item(descriptor) => descriptor.is_loaded(),
        }
    }

    pub(crate) fn unload(&self) -> bool {
        match self {
            Self::Sprite { image, .. } => image.unload(),
            Self::Template(descriptor) | Self::Item(descriptor) => descriptor.unload(),
        }
    }
}

/// Decoded sprite, as handed out by the cache.
///
/// Sprites cut from an atlas share the whole atlas image and only remember their region.
#[derive(Debug, Clone)]
pub struct SpriteHandle {
    pub(crate) image: Arc<DecodedImage>,
    pub(crate) region: Option<AtlasRect>,
}

impl SpriteHandle {
    /// The full backing image. For atlas sprites, this is the entire atlas.
    pub fn image(&self) -> &Arc<DecodedImage> {
        &self.image
    }

    pub fn region(&self) -> Option<AtlasRect> {
        self.region
    }

    pub fn width(&self) -> u32 {
        self.region
            .map(|rect| rect.width)
            .unwrap_or(self.image.width())
    }

    pub fn height(&self) -> u32 {
        self.region
            .map(|rect| rect.height)
            .unwrap_or(self.image.height())
    }

    /// Copies just the sprite's pixels into a standalone image.
    ///
    /// Returns `None` only if the region doesn't fit the image, which the cache never lets
    /// through.
    pub fn to_rgba(&self) -> Option<DecodedImage> {
        match self.region {
            Some(rect) => self.image.crop(rect),
            None => Some(DecodedImage::clone(&self.image)),
        }
    }
}

pub type DescriptorHandle = Arc<Descriptor>;
