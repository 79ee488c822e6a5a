/*!
 * Image Stores
 * Name → bytes lookup for executable images
 */

use super::image::ImageFile;
use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of executable images
///
/// Implementations only look bytes up; validation belongs to the loader.
pub trait ImageStore: Send + Sync {
    /// Raw bytes of the image called `name`, if it exists
    fn open(&self, name: &str) -> Option<Arc<[u8]>>;
}

/// Concurrent in-memory image store
#[derive(Debug, Clone, Default)]
pub struct MemImageStore {
    images: Arc<DashMap<String, Arc<[u8]>>>,
}

impl MemImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.images.insert(name.into(), bytes.into());
    }

    /// Encode `image` and store it under `name`
    pub fn insert_image(&self, name: impl Into<String>, image: &ImageFile) -> Result<(), bincode::Error> {
        let bytes = image.encode()?;
        self.insert(name, bytes);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> bool {
        self.images.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageStore for MemImageStore {
    fn open(&self, name: &str) -> Option<Arc<[u8]>> {
        self.images.get(name).map(|r| Arc::clone(r.value()))
    }
}

/// Images stored as files in a host directory
///
/// Only plain file names are resolved; anything with a separator or a
/// parent component is treated as missing.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }
}

impl ImageStore for DirImageStore {
    fn open(&self, name: &str) -> Option<Arc<[u8]>> {
        let path = self.resolve(name)?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes.into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Image file not found");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read image file");
                None
            }
        }
    }
}

/// Looks names up in each store in turn
#[derive(Clone, Default)]
pub struct LayeredImageStore {
    layers: Vec<Arc<dyn ImageStore>>,
}

impl LayeredImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_layer(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.layers.push(store);
        self
    }
}

impl ImageStore for LayeredImageStore {
    fn open(&self, name: &str) -> Option<Arc<[u8]>> {
        self.layers.iter().find_map(|layer| layer.open(name))
    }
}
