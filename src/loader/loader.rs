/*!
 * Executable Loader
 *
 * Resolves a name to a validated image and materializes it into a fresh
 * address space. Nothing observable is created until every check passes.
 */

use super::entry::{EntryTable, UserProgram};
use super::image::ImageFile;
use super::store::ImageStore;
use super::types::{LoadError, LoadResult};
use crate::core::limits::{EXECUTABLE_SUFFIX, IMAGE_MAGIC, MAX_STRING_LENGTH};
use crate::memory::{AddressSpace, FramePool};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// An image that passed validation and has a bound entry routine
pub struct LoadedImage {
    pub name: String,
    pub image: ImageFile,
    pub program: Arc<dyn UserProgram>,
}

impl LoadedImage {
    /// Pages occupied by the image sections
    pub fn code_pages(&self) -> usize {
        self.image.num_pages()
    }

    /// Allocate an address space and copy every section into it
    pub fn instantiate(&self, pool: &FramePool, stack_pages: usize) -> LoadResult<AddressSpace> {
        let mut space = AddressSpace::new(pool, self.code_pages(), stack_pages).map_err(|source| {
            debug!(name = %self.name, error = %source, "Insufficient physical memory");
            LoadError::Memory {
                name: self.name.clone(),
                source,
            }
        })?;

        for section in &self.image.sections {
            trace!(
                name = %self.name,
                section = %section.name,
                pages = section.num_pages,
                "Initializing section"
            );
            for i in 0..section.num_pages as usize {
                let vpn = section.first_vpn + i as u32;
                space
                    .load_page(vpn, section.page_data(i))
                    .map_err(|source| LoadError::Memory {
                        name: self.name.clone(),
                        source,
                    })?;
            }
        }

        Ok(space)
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("name", &self.name)
            .field("entry", &self.image.entry)
            .field("code_pages", &self.code_pages())
            .finish()
    }
}

#[derive(Clone)]
pub struct Loader {
    store: Arc<dyn ImageStore>,
    entries: EntryTable,
}

impl Loader {
    pub fn new(store: Arc<dyn ImageStore>, entries: EntryTable) -> Self {
        Self { store, entries }
    }

    pub fn entries(&self) -> &EntryTable {
        &self.entries
    }

    /// Check the shape of an executable name before touching the store
    pub fn validate_name(name: &str) -> LoadResult<()> {
        let valid = !name.is_empty()
            && name.len() <= MAX_STRING_LENGTH
            && !name.contains('\0')
            && name.len() > EXECUTABLE_SUFFIX.len()
            && name.ends_with(EXECUTABLE_SUFFIX);
        if valid {
            Ok(())
        } else {
            Err(LoadError::InvalidName(name.to_string()))
        }
    }

    pub fn load(&self, name: &str) -> LoadResult<LoadedImage> {
        debug!(name, "Loading executable");
        Self::validate_name(name)?;

        let bytes = self
            .store
            .open(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let image = ImageFile::decode(&bytes).map_err(|e| LoadError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate_image(name, &image)?;

        let program = self
            .entries
            .resolve(&image.entry)
            .ok_or_else(|| LoadError::UnknownEntry {
                name: name.to_string(),
                entry: image.entry.clone(),
            })?;

        Ok(LoadedImage {
            name: name.to_string(),
            image,
            program,
        })
    }

    fn validate_image(name: &str, image: &ImageFile) -> LoadResult<()> {
        let malformed = |reason: String| LoadError::Malformed {
            name: name.to_string(),
            reason,
        };

        if image.magic != IMAGE_MAGIC {
            return Err(LoadError::BadMagic {
                name: name.to_string(),
                found: image.magic,
            });
        }
        if image.sections.is_empty() {
            return Err(malformed("no sections".to_string()));
        }
        if image.entry.is_empty() {
            return Err(malformed("empty entry symbol".to_string()));
        }

        let mut expected = 0u32;
        for section in &image.sections {
            if section.first_vpn != expected {
                debug!(name, section = %section.name, "Fragmented executable");
                return Err(LoadError::Fragmented {
                    name: name.to_string(),
                    section: section.name.clone(),
                    first_vpn: section.first_vpn,
                    expected,
                });
            }
            let capacity = section.num_pages as usize * crate::core::limits::PAGE_SIZE;
            if section.num_pages == 0 || section.data.len() > capacity {
                return Err(malformed(format!(
                    "section {} holds {} bytes in {} pages",
                    section.name,
                    section.data.len(),
                    section.num_pages
                )));
            }
            expected = expected
                .checked_add(section.num_pages)
                .ok_or_else(|| malformed("section pages overflow".to_string()))?;
        }

        Ok(())
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader").field("entries", &self.entries).finish()
    }
}
