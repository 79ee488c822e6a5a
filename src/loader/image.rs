/*!
 * Executable Image Format
 *
 * An image is a bincode-encoded header followed by its sections:
 *
 * - `magic`: must equal `IMAGE_MAGIC`
 * - `entry`: symbol bound to a native routine through the `EntryTable`
 * - `sections`: page-aligned chunks loaded at `first_vpn`
 */

use crate::core::limits::{IMAGE_MAGIC, MAX_IMAGE_BYTES, PAGE_SIZE};
use crate::core::types::Vpn;
use bincode::Options;
use serde::{Deserialize, Serialize};

fn codec() -> impl Options {
    bincode::options().with_limit(MAX_IMAGE_BYTES)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub first_vpn: Vpn,
    pub num_pages: u32,
    pub data: Vec<u8>,
}

impl Section {
    /// Bytes destined for page `index` of this section
    pub fn page_data(&self, index: usize) -> &[u8] {
        let start = (index * PAGE_SIZE).min(self.data.len());
        let end = ((index + 1) * PAGE_SIZE).min(self.data.len());
        &self.data[start..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub magic: u16,
    pub entry: String,
    pub sections: Vec<Section>,
}

impl ImageFile {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        codec().serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        codec().deserialize(bytes)
    }

    pub fn num_pages(&self) -> usize {
        self.sections.iter().map(|s| s.num_pages as usize).sum()
    }
}

/// Assembles well-formed images, laying sections out back to back
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    entry: String,
    sections: Vec<Section>,
    next_vpn: Vpn,
}

impl ImageBuilder {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            sections: Vec::new(),
            next_vpn: 0,
        }
    }

    /// Append a section sized to fit `data` (at least one page)
    #[must_use]
    pub fn section(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        let num_pages = data.len().div_ceil(PAGE_SIZE).max(1) as u32;
        self.sections.push(Section {
            name: name.into(),
            first_vpn: self.next_vpn,
            num_pages,
            data,
        });
        self.next_vpn += num_pages;
        self
    }

    pub fn build(self) -> ImageFile {
        let mut sections = self.sections;
        if sections.is_empty() {
            sections.push(Section {
                name: ".text".to_string(),
                first_vpn: 0,
                num_pages: 1,
                data: Vec::new(),
            });
        }
        ImageFile {
            magic: IMAGE_MAGIC,
            entry: self.entry,
            sections,
        }
    }
}
