/*!
 * Loader Module
 * Executable images, where they are stored, and how they become address spaces
 */

pub mod entry;
pub mod image;
#[allow(clippy::module_inception)]
pub mod loader;
pub mod store;
pub mod types;

pub use entry::{EntryTable, UserProgram};
pub use image::{ImageBuilder, ImageFile, Section};
pub use loader::{LoadedImage, Loader};
pub use store::{DirImageStore, ImageStore, LayeredImageStore, MemImageStore};
pub use types::{LoadError, LoadResult};
