/*!
 * Loader Tests
 * Image validation, store lookup, and materialization into address spaces
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use userprog_kernel::core::limits::{IMAGE_MAGIC, PAGE_SIZE};
use userprog_kernel::loader::{ImageFile, Section};
use userprog_kernel::{
    DirImageStore, EntryTable, FramePool, ImageBuilder, ImageStore, LayeredImageStore, LoadError,
    Loader, MemImageStore, ProgramResult, UserContext,
};

fn noop(_ctx: &mut UserContext) -> ProgramResult<i32> {
    Ok(0)
}

fn loader_with(store: MemImageStore) -> Loader {
    let entries = EntryTable::new();
    entries.register("main", Arc::new(noop));
    Loader::new(Arc::new(store), entries)
}

fn store_with(name: &str, image: &ImageFile) -> MemImageStore {
    let store = MemImageStore::new();
    store.insert_image(name, image).unwrap();
    store
}

#[test]
fn test_load_and_instantiate() {
    let image = ImageBuilder::new("main")
        .section(".text", b"code".to_vec())
        .section(".data", vec![9; PAGE_SIZE + 3])
        .build();
    let loader = loader_with(store_with("prog.coff", &image));
    let pool = FramePool::new(32);

    let loaded = loader.load("prog.coff").unwrap();
    assert_eq!(loaded.code_pages(), 3);

    let space = loaded.instantiate(&pool, 4).unwrap();
    assert_eq!(space.num_pages(), 3 + 4 + 1);
    assert_eq!(pool.stats().used_frames, 8);

    let mut text = [0u8; 4];
    space.read_exact(0, &mut text).unwrap();
    assert_eq!(&text, b"code");

    let mut tail = [0u8; 4];
    space.read_exact((2 * PAGE_SIZE) as u32, &mut tail).unwrap();
    assert_eq!(tail, [9, 9, 9, 0]);

    drop(space);
    assert_eq!(pool.stats().used_frames, 0);
}

#[test]
fn test_missing_image_is_not_found() {
    let loader = loader_with(MemImageStore::new());
    assert_eq!(
        loader.load("nothing.coff").unwrap_err(),
        LoadError::NotFound("nothing.coff".into())
    );
}

#[test]
fn test_garbage_is_malformed() {
    let store = MemImageStore::new();
    store.insert("junk.coff", vec![0xFFu8; 3]);
    let loader = loader_with(store);
    assert!(matches!(
        loader.load("junk.coff"),
        Err(LoadError::Malformed { .. })
    ));
}

#[test]
fn test_bad_magic() {
    let mut image = ImageBuilder::new("main").build();
    image.magic = 0x7f45;
    let loader = loader_with(store_with("elf.coff", &image));
    assert!(matches!(
        loader.load("elf.coff"),
        Err(LoadError::BadMagic { found: 0x7f45, .. })
    ));
}

#[test]
fn test_fragmented_sections() {
    let image = ImageFile {
        magic: IMAGE_MAGIC,
        entry: "main".into(),
        sections: vec![
            Section {
                name: ".text".into(),
                first_vpn: 0,
                num_pages: 1,
                data: vec![],
            },
            Section {
                name: ".data".into(),
                first_vpn: 3,
                num_pages: 1,
                data: vec![],
            },
        ],
    };
    let loader = loader_with(store_with("frag.coff", &image));
    assert!(matches!(
        loader.load("frag.coff"),
        Err(LoadError::Fragmented { first_vpn: 3, expected: 1, .. })
    ));
}

#[test]
fn test_unknown_entry() {
    let image = ImageBuilder::new("nowhere").build();
    let loader = loader_with(store_with("lost.coff", &image));
    assert!(matches!(
        loader.load("lost.coff"),
        Err(LoadError::UnknownEntry { .. })
    ));
}

#[test]
fn test_instantiate_out_of_frames() {
    let image = ImageBuilder::new("main").build();
    let loader = loader_with(store_with("big.coff", &image));
    let pool = FramePool::new(2);

    let loaded = loader.load("big.coff").unwrap();
    assert!(matches!(
        loaded.instantiate(&pool, 8),
        Err(LoadError::Memory { .. })
    ));
    assert_eq!(pool.stats().used_frames, 0);
}

#[test]
fn test_dir_store_behind_builtin_layer() {
    let dir = tempfile::tempdir().unwrap();
    let on_disk = ImageBuilder::new("main")
        .section(".text", b"disk".to_vec())
        .build();
    std::fs::write(dir.path().join("disk.coff"), on_disk.encode().unwrap()).unwrap();

    let builtin = MemImageStore::new();
    builtin
        .insert_image("mem.coff", &ImageBuilder::new("main").build())
        .unwrap();

    let layered = LayeredImageStore::new()
        .with_layer(Arc::new(DirImageStore::new(dir.path())))
        .with_layer(Arc::new(builtin));
    assert!(layered.open("disk.coff").is_some());
    assert!(layered.open("mem.coff").is_some());

    let entries = EntryTable::new();
    entries.register("main", Arc::new(noop));
    let loader = Loader::new(Arc::new(layered), entries);
    assert!(loader.load("disk.coff").is_ok());
    assert!(loader.load("mem.coff").is_ok());
    assert!(matches!(
        loader.load("../disk.coff"),
        Err(LoadError::NotFound(_))
    ));
}
