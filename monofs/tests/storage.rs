//! End-to-end behavior through the storage façade: path resolution,
//! the operation set, and the laws a volume must keep.

mod common;

use common::MemDisk;
use monofs::{Error, FileKind, Path, Storage};
use monofs::{BLOCK_SIZE, NDIRECT, ROOT_INODE};

const FILE_MODE: u32 = FileKind::Regular as u32 | 0o644;
const DIR_MODE: u32 = FileKind::Directory as u32 | 0o755;

#[test]
fn create_write_stat_list() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/a.txt", FILE_MODE).unwrap();
    assert_eq!(storage.write("/a.txt", b"hello", 0).unwrap(), 5);

    let st = storage.stat("/a.txt").unwrap();
    assert_eq!(st.size, 5);
    assert_eq!(st.links, 1);
    assert_eq!(st.blocks, 1);
    assert!(FileKind::of_mode(st.mode).contains(FileKind::Regular));
    assert_eq!(storage.list("/").unwrap(), ["a.txt"]);
}

#[test]
fn write_read_roundtrip_across_blocks() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/big", FILE_MODE).unwrap();

    let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(storage.write("/big", &data, 0).unwrap(), 5000);
    assert_eq!(storage.stat("/big").unwrap().blocks, 2);

    let mut back = vec![0u8; 5000];
    assert_eq!(storage.read("/big", &mut back, 0).unwrap(), 5000);
    assert_eq!(back, data);

    // reads past the end are empty, not errors
    assert_eq!(storage.read("/big", &mut back, 5000).unwrap(), 0);
}

#[test]
fn write_beyond_end_zero_fills_the_gap() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/sparse", FILE_MODE).unwrap();

    assert_eq!(storage.write("/sparse", b"tail", 5000).unwrap(), 4);
    assert_eq!(storage.stat("/sparse").unwrap().size, 5004);

    let mut back = vec![0xFFu8; 5004];
    assert_eq!(storage.read("/sparse", &mut back, 0).unwrap(), 5004);
    assert!(back[..5000].iter().all(|&b| b == 0));
    assert_eq!(&back[5000..], b"tail");
}

#[test]
fn unaligned_overwrite_inside_a_file() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/f", FILE_MODE).unwrap();
    storage.write("/f", &[b'x'; 2 * BLOCK_SIZE], 0).unwrap();

    let patch = b"patched-across-the-boundary";
    let offset = BLOCK_SIZE - 10;
    assert_eq!(storage.write("/f", patch, offset).unwrap(), patch.len());
    // overwrites inside the file do not move its end
    assert_eq!(storage.stat("/f").unwrap().size as usize, 2 * BLOCK_SIZE);

    let mut back = vec![0u8; patch.len()];
    storage.read("/f", &mut back, offset).unwrap();
    assert_eq!(&back, patch);
}

#[test]
fn indirect_boundary_write_and_truncate() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/huge", FILE_MODE).unwrap();

    let data = vec![0xABu8; (NDIRECT + 1) * BLOCK_SIZE];
    assert_eq!(storage.write("/huge", &data, 0).unwrap(), data.len());

    // 13 data blocks plus the indirect block itself
    let node = storage.resolve("/huge").unwrap();
    assert_eq!(node.owned_blocks().len(), NDIRECT + 2);

    storage.truncate("/huge", BLOCK_SIZE).unwrap();
    let node = storage.resolve("/huge").unwrap();
    assert_eq!(node.owned_blocks().len(), 1);

    let mut back = vec![0u8; BLOCK_SIZE];
    assert_eq!(storage.read("/huge", &mut back, 0).unwrap(), BLOCK_SIZE);
    assert!(back.iter().all(|&b| b == 0xAB));
}

#[test]
fn rename_out_of_a_subdirectory() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/d", DIR_MODE).unwrap();
    storage.mknod("/d/x", FILE_MODE).unwrap();
    storage.write("/d/x", b"payload", 0).unwrap();

    storage.rename("/d/x", "/y").unwrap();

    assert_eq!(storage.list("/d").unwrap(), Vec::<String>::new());
    let root = storage.list("/").unwrap();
    assert!(root.contains(&"d".to_owned()) && root.contains(&"y".to_owned()));
    assert!(!storage.access("/d/x"));

    let mut back = [0u8; 7];
    assert_eq!(storage.read("/y", &mut back, 0).unwrap(), 7);
    assert_eq!(&back, b"payload");
}

#[test]
fn rename_into_an_existing_directory_keeps_the_leaf_name() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/dir", DIR_MODE).unwrap();
    storage.mknod("/file", FILE_MODE).unwrap();

    storage.rename("/file", "/dir").unwrap();

    assert!(!storage.access("/file"));
    assert!(storage.access("/dir/file"));
    assert_eq!(storage.list("/dir").unwrap(), ["file"]);
    assert_eq!(storage.stat("/dir/file").unwrap().links, 1);
}

#[test]
fn rename_within_a_directory() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/old", FILE_MODE).unwrap();
    storage.write("/old", b"content", 0).unwrap();

    storage.rename("/old", "/new").unwrap();

    assert!(!storage.access("/old"));
    let mut back = [0u8; 7];
    assert_eq!(storage.read("/new", &mut back, 0).unwrap(), 7);
    assert_eq!(&back, b"content");
    assert_eq!(storage.stat("/new").unwrap().links, 1);
}

#[test]
fn recreate_after_unlink_lists_one_entry() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/f", FILE_MODE).unwrap();
    storage.unlink("/f").unwrap();
    storage.mknod("/f", FILE_MODE).unwrap();

    assert_eq!(storage.list("/").unwrap(), ["f"]);
}

#[test]
fn tombstone_slots_are_reused_in_place() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/a", FILE_MODE).unwrap();
    storage.mknod("/b", FILE_MODE).unwrap();
    storage.mknod("/c", FILE_MODE).unwrap();
    storage.unlink("/b").unwrap();

    storage.mknod("/d", FILE_MODE).unwrap();
    // /d landed in /b's vacated slot
    assert_eq!(storage.list("/").unwrap(), ["a", "d", "c"]);
}

#[test]
fn rmdir_requires_an_empty_directory() {
    let storage = Storage::open(MemDisk::open());

    storage.mknod("/d", DIR_MODE).unwrap();
    storage.mknod("/d/z", FILE_MODE).unwrap();

    assert_eq!(storage.rmdir("/d"), Err(Error::DirectoryNotEmpty));

    storage.unlink("/d/z").unwrap();
    // only tombstones remain, which counts as empty
    storage.rmdir("/d").unwrap();
    assert!(!storage.access("/d"));
}

#[test]
fn root_identity_holds() {
    let storage = Storage::open(MemDisk::open());

    assert_eq!(storage.root().inum(), ROOT_INODE);
    assert_eq!(storage.resolve("/").unwrap().inum(), ROOT_INODE);

    let st = storage.stat("/").unwrap();
    assert_eq!(st.ino, ROOT_INODE);
    assert!(FileKind::of_mode(st.mode).contains(FileKind::Directory));
    // nothing links to the root
    assert_eq!(st.links, 0);
}

#[test]
fn resolution_rejects_bad_paths() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/plain", FILE_MODE).unwrap();

    assert!(matches!(storage.stat("/missing"), Err(Error::NotFound)));
    assert_eq!(
        storage.write("relative", b"x", 0),
        Err(Error::InvalidArgument)
    );
    assert!(!storage.access("relative"));
    // a file cannot sit mid-path
    assert!(matches!(storage.stat("/plain/below"), Err(Error::NotFound)));
    // nor act as a parent
    assert_eq!(storage.mknod("/plain/child", FILE_MODE), Err(Error::NotADirectory));
    assert_eq!(storage.list("/plain"), Err(Error::NotADirectory));
}

#[test]
fn root_cannot_be_unlinked() {
    let storage = Storage::open(MemDisk::open());
    assert_eq!(storage.unlink("/"), Err(Error::InvalidArgument));
    assert_eq!(storage.rename("/", "/elsewhere"), Err(Error::InvalidArgument));
}

#[test]
fn empty_writes_are_rejected() {
    let storage = Storage::open(MemDisk::open());
    storage.mknod("/f", FILE_MODE).unwrap();
    assert_eq!(storage.write("/f", &[], 0), Err(Error::InvalidArgument));
}

#[test]
fn path_splitting() {
    assert_eq!("/a/b/c.txt".parent_file(), Some(("/a/b", "c.txt")));
    assert_eq!("/x".parent_file(), Some(("/", "x")));
    assert_eq!("/".parent_file(), None);

    assert_eq!("/a/b".root_relative(), Some("a/b"));
    assert_eq!("/".root_relative(), None);

    assert!("/a".is_absolute());
    assert!("a/b".is_relative());
    assert_eq!("/a/b".file_name(), Some("b"));
}
