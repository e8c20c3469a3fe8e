pub mod content;
pub mod directory;
pub mod fs;
pub mod inode_table;
pub mod types;
pub mod util;

pub const MYFS_MAGIC: [u8; 4] = *b"MYFS";
pub const CURRENT_VERSION: u32 = 1;
pub const NAME_MAX: usize = 27;

// Fixed on-disk record sizes; each record is zero-padded up to its size.
pub const SUPERBLOCK_SIZE: u64 = 64;
pub const INODE_RECORD_SIZE: u64 = 16;
pub const DIR_HEADER_SIZE: u64 = 8;
pub const DIR_ENTRY_SIZE: u64 = 64;
