use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::format::ImageError;

/// Size of the sub-header that prefixes every partition file.
pub const LEN_HEADER: u32 = 0x800;
pub const CERT_LEN: usize = 2048;
pub const DIRECTORY_OFFSET: usize = 0x5000;
pub const RECORD_SIZE: usize = core::mem::size_of::<DirectoryRecord>();
pub const SEPARATOR_LEN: usize = 40;
pub const SEPARATOR_BLOCK: [u8; SEPARATOR_LEN] = separator_block();
pub const DEVICE_NAND: [u8; 4] = *b"NAND";

const _: () = assert!(RECORD_SIZE == 40);

const fn separator_block() -> [u8; SEPARATOR_LEN] {
    let mut block = [0u8; SEPARATOR_LEN];
    let mut i = SEPARATOR_LEN - 4;
    while i < SEPARATOR_LEN {
        block[i] = 0xff;
        i += 1;
    }
    block
}

/// One table-of-contents entry as laid out in the image.
///
/// `device` and `name` hold their bytes reversed. The integer fields are
/// stored in host order, so the record is written with `as_bytes()` as is.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DirectoryRecord {
    pub device: [u8; 4],
    pub name: [u8; 4],
    pub id: u32,
    pub device_offset: u32,
    pub len: u32,
    pub addr: u32,
    pub entry_offset: u32,
    pub checksum: u32,
    pub version: u32,
    pub load_addr: u32,
}

impl DirectoryRecord {
    #[must_use]
    pub fn device_tag(&self) -> [u8; 4] {
        reverse_field(self.device)
    }

    #[must_use]
    pub fn partition_name(&self) -> [u8; 4] {
        reverse_field(self.name)
    }
}

/// Reverses the byte order of a fixed-width field. Applying it twice is a no-op.
#[must_use]
pub fn reverse_field<const N: usize>(mut field: [u8; N]) -> [u8; N] {
    field.reverse();
    field
}

/// Reads the directory table of an assembled image, stopping at the first
/// separator block.
///
/// # Errors
/// Returns `ImageError::TruncatedImage` when the image ends before a separator.
pub fn read_directory(image: &[u8]) -> Result<Vec<DirectoryRecord>, ImageError> {
    let truncated = || ImageError::TruncatedImage { len: image.len() };
    let mut records = Vec::new();
    let mut pos = DIRECTORY_OFFSET;
    loop {
        let chunk = image.get(pos..pos + RECORD_SIZE).ok_or_else(truncated)?;
        if chunk == SEPARATOR_BLOCK.as_slice() {
            return Ok(records);
        }
        let record = DirectoryRecord::read_from_bytes(chunk).map_err(|_| truncated())?;
        records.push(record);
        pos += RECORD_SIZE;
    }
}

#[must_use]
pub fn describe(record: &DirectoryRecord, extended: bool) -> String {
    let device = record.device_tag();
    let name = record.partition_name();
    let device = String::from_utf8_lossy(&device);
    let name = String::from_utf8_lossy(&name);
    if !extended {
        return format!(
            "dev: {device} type: {name} devOffset: {:X} len: {:X}",
            record.device_offset, record.len
        );
    }
    format!(
        "dev: {device} type: {name}\n\
         id: {:X}\n\
         devOffset: {:X}\n\
         len: {:X}\n\
         addr: {:X}\n\
         entryOffset: {:X}\n\
         checksum: {:X}\n\
         version: {:X}\n\
         loadAddr: {:X}\n",
        record.id,
        record.device_offset,
        record.len,
        record.addr,
        record.entry_offset,
        record.checksum,
        record.version,
        record.load_addr
    )
}
