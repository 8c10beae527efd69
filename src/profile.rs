use std::fmt;

const LOAD_ADDR_UNSET: u32 = 0xffff_ffff;

/// Bytes written after a partition's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailer {
    /// Header-sized certificate slot (the certificate, or zeros when it is not
    /// appended), one zero byte, then `padding` zero bytes.
    ZeroPad,
    /// A literal zero run followed by a literal `0xFF` run.
    Fill { zeros: u32, ones: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub name: [u8; 4],
    pub padding: u32,
    pub load_addr: u32,
    pub trailer: Trailer,
}

impl PartitionSpec {
    #[must_use]
    pub fn name_str(&self) -> &str {
        std::str::from_utf8(&self.name).unwrap_or("????")
    }
}

/// Region between the separator zeros and the first payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFiller {
    pub tag: &'static [u8],
    /// Absolute offset where the `0xFF` run begins.
    pub ones_from: usize,
    /// Absolute offset where the filler ends.
    pub end: usize,
}

const fn gen7(name: &[u8; 4], padding: u32) -> PartitionSpec {
    PartitionSpec {
        name: *name,
        padding,
        load_addr: LOAD_ADDR_UNSET,
        trailer: Trailer::ZeroPad,
    }
}

const fn gen6(name: &[u8; 4], padding: u32, load_addr: u32, zeros: u32, ones: u32) -> PartitionSpec {
    PartitionSpec {
        name: *name,
        padding,
        load_addr,
        trailer: Trailer::Fill { zeros, ones },
    }
}

const GEN7_PARTITIONS: [PartitionSpec; 11] = [
    gen7(b"disk", 0x1cc),
    gen7(b"diag", 0xf9c),
    gen7(b"fv00", 0x89c),
    gen7(b"appl", 0xcec),
    gen7(b"lbat", 0xc5c),
    gen7(b"bdsw", 0x5c),
    gen7(b"bdhw", 0xc5c),
    gen7(b"chrg", 0xc5c),
    gen7(b"gpfw", 0x63c),
    gen7(b"rsrc", 0xf9c),
    gen7(b"osos", 0xa3c),
];

const GEN6_PARTITIONS: [PartitionSpec; 9] = [
    gen6(b"disk", 0x7cc, 0x0800_0000, 0x801, 0x7cc),
    gen6(b"diag", 0xf9c, 0x0800_0000, 0x801, 0xf9c),
    gen6(b"appl", 0xcec, 0x0900_0000, 0x801, 0xcec),
    gen6(b"lbat", 0xc5c, 0x0940_0000, 0x801, 0xc5c),
    gen6(b"bdsw", 0x5c, 0x0940_0000, 0x801, 0x5c),
    gen6(b"bdhw", 0xc5c, 0x0940_0000, 0x801, 0xc5c),
    gen6(b"chrg", 0xc5c, 0x0940_0000, 0x801, 0xc5c),
    gen6(b"rsrc", 0xb9b, LOAD_ADDR_UNSET, 0x1000, 0x39c),
    gen6(b"osos", 0xa3c, 0x0800_0000, 0x801, 0xa3c),
];

const GEN6_FILLER: HeaderFiller = HeaderFiller {
    tag: b"NAND",
    ones_from: 0x6800,
    end: 0x7000,
};

/// Device target of the image. Selected once, before any record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionProfile {
    /// Profile A.
    Gen7 { append_certificate: bool },
    /// Profile B.
    Gen6,
}

impl Default for PartitionProfile {
    fn default() -> Self {
        Self::Gen7 {
            append_certificate: false,
        }
    }
}

impl PartitionProfile {
    #[must_use]
    pub fn partitions(self) -> &'static [PartitionSpec] {
        match self {
            Self::Gen7 { .. } => &GEN7_PARTITIONS,
            Self::Gen6 => &GEN6_PARTITIONS,
        }
    }

    #[must_use]
    pub fn separator_count(self) -> usize {
        match self {
            Self::Gen7 { .. } => 5,
            Self::Gen6 => 7,
        }
    }

    /// Absolute offset where payload writing begins. Gen6 directory offsets
    /// still count from `layout::OFFSET_BASE`.
    #[must_use]
    pub fn payload_base(self) -> u32 {
        match self {
            Self::Gen7 { .. } => 0x6000,
            Self::Gen6 => 0x7000,
        }
    }

    #[must_use]
    pub fn header_filler(self) -> Option<HeaderFiller> {
        match self {
            Self::Gen7 { .. } => None,
            Self::Gen6 => Some(GEN6_FILLER),
        }
    }

    #[must_use]
    pub fn appends_certificate(self) -> bool {
        matches!(
            self,
            Self::Gen7 {
                append_certificate: true
            }
        )
    }
}

impl fmt::Display for PartitionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gen7 { .. } => f.write_str("7G"),
            Self::Gen6 => f.write_str("6G"),
        }
    }
}
