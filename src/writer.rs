use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use zerocopy::IntoBytes;

use crate::format::directory::{CERT_LEN, DIRECTORY_OFFSET, LEN_HEADER, SEPARATOR_BLOCK};
use crate::format::ImageError;
use crate::layout::{DirectoryPlan, OFFSET_BASE};
use crate::profile::{PartitionProfile, PartitionSpec, Trailer};

pub const IMAGE_HEADER_LEN: usize = 268;
pub const IMAGE_HEADER: [u8; IMAGE_HEADER_LEN] = build_header();

const HEADER_BANNER: &[u8] = b"{{~~  /-----\\   {{~~ /       \\  {{~~|         | {{~~| S T O P | {{~~|         | {{~~ \\       /  {{~~  \\-----/   ";
const HEADER_COPYRIGHT: &[u8] = b"Copyright(C) 2001 Apple Computer, Inc.";
const HEADER_RULE_END: usize = 255;
const HEADER_TRAILER: [u8; 12] = [
    0x5d, 0x69, 0x68, 0x5b, 0x00, 0x40, 0x00, 0x00, 0x0c, 0x01, 0x03, 0x00,
];
const POST_SEPARATOR_ZEROS: usize = 0xd80;

const fn build_header() -> [u8; IMAGE_HEADER_LEN] {
    let mut out = [b'-'; IMAGE_HEADER_LEN];
    let mut i = 0;
    while i < HEADER_BANNER.len() {
        out[i] = HEADER_BANNER[i];
        i += 1;
    }
    let mut j = 0;
    while j < HEADER_COPYRIGHT.len() {
        out[i + j] = HEADER_COPYRIGHT[j];
        j += 1;
    }
    out[HEADER_RULE_END] = 0;
    let mut k = 0;
    while k < HEADER_TRAILER.len() {
        out[HEADER_RULE_END + 1 + k] = HEADER_TRAILER[k];
        k += 1;
    }
    out
}

/// Supplies the raw bytes of each partition file.
pub trait PartitionSource {
    /// Returns the first `len` bytes (sub-header and payload) of partition `name`.
    ///
    /// # Errors
    /// Returns `ImageError` when the partition cannot be opened or read.
    fn read_part(&mut self, name: &str, len: usize) -> Result<Vec<u8>, ImageError>;
}

impl<F> PartitionSource for F
where
    F: FnMut(&str, usize) -> Result<Vec<u8>, ImageError>,
{
    fn read_part(&mut self, name: &str, len: usize) -> Result<Vec<u8>, ImageError> {
        self(name, len)
    }
}

/// Lays out header, directory table, separators, filler and payload blocks.
///
/// # Errors
/// Returns `ImageError` when a part cannot be read, yields the wrong number of
/// bytes, or the write cursor misses a fixed boundary.
pub fn assemble_image<S: PartitionSource + ?Sized>(
    profile: PartitionProfile,
    plan: &DirectoryPlan,
    source: &mut S,
    certificate: &[u8],
) -> Result<Vec<u8>, ImageError> {
    let partitions = profile.partitions();
    if plan.records.len() != partitions.len() {
        return Err(ImageError::PartitionCountMismatch {
            expected: partitions.len(),
            actual: plan.records.len(),
        });
    }

    let payload_base = profile.payload_base() as usize;
    let end = plan.end_offset as usize + payload_base - OFFSET_BASE as usize;
    let mut out = Vec::with_capacity(end);
    out.extend_from_slice(&IMAGE_HEADER);
    pad_to(&mut out, DIRECTORY_OFFSET, 0)?;
    for record in &plan.records {
        out.extend_from_slice(record.as_bytes());
    }
    for _ in 0..profile.separator_count() {
        out.extend_from_slice(&SEPARATOR_BLOCK);
    }
    out.resize(out.len() + POST_SEPARATOR_ZEROS, 0);
    if let Some(filler) = profile.header_filler() {
        out.extend_from_slice(filler.tag);
        pad_to(&mut out, filler.ones_from, 0)?;
        pad_to(&mut out, filler.end, 0xff)?;
    }
    expect_cursor(&out, payload_base)?;

    for (spec, record) in partitions.iter().zip(&plan.records) {
        let len = record.len as usize + LEN_HEADER as usize;
        let part = source.read_part(spec.name_str(), len)?;
        if part.len() != len {
            return Err(ImageError::PayloadSizeMismatch {
                name: spec.name_str().to_string(),
                expected: len,
                actual: part.len(),
            });
        }
        out.extend_from_slice(&part);
        write_trailer(&mut out, profile, spec, certificate);
    }
    expect_cursor(&out, end)?;
    Ok(out)
}

fn write_trailer(
    out: &mut Vec<u8>,
    profile: PartitionProfile,
    spec: &PartitionSpec,
    certificate: &[u8],
) {
    match spec.trailer {
        Trailer::ZeroPad => {
            if profile.appends_certificate() {
                out.extend_from_slice(certificate);
            } else {
                out.resize(out.len() + CERT_LEN, 0);
            }
            out.push(0);
            out.resize(out.len() + spec.padding as usize, 0);
        }
        Trailer::Fill { zeros, ones } => {
            out.resize(out.len() + zeros as usize, 0);
            out.resize(out.len() + ones as usize, 0xff);
        }
    }
}

fn pad_to(out: &mut Vec<u8>, target: usize, fill: u8) -> Result<(), ImageError> {
    if out.len() > target {
        return Err(ImageError::LayoutMisaligned {
            expected: target,
            actual: out.len(),
        });
    }
    out.resize(target, fill);
    Ok(())
}

fn expect_cursor(out: &[u8], expected: usize) -> Result<(), ImageError> {
    if out.len() == expected {
        Ok(())
    } else {
        Err(ImageError::LayoutMisaligned {
            expected,
            actual: out.len(),
        })
    }
}

/// Writes `bytes` to a temporary file next to `output_path`, then renames it
/// into place, so the target is either the complete image or untouched.
///
/// # Errors
/// Returns an error when the temporary file cannot be created, written, or
/// renamed.
pub fn write_image_atomic(output_path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    tmp.persist(output_path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(())
}
