use crate::format::directory::{reverse_field, DirectoryRecord, DEVICE_NAND, LEN_HEADER};
use crate::format::ImageError;
use crate::profile::{PartitionProfile, PartitionSpec};

/// Seed of the running `deviceOffset` counter, the same for every profile.
pub const OFFSET_BASE: u32 = 0x6000;
const RESOURCE_BASE_ADDR: u32 = 0x0800_0000;
const RESOURCE_CLASS: [&[u8; 4]; 4] = [b"disk", b"diag", b"fv00", b"osos"];

// (entryOffset, version)
const RSRC_ENTRY: (u32, u32) = (0x400, 0x0);
const DEFAULT_ENTRY: (u32, u32) = (0x0, 0x1e000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPlan {
    pub records: Vec<DirectoryRecord>,
    /// Final value of the offset counter.
    pub end_offset: u32,
}

/// Builds one directory record per partition of `profile`, in profile order.
///
/// `file_sizes[i]` is the on-disk size of the i-th partition file, sub-header
/// included.
///
/// # Errors
/// Returns `ImageError` when the size list does not match the profile, a file
/// is smaller than its sub-header, or an offset leaves the 32-bit range.
pub fn plan_directory(
    profile: PartitionProfile,
    file_sizes: &[u64],
) -> Result<DirectoryPlan, ImageError> {
    let partitions = profile.partitions();
    if file_sizes.len() != partitions.len() {
        return Err(ImageError::PartitionCountMismatch {
            expected: partitions.len(),
            actual: file_sizes.len(),
        });
    }

    let mut records = Vec::with_capacity(partitions.len());
    let end_offset = partitions
        .iter()
        .zip(file_sizes)
        .try_fold(OFFSET_BASE, |offset, (spec, &size)| {
            let record = build_record(spec, size, offset)?;
            records.push(record);
            next_offset(spec, record.len, offset)
        })?;

    Ok(DirectoryPlan {
        records,
        end_offset,
    })
}

fn build_record(spec: &PartitionSpec, file_size: u64, offset: u32) -> Result<DirectoryRecord, ImageError> {
    let len = payload_len(spec, file_size)?;
    let (entry_offset, version) = entry_pair(&spec.name);
    Ok(DirectoryRecord {
        device: reverse_field(DEVICE_NAND),
        name: reverse_field(spec.name),
        id: 0,
        device_offset: offset,
        len,
        addr: resource_addr(&spec.name),
        entry_offset,
        checksum: 0,
        version,
        load_addr: spec.load_addr,
    })
}

fn payload_len(spec: &PartitionSpec, file_size: u64) -> Result<u32, ImageError> {
    let len = file_size
        .checked_sub(u64::from(LEN_HEADER))
        .ok_or_else(|| ImageError::InvalidPartitionFile {
            name: spec.name_str().to_string(),
            size: file_size,
        })?;
    u32::try_from(len).map_err(|_| overflow(spec))
}

/// Payload + sub-header + trailing header-sized slot + one byte + padding.
fn next_offset(spec: &PartitionSpec, len: u32, offset: u32) -> Result<u32, ImageError> {
    offset
        .checked_add(len)
        .and_then(|v| v.checked_add(2 * LEN_HEADER + 1))
        .and_then(|v| v.checked_add(spec.padding))
        .ok_or_else(|| overflow(spec))
}

fn overflow(spec: &PartitionSpec) -> ImageError {
    ImageError::OffsetOverflow {
        name: spec.name_str().to_string(),
    }
}

fn resource_addr(name: &[u8; 4]) -> u32 {
    if RESOURCE_CLASS.contains(&name) {
        RESOURCE_BASE_ADDR
    } else {
        0
    }
}

fn entry_pair(name: &[u8; 4]) -> (u32, u32) {
    if name == b"rsrc" {
        RSRC_ENTRY
    } else {
        DEFAULT_ENTRY
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::plan_directory;
    use crate::format::directory::{reverse_field, LEN_HEADER};
    use crate::format::ImageError;
    use crate::profile::PartitionProfile;

    fn sizes_for(profile: PartitionProfile, payload: impl Fn(usize) -> u64) -> Vec<u64> {
        (0..profile.partitions().len())
            .map(|i| u64::from(LEN_HEADER) + payload(i))
            .collect()
    }

    #[test]
    fn places_first_partitions_from_payload_base() {
        let profile = PartitionProfile::default();
        let mut sizes = sizes_for(profile, |_| 0);
        sizes[0] = u64::from(LEN_HEADER) + 100;
        sizes[1] = u64::from(LEN_HEADER) + 200;

        let plan = plan_directory(profile, &sizes).expect("plan");
        assert_eq!(plan.records[0].len, 100);
        assert_eq!(plan.records[0].device_offset, 0x6000);
        assert_eq!(plan.records[1].len, 200);
        assert_eq!(
            plan.records[1].device_offset,
            0x6000 + 100 + 2 * LEN_HEADER + 1 + 0x1cc
        );
        assert_eq!(
            plan.records[2].device_offset,
            plan.records[1].device_offset + 200 + 2 * LEN_HEADER + 1 + 0xf9c
        );
    }

    #[test]
    fn offsets_accumulate_over_every_partition() {
        for profile in [PartitionProfile::default(), PartitionProfile::Gen6] {
            let sizes = sizes_for(profile, |i| 37 * i as u64 + 5);
            let plan = plan_directory(profile, &sizes).expect("plan");
            let specs = profile.partitions();

            assert_eq!(plan.records.len(), specs.len());
            assert_eq!(plan.records[0].device_offset, 0x6000);
            let mut expected = 0x6000;
            for (record, spec) in plan.records.iter().zip(specs) {
                assert_eq!(record.device_offset, expected);
                assert_eq!(record.partition_name(), spec.name);
                expected += record.len + 2 * LEN_HEADER + 1 + spec.padding;
            }
            assert_eq!(plan.end_offset, expected);
        }
    }

    #[test]
    fn gen6_counter_starts_at_fixed_base() {
        let plan = plan_directory(PartitionProfile::Gen6, &[u64::from(LEN_HEADER) + 1; 9])
            .expect("plan");
        assert_eq!(plan.records[0].device_offset, 0x6000);
        assert_eq!(
            plan.records[1].device_offset,
            0x6000 + 1 + 2 * LEN_HEADER + 1 + 0x7cc
        );
    }

    #[test]
    fn classifies_addresses_and_entry_pairs() {
        for profile in [PartitionProfile::default(), PartitionProfile::Gen6] {
            let plan = plan_directory(profile, &sizes_for(profile, |_| 16)).expect("plan");
            for record in &plan.records {
                let name = record.partition_name();
                let (entry, version) = if &name == b"rsrc" { (0x400, 0x0) } else { (0x0, 0x1e000) };
                assert_eq!((record.entry_offset, record.version), (entry, version));

                let addr = match &name {
                    b"disk" | b"diag" | b"fv00" | b"osos" => 0x0800_0000,
                    _ => 0,
                };
                assert_eq!(record.addr, addr, "{}", String::from_utf8_lossy(&name));
                assert_eq!(record.id, 0);
                assert_eq!(record.checksum, 0);
                assert_eq!(record.device, reverse_field(*b"NAND"));
            }
        }
    }

    #[test]
    fn copies_profile_load_addresses() {
        let profile = PartitionProfile::Gen6;
        let plan = plan_directory(profile, &sizes_for(profile, |_| 1)).expect("plan");
        for (record, spec) in plan.records.iter().zip(profile.partitions()) {
            assert_eq!(record.load_addr, spec.load_addr);
        }
        let plan = plan_directory(PartitionProfile::default(), &sizes_for(PartitionProfile::default(), |_| 1))
            .expect("plan");
        assert!(plan.records.iter().all(|r| r.load_addr == 0xffff_ffff));
    }

    #[test]
    fn rejects_file_smaller_than_sub_header() {
        let profile = PartitionProfile::default();
        let mut sizes = sizes_for(profile, |_| 0);
        sizes[3] = u64::from(LEN_HEADER) - 1;
        let err = plan_directory(profile, &sizes).expect_err("must fail");
        assert!(matches!(
            err,
            ImageError::InvalidPartitionFile { ref name, size } if name == "appl" && size == 0x7ff
        ));
    }

    #[test]
    fn rejects_size_list_of_wrong_length() {
        let err = plan_directory(PartitionProfile::Gen6, &[0x900; 3]).expect_err("must fail");
        assert!(matches!(
            err,
            ImageError::PartitionCountMismatch {
                expected: 9,
                actual: 3
            }
        ));
    }

    #[test]
    fn reports_offset_overflow() {
        let profile = PartitionProfile::default();
        let mut sizes = sizes_for(profile, |_| 0);
        sizes[1] = u64::from(u32::MAX);
        let err = plan_directory(profile, &sizes).expect_err("must fail");
        assert!(matches!(err, ImageError::OffsetOverflow { ref name } if name == "diag"));
    }
}
