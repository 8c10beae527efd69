use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, info, warn};

use crate::cli::Args;
use crate::format::directory::{describe, read_directory, CERT_LEN};
use crate::format::ImageError;
use crate::layout::{plan_directory, DirectoryPlan};
use crate::profile::PartitionProfile;
use crate::writer::{assemble_image, write_image_atomic, PartitionSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub plan: DirectoryPlan,
    pub bytes: Vec<u8>,
}

impl BuiltImage {
    #[must_use]
    pub fn size_mib(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }
}

/// Builds the complete image in memory.
///
/// `file_sizes` follows the partition order of `profile`.
///
/// # Errors
/// Returns `ImageError` when the certificate has the wrong size, a partition
/// size is invalid, or a partition cannot be read back.
pub fn build_image<S: PartitionSource + ?Sized>(
    profile: PartitionProfile,
    file_sizes: &[u64],
    source: &mut S,
    certificate: &[u8],
) -> Result<BuiltImage, ImageError> {
    if certificate.len() != CERT_LEN {
        return Err(ImageError::InvalidCertificate {
            len: certificate.len(),
        });
    }
    let plan = plan_directory(profile, file_sizes)?;
    let bytes = assemble_image(profile, &plan, source, certificate)?;
    Ok(BuiltImage { plan, bytes })
}

/// Directory holding one `<name>.fw` file per partition.
#[derive(Debug, Clone)]
pub struct FirmwareDir {
    root: PathBuf,
}

impl FirmwareDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn part_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.fw"))
    }

    /// Stats every partition file of `profile`, in profile order.
    ///
    /// # Errors
    /// Returns `ImageError::MissingInputFile` for the first file that is absent.
    pub fn partition_sizes(&self, profile: PartitionProfile) -> Result<Vec<u64>, ImageError> {
        profile
            .partitions()
            .iter()
            .map(|spec| {
                let path = self.part_path(spec.name_str());
                fs::metadata(&path)
                    .map(|meta| meta.len())
                    .map_err(|source| ImageError::MissingInputFile { path, source })
            })
            .collect()
    }
}

impl PartitionSource for FirmwareDir {
    fn read_part(&mut self, name: &str, len: usize) -> Result<Vec<u8>, ImageError> {
        let path = self.part_path(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(source) => return Err(ImageError::MissingInputFile { path, source }),
        };
        let mut buf = Vec::with_capacity(len);
        if let Err(source) = file.take(len as u64).read_to_end(&mut buf) {
            return Err(ImageError::ReadFailed { path, source });
        }
        Ok(buf)
    }
}

/// # Errors
/// Returns `ImageError::MissingInputFile` when `path` cannot be read.
pub fn load_certificate(path: &Path) -> Result<Vec<u8>, ImageError> {
    fs::read(path).map_err(|source| ImageError::MissingInputFile {
        path: path.to_path_buf(),
        source,
    })
}

pub fn run(args: Args) -> anyhow::Result<()> {
    if let Some(image) = &args.list {
        return list_image(image);
    }

    let profile = args.profile();
    if args.append_cert && !profile.appends_certificate() {
        warn!("{profile} images never carry the certificate; ignoring --append-cert");
    }
    info!("packing {profile} image from {}", args.fw_dir.display());

    // Every input is validated before the output path is touched.
    let certificate = load_certificate(&args.cert)?;
    let mut parts = FirmwareDir::new(&args.fw_dir);
    let sizes = parts.partition_sizes(profile)?;
    let image = build_image(profile, &sizes, &mut parts, &certificate)?;

    for record in &image.plan.records {
        debug!("{}", describe(record, false));
    }
    debug!("offset counter ends at {:#x}", image.plan.end_offset);

    write_image_atomic(&args.output, &image.bytes)?;
    info!(
        "wrote {} ({:.2} MiB)",
        args.output.display(),
        image.size_mib()
    );
    Ok(())
}

fn list_image(path: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records = read_directory(&bytes)?;
    for record in &records {
        println!("{}", describe(record, true));
    }
    info!("{}: {} directory record(s)", path.display(), records.len());
    Ok(())
}
