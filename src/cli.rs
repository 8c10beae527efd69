use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::profile::PartitionProfile;

#[derive(Debug, Parser)]
#[command(name = "msepack", version, about = "Packs firmware parts into a Firmware.MSE image")]
pub struct Args {
    /// Build for the 6G partition profile instead of 7G.
    #[arg(long = "6g")]
    pub gen6: bool,

    /// Append the certificate after each 7G payload.
    #[arg(long = "append-cert")]
    pub append_cert: bool,

    #[arg(long = "fw-dir", value_name = "DIR", default_value = "fw")]
    pub fw_dir: PathBuf,

    #[arg(long = "cert", value_name = "FILE", default_value = "verif")]
    pub cert: PathBuf,

    #[arg(short = 'o', long = "output", default_value = "Firmware.MSE")]
    pub output: PathBuf,

    /// Print the directory table of an existing image and exit.
    #[arg(short = 'l', long = "list", value_name = "IMAGE")]
    pub list: Option<PathBuf>,

    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    #[arg(long = "quiet", short = 'q')]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn profile(&self) -> PartitionProfile {
        if self.gen6 {
            PartitionProfile::Gen6
        } else {
            PartitionProfile::Gen7 {
                append_certificate: self.append_cert,
            }
        }
    }

    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
