pub mod cli;
pub mod format;
pub mod layout;
pub mod packer;
pub mod profile;
pub mod writer;

pub use packer::{build_image, run};
