//! CLI command implementations.

pub mod calibrate;
pub mod decode;
pub mod search;
pub mod survey;

use std::path::Path;

use anyhow::{Context, Result};
use vgr_core::TruthFile;

fn load_truth(path: &Path) -> Result<TruthFile> {
    TruthFile::load(path).with_context(|| format!("Failed to load truth file {}", path.display()))
}
