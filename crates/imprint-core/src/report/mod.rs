//! Run reporting
//!
//! One set of results feeds two renderings: the JSON manifest
//! ([`RunReport`]) and the human-readable log ([`render_log`]). The log is
//! rendered from the built report, so both always agree.

pub mod format;
mod log;
mod manifest;

pub use format::{format_bytes, format_duration, format_duration_short, speed_mb_s};
pub use log::render_log;
pub use manifest::*;

use crate::analysis::StructuralAnalysis;
use crate::config::RunConfig;
use crate::copier::TransferResult;
use crate::disk::DiskMetadata;
use crate::environment::EnvironmentInfo;
use crate::journal::{RunIdentity, RunJournal};
use crate::tree::TreeSummary;

/// Everything a report is built from
#[derive(Clone, Copy)]
pub struct ReportInputs<'a> {
    /// Run configuration
    pub config: &'a RunConfig,
    /// Run identity
    pub identity: &'a RunIdentity,
    /// Copy outcome; `None` when no copy was attempted
    pub transfer: Option<&'a TransferResult>,
    /// Structural analysis outcome
    pub analysis: &'a StructuralAnalysis,
    /// Source disk properties
    pub disk: &'a DiskMetadata,
    /// Operation journal
    pub journal: &'a RunJournal,
    /// Host description
    pub environment: &'a EnvironmentInfo,
    /// Parsed tree listing summary
    pub tree: Option<&'a TreeSummary>,
    /// Size of the image file on disk, if it exists
    pub image_size: Option<u64>,
}
