//! # Imprint Core
//!
//! Archival imaging of optical media: a single-pass block copy with
//! inline dual MD5 digests, structural analysis of the finished image, and
//! a human log plus JSON manifest describing the run.
//!
//! ## Modules
//!
//! - `copier`: block copy engine with digests, progress and cancellation
//! - `progress`: progress snapshot math and display lines
//! - `analysis`: structural validator seam and report parsing
//! - `report`: manifest and human log rendering
//! - `session`: one run from overwrite check to published report
//! - `disk`, `environment`, `tree`: inputs to the report
//! - `config`, `settings`: runtime and persistent configuration
//! - `error`: error types, result alias and exit codes
//!
//! ## Example
//!
//! ```ignore
//! use imprint_core::{CancelToken, DiskMetadata, EnvironmentInfo, ImagingSession, IsolyzerValidator, RunConfig};
//! use std::fs::File;
//!
//! let config = RunConfig::new("disk4", "FamilyPhotos2004", "JD", "/Backups");
//! let mut session = ImagingSession::new(config)?;
//! session.prepare(|_| true)?;
//!
//! let source = File::open("/dev/rdisk4")?;
//! session.copy(source, 734_003_200, |p| println!("{}", p.bytes_done), CancelToken::new())?;
//! session.analyze(IsolyzerValidator::default(), 734_003_200);
//!
//! let outcome = session.publish(&DiskMetadata::default(), &EnvironmentInfo::detect())?;
//! std::process::exit(outcome.exit_code);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod copier;
pub mod disk;
pub mod environment;
pub mod error;
pub mod journal;
pub mod progress;
pub mod report;
pub mod session;
pub mod settings;
pub mod tree;

pub use analysis::{
    AnalysisErrorKind, IsolyzerValidator, StructuralAnalysis, StructuralAnalysisAdapter,
    StructuralValidator, parse_report,
};
pub use config::{BLOCK_SIZE, RunConfig, TransferSpec, UNKNOWN};
pub use copier::{CancelToken, CopyProgress, Digest, StreamCopier, TransferResult};
pub use disk::DiskMetadata;
pub use environment::{EnvironmentInfo, TOOL_NAME, TOOL_VERSION};
pub use error::{Error, Result, exit_code};
pub use journal::{Operation, OperationStatus, RunIdentity, RunJournal};
pub use progress::ProgressSnapshot;
pub use report::{ReportBuilder, ReportInputs, RunReport, render_log};
pub use session::{ImagingSession, RunOutcome};
pub use settings::{AnalysisSettings, BehaviorSettings, OutputSettings, Settings, SettingsError};
pub use tree::TreeSummary;
