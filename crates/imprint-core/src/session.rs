//! One imaging run from overwrite check to published report
//!
//! The session owns the run configuration, identity and journal. Device
//! handling (unmount, tree listing, eject) stays with the caller, which
//! journals those steps through [`ImagingSession::record`]; the session
//! performs the copy, the structural analysis and the publishing of the
//! log and manifest.

use crate::analysis::{StructuralAnalysis, StructuralAnalysisAdapter, StructuralValidator};
use crate::config::{RunConfig, TransferSpec};
use crate::copier::{CancelToken, CopyProgress, StreamCopier, TransferResult};
use crate::disk::DiskMetadata;
use crate::environment::EnvironmentInfo;
use crate::error::{Error, Result, exit_code};
use crate::journal::{Operation, OperationStatus, RunIdentity, RunJournal};
use crate::report::{ReportBuilder, ReportInputs, RunReport, render_log};
use crate::tree::TreeSummary;
use chrono::Local;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of publishing a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Process exit status for this run
    pub exit_code: i32,
    /// Written human log
    pub log_path: PathBuf,
    /// Written manifest
    pub manifest_path: PathBuf,
    /// The published report
    pub report: RunReport,
}

impl RunOutcome {
    /// Whether both digests were produced and agree
    pub fn digests_match(&self) -> Option<bool> {
        self.report.integrity_verification.hashes_match
    }
}

/// State of one imaging run
pub struct ImagingSession {
    config: RunConfig,
    identity: RunIdentity,
    journal: RunJournal,
    transfer: Option<TransferResult>,
    analysis: StructuralAnalysis,
}

impl ImagingSession {
    /// Start a run; the configuration is validated first
    pub fn new(config: RunConfig) -> Result<Self> {
        let identity = RunIdentity::new(&config.operator, &config.disk_id);
        Self::with_identity(config, identity)
    }

    /// Start a run with an explicit identity
    pub fn with_identity(config: RunConfig, identity: RunIdentity) -> Result<Self> {
        config.validate()?;
        tracing::info!("Run {} started", identity.run_id);
        Ok(Self {
            config,
            identity,
            journal: RunJournal::new(),
            transfer: None,
            analysis: StructuralAnalysis::skipped("not run"),
        })
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run identity
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Operation journal
    pub fn journal(&self) -> &RunJournal {
        &self.journal
    }

    /// Copy outcome, once the copy has been attempted
    pub fn transfer(&self) -> Option<&TransferResult> {
        self.transfer.as_ref()
    }

    /// Structural analysis outcome
    pub fn analysis(&self) -> &StructuralAnalysis {
        &self.analysis
    }

    /// Journal a step performed by the caller
    pub fn record(
        &mut self,
        operation: Operation,
        commands: Vec<String>,
        status: OperationStatus,
        detail: Option<String>,
    ) {
        self.journal.record(operation, commands, status, detail);
    }

    /// Check for an existing image and create the output directory
    ///
    /// `confirm` is asked only when the image already exists; declining
    /// leaves the filesystem untouched.
    pub fn prepare<F>(&self, confirm: F) -> Result<()>
    where
        F: FnOnce(&Path) -> bool,
    {
        let image = self.config.image_path();
        if image.exists() && !confirm(&image) {
            tracing::info!("Overwrite of {} declined", image.display());
            return Err(Error::OverwriteDeclined(image));
        }

        let dir = self.config.output_dir();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Output directory ready: {}", dir.display());
        Ok(())
    }

    /// Copy `source` into the image file
    ///
    /// A dry run journals the copy as skipped and creates no file. On
    /// failure the failed transfer is kept for the report and the error
    /// is returned; the partial image is left in place.
    pub fn copy<R, F>(
        &mut self,
        source: R,
        total_size: u64,
        progress: F,
        cancel: CancelToken,
    ) -> Result<()>
    where
        R: Read,
        F: Fn(&CopyProgress) + Send + Sync + 'static,
    {
        let spec = TransferSpec::from_config(&self.config, total_size);
        let command = spec.dd_command();

        if !self.config.performs_copy() {
            self.journal.record(
                Operation::ImageCreation,
                vec![command],
                OperationStatus::Skipped,
                Some("dry run".to_string()),
            );
            return Ok(());
        }

        let start = Instant::now();
        let copier = StreamCopier::new()
            .with_cancel_token(cancel)
            .on_progress(progress);

        let result = File::create(&spec.destination)
            .map_err(|e| Error::WriteFailure {
                bytes_written: 0,
                source: e,
            })
            .and_then(|destination| copier.copy(source, destination, spec.total_size));

        match result {
            Ok(transfer) => {
                self.journal.record(
                    Operation::ImageCreation,
                    vec![command],
                    OperationStatus::Success,
                    None,
                );
                self.transfer = Some(transfer);
                Ok(())
            }
            Err(e) => {
                self.journal.record(
                    Operation::ImageCreation,
                    vec![command],
                    OperationStatus::Failed,
                    Some(e.to_string()),
                );
                self.transfer = Some(TransferResult::failed(&e, start.elapsed().as_secs_f64()));
                Err(e)
            }
        }
    }

    /// Run structural analysis on the finished image
    ///
    /// Skipped for dry runs, when disabled, and when no image was
    /// produced. Never fails the run.
    pub fn analyze<V>(&mut self, validator: V, declared_size: u64) -> &StructuralAnalysis
    where
        V: StructuralValidator,
    {
        let image = self.config.image_path();
        let command = format!("{} {}", validator.name(), image.display());

        let skip_reason = if self.config.dry_run {
            Some("dry run")
        } else if !self.config.analysis_enabled {
            Some("disabled")
        } else if !self.transfer.as_ref().is_some_and(|t| t.success) {
            Some("image not created")
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            self.journal.record(
                Operation::StructuralAnalysis,
                vec![command],
                OperationStatus::Skipped,
                Some(reason.to_string()),
            );
            self.analysis = StructuralAnalysis::skipped(reason);
            return &self.analysis;
        }

        let analysis = StructuralAnalysisAdapter::new(validator).analyze(
            &image,
            &self.config.analysis_path(),
            declared_size,
        );
        let (status, detail) = match &analysis.failure {
            Some(failure) => (
                OperationStatus::Failed,
                Some(format!("{}: {}", failure.kind.as_str(), failure.message)),
            ),
            None => (OperationStatus::Success, None),
        };
        self.journal
            .record(Operation::StructuralAnalysis, vec![command], status, detail);
        self.analysis = analysis;
        &self.analysis
    }

    /// Build the report and write the human log and the manifest
    pub fn publish(&self, disk: &DiskMetadata, environment: &EnvironmentInfo) -> Result<RunOutcome> {
        let image_size = if self.config.performs_copy() {
            std::fs::metadata(self.config.image_path()).ok().map(|m| m.len())
        } else {
            None
        };
        let tree = match self.journal.status_of(Operation::TreeListing) {
            Some(OperationStatus::Success) => TreeSummary::from_file(&self.config.tree_path()),
            _ => None,
        };

        let now = Local::now();
        let report = ReportBuilder::new(ReportInputs {
            config: &self.config,
            identity: &self.identity,
            transfer: self.transfer.as_ref(),
            analysis: &self.analysis,
            disk,
            journal: &self.journal,
            environment,
            tree: tree.as_ref(),
            image_size,
        })
        .build_at(now);

        let log_path = self.config.log_path();
        std::fs::write(&log_path, render_log(&report, &self.journal, disk, now))?;
        tracing::info!("Log saved to {}", log_path.display());

        let manifest_path = self.config.manifest_path();
        report.write_to(&manifest_path)?;

        Ok(RunOutcome {
            exit_code: transfer_exit_code(self.transfer.as_ref()),
            log_path,
            manifest_path,
            report,
        })
    }
}

/// Exit status implied by the copy: failed copies beat disagreeing digests
fn transfer_exit_code(transfer: Option<&TransferResult>) -> i32 {
    match transfer {
        Some(transfer) if !transfer.success => exit_code::FAILURE,
        Some(transfer) if transfer.digests_match() == Some(false) => exit_code::INTEGRITY_MISMATCH,
        _ => exit_code::SUCCESS,
    }
}
