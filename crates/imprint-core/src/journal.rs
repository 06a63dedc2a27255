//! Run identity and the per-run operation journal
//!
//! The journal is owned by the run and passed to whoever needs it. Each
//! record is also emitted as a tracing event, so console output and the
//! persisted report come from the same values.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one run, fixed when the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    /// `YYYYmmddTHHMMSS_<operator>_<disk>`
    pub run_id: String,

    /// Random unique identifier
    pub uuid: Uuid,

    /// Start time of the run
    pub started: DateTime<Local>,
}

impl RunIdentity {
    /// New identity starting now
    pub fn new(operator: &str, disk_id: &str) -> Self {
        Self::at(operator, disk_id, Local::now(), Uuid::new_v4())
    }

    /// Identity with an explicit start time and UUID
    pub fn at(operator: &str, disk_id: &str, started: DateTime<Local>, uuid: Uuid) -> Self {
        Self {
            run_id: format!("{}_{}_{}", started.format("%Y%m%dT%H%M%S"), operator, disk_id),
            uuid,
            started,
        }
    }
}

/// Steps of an imaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Directory tree listing of the mounted volume
    TreeListing,
    /// Unmounting the disk before the copy
    DiskUnmount,
    /// Copying the raw device into the image
    ImageCreation,
    /// Running the structural validator
    StructuralAnalysis,
    /// Remounting and ejecting the disk
    Finalization,
}

impl Operation {
    /// Title used in the human log
    pub fn title(&self) -> &'static str {
        match self {
            Operation::TreeListing => "Tree Listing Generation",
            Operation::DiskUnmount => "Disk Unmount",
            Operation::ImageCreation => "Image Creation & Verification",
            Operation::StructuralAnalysis => "Image Structure Analysis",
            Operation::Finalization => "Finalization",
        }
    }
}

/// Outcome of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Completed normally
    Success,
    /// Attempted and failed
    Failed,
    /// Not attempted
    Skipped,
}

impl OperationStatus {
    /// Manifest spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
            OperationStatus::Skipped => "skipped",
        }
    }
}

/// One journal entry
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    /// Which step
    pub operation: Operation,
    /// Command line that was (or would have been) run
    pub commands: Vec<String>,
    /// When the step finished
    pub time: DateTime<Local>,
    /// Outcome
    pub status: OperationStatus,
    /// Free-form detail (error text, skip reason)
    pub detail: Option<String>,
}

/// Append-only list of operation records for one run
#[derive(Debug, Clone, Default)]
pub struct RunJournal {
    records: Vec<OperationRecord>,
}

impl RunJournal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record stamped with the current time
    pub fn record(
        &mut self,
        operation: Operation,
        commands: Vec<String>,
        status: OperationStatus,
        detail: Option<String>,
    ) {
        self.record_at(operation, commands, status, detail, Local::now());
    }

    /// Append a record with an explicit time
    pub fn record_at(
        &mut self,
        operation: Operation,
        commands: Vec<String>,
        status: OperationStatus,
        detail: Option<String>,
        time: DateTime<Local>,
    ) {
        match status {
            OperationStatus::Failed => tracing::warn!(
                "{}: failed{}",
                operation.title(),
                detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
            ),
            _ => tracing::info!("{}: {}", operation.title(), status.as_str()),
        }
        for command in &commands {
            tracing::debug!("  command: {}", command);
        }

        self.records.push(OperationRecord {
            operation,
            commands,
            time,
            status,
            detail,
        });
    }

    /// Most recent record for `operation`
    pub fn find(&self, operation: Operation) -> Option<&OperationRecord> {
        self.records.iter().rev().find(|r| r.operation == operation)
    }

    /// Status of the most recent record for `operation`
    pub fn status_of(&self, operation: Operation) -> Option<OperationStatus> {
        self.find(operation).map(|r| r.status)
    }

    /// All records in insertion order
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }
}
