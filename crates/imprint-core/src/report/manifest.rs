//! Machine-readable run manifest
//!
//! Sections are typed structs serialized in declaration order, so the key
//! order of the JSON is the schema order. Optional values serialize as
//! `null` instead of being dropped, keeping the shape of every manifest
//! identical.

use super::ReportInputs;
use super::format::{format_bytes, format_duration, speed_mb_s};
use crate::analysis::DetectedFilesystem;
use crate::config::{BLOCK_SIZE, TransferSpec, UNKNOWN};
use crate::environment::{EnvironmentInfo, TOOL_NAME, TOOL_VERSION};
use crate::error::Result;
use crate::journal::{Operation, OperationStatus};
use crate::tree::TreeSummary;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const MIB: f64 = 1024.0 * 1024.0;

/// Complete record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identity
    pub run: RunSection,
    /// Overall outcome
    pub status: StatusSection,
    /// Source medium description
    pub source_disc: SourceDiscSection,
    /// Volume sizes and mount point
    pub volume_information: VolumeSection,
    /// Names of every artifact
    pub output_files: OutputFilesSection,
    /// Each operation with its command and outcome
    pub operations_performed: OperationsSection,
    /// Durations and throughput
    pub timing_performance: TimingSection,
    /// Digest comparison
    pub integrity_verification: IntegritySection,
    /// Structural validator findings
    pub structural_analysis: StructuralSection,
    /// Host description
    pub system_environment: EnvironmentInfo,
    /// Device properties and imaging parameters
    pub technical_details: TechnicalDetails,
    /// Verification checklist
    pub quality_assurance: QualityAssurance,
}

// ── Identity & status ───────────────────────────────────────────────────────

/// Run identity section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// `YYYYmmddTHHMMSS_<operator>_<disk>`
    pub run_id: String,
    /// Random unique identifier
    pub uuid: String,
    /// Tool name
    pub tool_name: String,
    /// Tool version
    pub tool_version: String,
    /// When the report was generated
    pub created: String,
    /// When the run started
    pub started: String,
    /// Operator name or initials
    pub operator: String,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationVerdict {
    /// Digests agree
    Passed,
    /// Digests disagree
    Failed,
    /// Verification not performed
    Skipped,
}

/// Overall outcome section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSection {
    /// `success` or `failed`
    pub overall_status: String,
    /// The image file exists
    pub image_created: bool,
    /// Verification was part of this run
    pub verification_performed: bool,
    /// Verification outcome
    pub verification_passed: VerificationVerdict,
    /// Failures recorded during the run
    pub errors: Vec<String>,
}

// ── Source ──────────────────────────────────────────────────────────────────

/// Source medium section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDiscSection {
    /// Disk identifier
    pub disk_identifier: String,
    /// Block device node
    pub device_path: String,
    /// Raw device node
    pub raw_device_path: String,
    /// Volume name
    pub volume_name: String,
    /// Optical media type
    pub media_type: String,
    /// Filesystem name
    pub filesystem: String,
    /// Drive model
    pub drive_model: String,
    /// Drive capabilities
    pub drive_capabilities: String,
    /// Bus protocol
    pub connection_type: String,
    /// Media is erasable
    pub erasable: bool,
    /// Media is read-only
    pub read_only: bool,
}

/// Byte count or the unknown placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ByteCount {
    /// Known value
    Bytes(u64),
    /// Placeholder text
    Unknown(String),
}

/// Volume section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSection {
    /// Declared size of the medium
    pub total_size_bytes: u64,
    /// Declared size, human-readable
    pub total_size_formatted: String,
    /// Used space on the volume
    pub used_space_bytes: u64,
    /// Used space, human-readable
    pub used_space_formatted: String,
    /// Allocation block size
    pub allocation_block_size: ByteCount,
    /// Mount point
    pub mount_point: String,
}

/// Output file names section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFilesSection {
    /// Image file name
    pub image_filename: String,
    /// Image size on disk, if it exists
    pub image_file_size_bytes: Option<u64>,
    /// Image size, human-readable
    pub image_file_size_formatted: Option<String>,
    /// Directory holding every artifact
    pub output_directory: String,
    /// Human log file name
    pub log_filename: String,
    /// Tree listing file name
    pub tree_filename: String,
    /// Archived analysis report file name
    pub analysis_filename: String,
    /// Manifest file name
    pub manifest_filename: String,
}

// ── Operations ──────────────────────────────────────────────────────────────

/// Tree listing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeListingOperation {
    /// Command line
    pub command: Option<String>,
    /// Listing file name
    pub output_file: String,
    /// Outcome
    pub status: String,
    /// Parsed summary line
    pub summary: Option<TreeSummary>,
}

/// Generic single-command operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOperation {
    /// Command line
    pub command: Option<String>,
    /// Outcome
    pub status: String,
}

/// Image creation operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCreationOperation {
    /// Equivalent `dd` command line
    pub command: String,
    /// How the copy was performed
    pub method: String,
    /// Block size, human-readable
    pub block_size: String,
    /// Whether the copy ran
    pub performed: bool,
    /// Outcome
    pub status: String,
}

/// Verification operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOperation {
    /// How verification was performed
    pub method: String,
    /// Digest algorithm
    pub algorithm: String,
    /// Digest width
    pub algorithm_bits: u32,
    /// Whether verification counted for this run
    pub performed: bool,
    /// Shell command that performs an independent comparison
    pub shell_equivalent: String,
}

/// Structural analysis operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOperation {
    /// Command line
    pub command: Option<String>,
    /// Archived report file name
    pub output_file: String,
    /// Outcome
    pub status: String,
}

/// Finalization operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizationOperation {
    /// Commands run (remount, eject)
    pub commands: Vec<String>,
    /// Outcome
    pub status: String,
}

/// Operations section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsSection {
    /// Tree listing
    pub tree_listing: TreeListingOperation,
    /// Unmount before copy
    pub disk_unmount: CommandOperation,
    /// The copy
    pub image_creation: ImageCreationOperation,
    /// Digest comparison
    pub verification: VerificationOperation,
    /// Structural analysis
    pub structural_analysis: AnalysisOperation,
    /// Remount and eject
    pub finalization: FinalizationOperation,
}

// ── Timing & integrity ──────────────────────────────────────────────────────

/// Timed phase with throughput
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Seconds
    pub duration_seconds: f64,
    /// Human-readable duration
    pub duration_formatted: String,
    /// MiB per second, two decimals
    pub average_speed_mb_s: f64,
    /// Human-readable speed
    pub average_speed_formatted: String,
}

/// Phase without its own duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePhase {
    /// Seconds spent outside the copy
    pub duration_seconds: f64,
    /// Human-readable duration
    pub duration_formatted: String,
    /// Explanation
    pub note: String,
}

/// Total duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalTiming {
    /// Seconds
    pub duration_seconds: f64,
    /// Human-readable duration
    pub duration_formatted: String,
}

/// Timing section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSection {
    /// The copy
    pub image_creation: PhaseTiming,
    /// Verification, performed inline
    pub verification: InlinePhase,
    /// Whole imaging operation
    pub total_operation: TotalTiming,
}

/// Integrity verification section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegritySection {
    /// Digest algorithm
    pub hash_algorithm: String,
    /// Digest width
    pub hash_length_bits: u32,
    /// Digest of the bytes written to the image
    pub image_hash: Option<String>,
    /// Digest of the bytes read from the source
    pub source_hash: Option<String>,
    /// Whether the digests agree
    pub hashes_match: Option<bool>,
    /// How the digests were produced
    pub verification_method: String,
    /// `verified`, `failed` or `not_performed`
    pub integrity_status: String,
    /// What a match does and does not prove
    pub scope: String,
    /// Extra note
    pub notes: Option<String>,
}

// ── Structural analysis ─────────────────────────────────────────────────────

/// Size tests from the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeValidation {
    /// Sizes agree
    pub size_as_expected: bool,
    /// Size implied by filesystem metadata
    pub size_expected_bytes: u64,
    /// Actual image size
    pub size_actual_bytes: u64,
    /// Actual minus expected
    pub size_difference_bytes: i64,
    /// Difference in sectors
    pub size_difference_sectors: f64,
    /// Image is smaller than expected
    pub smaller_than_expected: bool,
    /// A known filesystem was found
    pub contains_known_filesystem: bool,
    /// Expected size, human-readable
    pub size_expected_formatted: String,
    /// Actual size, human-readable
    pub size_actual_formatted: String,
    /// Interpretation hint
    pub note: Option<String>,
}

/// Structural analysis section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralSection {
    /// Validator name
    pub tool_used: String,
    /// Validator version
    pub tool_version: String,
    /// A report was obtained and parsed
    pub analysis_performed: bool,
    /// Validator reported success
    pub analysis_successful: bool,
    /// `not_found`, `execution_failed` or `parse_error`
    pub error_type: Option<String>,
    /// Failure description
    pub error: Option<String>,
    /// Why analysis was not attempted
    pub skipped_reason: Option<String>,
    /// An ISO 9660 filesystem was found
    pub valid_iso9660: bool,
    /// A UDF filesystem was found
    pub contains_udf: bool,
    /// Size tests
    pub size_validation: SizeValidation,
    /// Filesystems in report order
    pub filesystems_detected: Vec<DetectedFilesystem>,
    /// Derived warnings
    pub warnings: Vec<String>,
}

// ── Technical details & QA ──────────────────────────────────────────────────

/// Selected properties of the source device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProperties {
    /// Device identifier
    pub device_identifier: Option<String>,
    /// Device node
    pub device_node: Option<String>,
    /// Ejectable
    pub ejectable: Option<bool>,
    /// Removable
    pub removable: Option<bool>,
    /// Internal
    pub internal: Option<bool>,
    /// SMART status
    pub smart_status: Option<String>,
    /// Bootable
    pub bootable: Option<bool>,
    /// Writable
    pub writable: Option<bool>,
}

/// How the image was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingParameters {
    /// Block size, human-readable
    pub block_size: String,
    /// Block size in bytes
    pub block_size_bytes: u64,
    /// Device read
    pub read_device: String,
    /// Image written
    pub write_destination: String,
    /// Digests computed during the copy
    pub single_pass_hashing: bool,
    /// Error policy
    pub error_handling: String,
}

/// Technical details section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    /// Device properties
    pub source_device_properties: DeviceProperties,
    /// Imaging parameters
    pub imaging_parameters: ImagingParameters,
}

/// One verification level of the QA checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLevel {
    /// Level name
    #[serde(rename = "type")]
    pub kind: String,
    /// Method used
    pub method: String,
    /// `verified`, `failed` or `not_performed`
    pub status: String,
    /// Confidence description
    pub confidence: String,
}

/// Quality assurance section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssurance {
    /// Verification levels
    pub verification_levels: Vec<VerificationLevel>,
    /// Suggested follow-up checks
    pub recommended_verifications: Vec<String>,
    /// Storage recommendations
    pub best_practices: Vec<String>,
    /// Free-form note
    pub notes: String,
}

impl RunReport {
    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse a manifest
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the manifest to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Manifest saved to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`RunReport`] from the results of a run
///
/// Building is pure: the same inputs and `now` always give the same report.
pub struct ReportBuilder<'a> {
    inputs: ReportInputs<'a>,
}

impl<'a> ReportBuilder<'a> {
    /// Wrap the run results
    pub fn new(inputs: ReportInputs<'a>) -> Self {
        Self { inputs }
    }

    /// Build with the current time as `created`
    pub fn build(&self) -> RunReport {
        self.build_at(Local::now())
    }

    /// Build with an explicit generation time
    pub fn build_at(&self, now: DateTime<Local>) -> RunReport {
        RunReport {
            run: self.run_section(now),
            status: self.status_section(),
            source_disc: self.source_disc(),
            volume_information: self.volume_information(),
            output_files: self.output_files(),
            operations_performed: self.operations(),
            timing_performance: self.timing(),
            integrity_verification: self.integrity(),
            structural_analysis: self.structural(),
            system_environment: self.inputs.environment.clone(),
            technical_details: self.technical_details(),
            quality_assurance: self.quality_assurance(),
        }
    }

    fn run_section(&self, now: DateTime<Local>) -> RunSection {
        let ReportInputs {
            config, identity, ..
        } = self.inputs;
        RunSection {
            run_id: identity.run_id.clone(),
            uuid: identity.uuid.to_string(),
            tool_name: TOOL_NAME.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            created: now.format(TIMESTAMP_FORMAT).to_string(),
            started: identity.started.format(TIMESTAMP_FORMAT).to_string(),
            operator: config.operator.clone(),
            dry_run: config.dry_run,
        }
    }

    fn copy_succeeded(&self) -> bool {
        self.inputs.transfer.is_some_and(|t| t.success)
    }

    fn verification_performed(&self) -> bool {
        self.inputs.config.performs_verification() && self.copy_succeeded()
    }

    fn hashes_match(&self) -> Option<bool> {
        self.inputs.transfer.and_then(|t| t.digests_match())
    }

    fn status_section(&self) -> StatusSection {
        let ok = match self.inputs.transfer {
            Some(transfer) => transfer.success,
            None => self.inputs.config.dry_run,
        };
        let verification_performed = self.verification_performed();
        let verification_passed = match (verification_performed, self.hashes_match()) {
            (true, Some(true)) => VerificationVerdict::Passed,
            (true, Some(false)) => VerificationVerdict::Failed,
            _ => VerificationVerdict::Skipped,
        };

        StatusSection {
            overall_status: if ok { "success" } else { "failed" }.to_string(),
            image_created: self.inputs.image_size.is_some(),
            verification_performed,
            verification_passed,
            errors: self
                .inputs
                .journal
                .records()
                .iter()
                .filter(|r| r.status == OperationStatus::Failed)
                .map(|r| match &r.detail {
                    Some(detail) => format!("{}: {}", r.operation.title(), detail),
                    None => r.operation.title().to_string(),
                })
                .collect(),
        }
    }

    fn source_disc(&self) -> SourceDiscSection {
        let ReportInputs { config, disk, .. } = self.inputs;
        SourceDiscSection {
            disk_identifier: config.disk_id.clone(),
            device_path: config.device_path.clone(),
            raw_device_path: config.raw_device_path.clone(),
            volume_name: config.volume_name.clone(),
            media_type: disk.media_type(),
            filesystem: disk.filesystem(),
            drive_model: disk.drive_model(),
            drive_capabilities: disk.drive_capabilities(),
            connection_type: disk.connection_type(),
            erasable: disk.erasable(),
            read_only: disk.read_only(),
        }
    }

    fn volume_information(&self) -> VolumeSection {
        let ReportInputs { config, disk, .. } = self.inputs;
        let total = disk.total_size();
        let used = disk.volume_size();
        VolumeSection {
            total_size_bytes: total,
            total_size_formatted: format_bytes(total),
            used_space_bytes: used,
            used_space_formatted: format_bytes(used),
            allocation_block_size: disk
                .allocation_block_size()
                .map(ByteCount::Bytes)
                .unwrap_or_else(|| ByteCount::Unknown(UNKNOWN.to_string())),
            mount_point: disk
                .mount_point()
                .map(str::to_string)
                .unwrap_or_else(|| config.volume_mount_point().display().to_string()),
        }
    }

    fn output_files(&self) -> OutputFilesSection {
        let ReportInputs {
            config, image_size, ..
        } = self.inputs;
        OutputFilesSection {
            image_filename: config.image_filename(),
            image_file_size_bytes: image_size,
            image_file_size_formatted: image_size.map(format_bytes),
            output_directory: config.output_dir().display().to_string(),
            log_filename: config.log_filename(),
            tree_filename: config.tree_filename(),
            analysis_filename: config.analysis_filename(),
            manifest_filename: config.manifest_filename(),
        }
    }

    fn command_of(&self, operation: Operation) -> Option<String> {
        self.inputs
            .journal
            .find(operation)
            .and_then(|r| r.commands.first().cloned())
    }

    fn status_of(&self, operation: Operation) -> String {
        self.inputs
            .journal
            .status_of(operation)
            .unwrap_or(OperationStatus::Skipped)
            .as_str()
            .to_string()
    }

    fn operations(&self) -> OperationsSection {
        let ReportInputs { config, tree, .. } = self.inputs;
        OperationsSection {
            tree_listing: TreeListingOperation {
                command: self.command_of(Operation::TreeListing),
                output_file: config.tree_filename(),
                status: self.status_of(Operation::TreeListing),
                summary: tree.cloned(),
            },
            disk_unmount: CommandOperation {
                command: self.command_of(Operation::DiskUnmount),
                status: self.status_of(Operation::DiskUnmount),
            },
            image_creation: ImageCreationOperation {
                command: TransferSpec::from_config(config, self.inputs.disk.total_size())
                    .dd_command(),
                method: "single pass with simultaneous hash calculation".to_string(),
                block_size: "4MB".to_string(),
                performed: config.performs_copy(),
                status: self.status_of(Operation::ImageCreation),
            },
            verification: VerificationOperation {
                method: "md5 comparison of image stream and source stream".to_string(),
                algorithm: "MD5".to_string(),
                algorithm_bits: 128,
                performed: self.verification_performed(),
                shell_equivalent: format!(
                    "[ \"$(md5 -q {})\" = \"$(dd if={} bs=4m 2>/dev/null | md5 -q)\" ] && echo \"MATCH\" || echo \"MISMATCH\"",
                    config.image_filename(),
                    config.raw_device_path
                ),
            },
            structural_analysis: AnalysisOperation {
                command: self.command_of(Operation::StructuralAnalysis),
                output_file: config.analysis_filename(),
                status: self.status_of(Operation::StructuralAnalysis),
            },
            finalization: FinalizationOperation {
                commands: self
                    .inputs
                    .journal
                    .find(Operation::Finalization)
                    .map(|r| r.commands.clone())
                    .unwrap_or_default(),
                status: self.status_of(Operation::Finalization),
            },
        }
    }

    fn timing(&self) -> TimingSection {
        let (bytes, seconds) = self
            .inputs
            .transfer
            .map(|t| (t.bytes_written, t.elapsed_seconds))
            .unwrap_or((0, 0.0));
        let speed = speed_mb_s(bytes, seconds);

        TimingSection {
            image_creation: PhaseTiming {
                duration_seconds: seconds,
                duration_formatted: format_duration(seconds),
                average_speed_mb_s: speed,
                average_speed_formatted: format!("{speed:.2} MB/s"),
            },
            verification: InlinePhase {
                duration_seconds: 0.0,
                duration_formatted: "Performed during creation".to_string(),
                note: "Digests are computed while the image is written".to_string(),
            },
            total_operation: TotalTiming {
                duration_seconds: seconds,
                duration_formatted: format_duration(seconds),
            },
        }
    }

    fn integrity(&self) -> IntegritySection {
        let transfer = self.inputs.transfer;
        let hashes_match = self.hashes_match();
        let integrity_status = if !self.verification_performed() {
            "not_performed"
        } else {
            match hashes_match {
                Some(true) => "verified",
                Some(false) => "failed",
                None => "not_performed",
            }
        };

        IntegritySection {
            hash_algorithm: "MD5".to_string(),
            hash_length_bits: 128,
            image_hash: transfer.and_then(|t| t.digest_a).map(|d| d.to_hex()),
            source_hash: transfer.and_then(|t| t.digest_b).map(|d| d.to_hex()),
            hashes_match,
            verification_method: "Dual digest calculated in a single pass during creation"
                .to_string(),
            integrity_status: integrity_status.to_string(),
            scope: "Both digests are computed from the same bytes read from the source; \
                    a match confirms consistent hashing of the stream, not a re-read of the written image"
                .to_string(),
            notes: (integrity_status == "verified")
                .then(|| "Image digest matches source stream digest".to_string()),
        }
    }

    fn structural(&self) -> StructuralSection {
        let analysis = self.inputs.analysis;
        let tests = analysis.tests.clone().unwrap_or_default();
        let has_tests = analysis.tests.is_some();

        StructuralSection {
            tool_used: non_empty(&analysis.tool.name)
                .unwrap_or(&self.inputs.config.validator_command)
                .to_string(),
            tool_version: non_empty(&analysis.tool.version)
                .unwrap_or("unknown")
                .to_string(),
            analysis_performed: analysis.performed(),
            analysis_successful: analysis.status_success,
            error_type: analysis
                .failure
                .as_ref()
                .map(|f| f.kind.as_str().to_string()),
            error: analysis.failure.as_ref().map(|f| f.message.clone()),
            skipped_reason: analysis.skipped.clone(),
            valid_iso9660: analysis.valid_iso9660(),
            contains_udf: analysis.contains_udf(),
            size_validation: SizeValidation {
                size_as_expected: !has_tests || tests.size_as_expected,
                size_expected_bytes: tests.size_expected,
                size_actual_bytes: tests.size_actual,
                size_difference_bytes: tests.size_difference,
                size_difference_sectors: tests.size_difference_sectors,
                smaller_than_expected: tests.smaller_than_expected,
                contains_known_filesystem: !has_tests || tests.contains_known_filesystem,
                size_expected_formatted: format!("{:.1} MB", tests.size_expected as f64 / MIB),
                size_actual_formatted: format!("{:.1} MB", tests.size_actual as f64 / MIB),
                note: (tests.size_difference != 0).then(|| {
                    "Small differences (1-2 sectors) are normal for optical media".to_string()
                }),
            },
            filesystems_detected: analysis.filesystems.clone(),
            warnings: analysis.warnings.clone(),
        }
    }

    fn technical_details(&self) -> TechnicalDetails {
        let ReportInputs { config, disk, .. } = self.inputs;
        TechnicalDetails {
            source_device_properties: DeviceProperties {
                device_identifier: disk.get("DeviceIdentifier").map(str::to_string),
                device_node: disk.get("DeviceNode").map(str::to_string),
                ejectable: disk.flag("Ejectable"),
                removable: disk.flag("Removable").or_else(|| disk.flag("RemovableMedia")),
                internal: disk.flag("Internal"),
                smart_status: disk.get("SMARTStatus").map(str::to_string),
                bootable: disk.flag("Bootable"),
                writable: disk.flag("Writable"),
            },
            imaging_parameters: ImagingParameters {
                block_size: "4MB".to_string(),
                block_size_bytes: BLOCK_SIZE as u64,
                read_device: config.raw_device_path.clone(),
                write_destination: config.image_path().display().to_string(),
                single_pass_hashing: true,
                error_handling: "abort on first read or write error; partial image retained"
                    .to_string(),
            },
        }
    }

    fn quality_assurance(&self) -> QualityAssurance {
        let copy_status = if !self.verification_performed() {
            "not_performed"
        } else {
            match self.hashes_match() {
                Some(true) => "verified",
                Some(false) => "failed",
                None => "not_performed",
            }
        };
        let analysis = self.inputs.analysis;
        let structural_status = analysis.verdict();

        QualityAssurance {
            verification_levels: vec![
                VerificationLevel {
                    kind: "bit_perfect_copy".to_string(),
                    method: "MD5 hash comparison".to_string(),
                    status: copy_status.to_string(),
                    confidence: confidence(copy_status).to_string(),
                },
                VerificationLevel {
                    kind: "structural_integrity".to_string(),
                    method: "isolyzer analysis".to_string(),
                    status: structural_status.to_string(),
                    confidence: confidence(structural_status).to_string(),
                },
            ],
            recommended_verifications: strings(&[
                "Mount the image and compare its file structure with the tree listing",
                "Test the image in its target environment",
                "Verify specific files if the data is critical",
                "Review the structural analysis report for format issues",
            ]),
            best_practices: strings(&[
                "Store the image in multiple locations",
                "Keep the manifest and checksum with the image for long-term storage",
                "Document any disc damage or read errors",
                "Keep the structural analysis report for format validation",
            ]),
            notes: "This manifest documents bit-level and structural verification of the image \
                    for audit and validation purposes"
                .to_string(),
        }
    }
}

fn confidence(status: &str) -> &'static str {
    match status {
        "verified" => "high",
        "failed" => "none",
        _ => "unknown",
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisErrorKind, StructuralAnalysis};
    use crate::config::RunConfig;
    use crate::copier::{Digest, TransferResult};
    use crate::disk::DiskMetadata;
    use crate::journal::{RunIdentity, RunJournal};
    use chrono::TimeZone;
    use uuid::Uuid;

    struct Fixture {
        config: RunConfig,
        identity: RunIdentity,
        analysis: StructuralAnalysis,
        disk: DiskMetadata,
        journal: RunJournal,
        environment: EnvironmentInfo,
    }

    impl Fixture {
        fn new(config: RunConfig) -> Self {
            let started = Local.with_ymd_and_hms(2025, 3, 6, 14, 5, 9).unwrap();
            Self {
                config,
                identity: RunIdentity::at("JD", "disk4", started, Uuid::nil()),
                analysis: StructuralAnalysis::skipped("dry run"),
                disk: DiskMetadata::from_properties([
                    ("TotalSize", "2048"),
                    ("OpticalMediaType", "CD-ROM"),
                ]),
                journal: RunJournal::new(),
                environment: EnvironmentInfo {
                    operating_system: "Darwin".into(),
                    os_version: "14.4".into(),
                    kernel_version: "23.4.0".into(),
                    machine_architecture: "aarch64".into(),
                    hostname: "archive-mac".into(),
                    tool_version: "0.1.0".into(),
                    user_context: "root".into(),
                },
            }
        }

        fn build(&self, transfer: Option<&TransferResult>) -> RunReport {
            ReportBuilder::new(ReportInputs {
                config: &self.config,
                identity: &self.identity,
                transfer,
                analysis: &self.analysis,
                disk: &self.disk,
                journal: &self.journal,
                environment: &self.environment,
                tree: None,
                image_size: transfer.map(|t| t.bytes_written),
            })
            .build_at(self.identity.started)
        }
    }

    fn transfer(a: [u8; 16], b: [u8; 16]) -> TransferResult {
        TransferResult {
            bytes_written: 2048,
            elapsed_seconds: 2.0,
            digest_a: Some(Digest::from_bytes(a)),
            digest_b: Some(Digest::from_bytes(b)),
            success: true,
            error: None,
        }
    }

    fn config() -> RunConfig {
        RunConfig::new("disk4", "photos", "JD", "/tmp/out")
    }

    #[test]
    fn test_top_level_key_order() {
        let fixture = Fixture::new(config());
        let json = fixture.build(Some(&transfer([1; 16], [1; 16]))).to_json().unwrap();
        let keys = [
            "\"run\"",
            "\"status\"",
            "\"source_disc\"",
            "\"volume_information\"",
            "\"output_files\"",
            "\"operations_performed\"",
            "\"timing_performance\"",
            "\"integrity_verification\"",
            "\"structural_analysis\"",
            "\"system_environment\"",
            "\"technical_details\"",
            "\"quality_assurance\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_matching_digests_verified() {
        let fixture = Fixture::new(config());
        let report = fixture.build(Some(&transfer([7; 16], [7; 16])));
        assert_eq!(report.status.overall_status, "success");
        assert_eq!(report.status.verification_passed, VerificationVerdict::Passed);
        assert_eq!(report.integrity_verification.hashes_match, Some(true));
        assert_eq!(report.integrity_verification.integrity_status, "verified");
        assert_eq!(report.quality_assurance.verification_levels[0].status, "verified");
        assert_eq!(report.timing_performance.image_creation.duration_formatted, "2.00 seconds");
    }

    #[test]
    fn test_mismatched_digests_failed() {
        let fixture = Fixture::new(config());
        let report = fixture.build(Some(&transfer([7; 16], [8; 16])));
        assert_eq!(report.status.verification_passed, VerificationVerdict::Failed);
        assert_eq!(report.integrity_verification.integrity_status, "failed");
        assert_eq!(report.integrity_verification.notes, None);
    }

    #[test]
    fn test_no_verification_not_performed() {
        let fixture = Fixture::new(config().no_verification(true));
        let report = fixture.build(Some(&transfer([7; 16], [7; 16])));
        assert!(!report.status.verification_performed);
        assert_eq!(report.status.verification_passed, VerificationVerdict::Skipped);
        assert_eq!(report.integrity_verification.integrity_status, "not_performed");
        assert!(report.integrity_verification.image_hash.is_some());
    }

    #[test]
    fn test_dry_run_nulls() {
        let fixture = Fixture::new(config().dry_run(true));
        let report = fixture.build(None);
        assert_eq!(report.status.overall_status, "success");
        assert!(!report.status.image_created);
        assert_eq!(report.integrity_verification.image_hash, None);
        assert_eq!(report.integrity_verification.hashes_match, None);
        assert_eq!(report.structural_analysis.skipped_reason.as_deref(), Some("dry run"));
        assert!(!report.operations_performed.image_creation.performed);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"image_hash\": null"));
        assert!(json.contains("\"allocation_block_size\": \"Unknown\""));
    }

    #[test]
    fn test_failed_copy_reports_error() {
        let mut fixture = Fixture::new(config());
        fixture.journal.record(
            Operation::ImageCreation,
            vec![],
            OperationStatus::Failed,
            Some("read failed".into()),
        );
        let err = crate::Error::Interrupted { bytes_written: 4 };
        let failed = TransferResult::failed(&err, 1.0);
        let report = fixture.build(Some(&failed));
        assert_eq!(report.status.overall_status, "failed");
        assert_eq!(
            report.status.errors,
            vec!["Image Creation & Verification: read failed".to_string()]
        );
        assert_eq!(report.operations_performed.image_creation.status, "failed");
    }

    #[test]
    fn test_analysis_failure_classified() {
        let mut fixture = Fixture::new(config());
        fixture.analysis = StructuralAnalysis::failed(AnalysisErrorKind::NotFound, "isolyzer not found");
        let report = fixture.build(Some(&transfer([1; 16], [1; 16])));
        let section = &report.structural_analysis;
        assert!(!section.analysis_performed);
        assert_eq!(section.error_type.as_deref(), Some("not_found"));
        assert_eq!(section.tool_used, "isolyzer");
        assert_eq!(report.status.overall_status, "success");
        assert_eq!(report.quality_assurance.verification_levels[1].status, "failed");
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let fixture = Fixture::new(config());
        let json = fixture.build(Some(&transfer([3; 16], [3; 16]))).to_json().unwrap();
        let parsed = RunReport::from_json(&json).unwrap();
        assert_eq!(parsed.to_json().unwrap(), json);
    }

    #[test]
    fn test_build_is_idempotent() {
        let fixture = Fixture::new(config());
        let t = transfer([3; 16], [3; 16]);
        assert_eq!(fixture.build(Some(&t)), fixture.build(Some(&t)));
    }

    #[test]
    fn test_round_trip_mixed_filesystems() {
        use crate::analysis::{
            DetectedFilesystem, FilesystemDetails, Iso9660Descriptor, UdfDescriptor,
        };

        let mut fixture = Fixture::new(config());
        fixture.analysis = StructuralAnalysis {
            status_success: true,
            filesystems: vec![
                DetectedFilesystem {
                    fs_type: "ISO 9660".into(),
                    details: FilesystemDetails::Iso9660(Iso9660Descriptor {
                        volume_identifier: "PHOTOS".into(),
                        logical_block_size: 2048,
                        volume_space_size: 1,
                        ..Iso9660Descriptor::default()
                    }),
                },
                DetectedFilesystem {
                    fs_type: "UDF".into(),
                    details: FilesystemDetails::Udf(UdfDescriptor {
                        logical_volume_identifier: "PHOTOS".into(),
                        logical_block_size: 2048,
                        implementation: "*Apple Mac OS X UDF FS".into(),
                    }),
                },
                DetectedFilesystem {
                    fs_type: "HFS".into(),
                    details: FilesystemDetails::None {},
                },
                DetectedFilesystem {
                    fs_type: "ISO 9660".into(),
                    details: FilesystemDetails::None {},
                },
            ],
            ..StructuralAnalysis::default()
        };

        let report = fixture.build(Some(&transfer([5; 16], [5; 16])));
        let json = report.to_json().unwrap();
        let parsed = RunReport::from_json(&json).unwrap();

        assert_eq!(
            parsed.structural_analysis.filesystems_detected,
            fixture.analysis.filesystems
        );
        assert_eq!(parsed.to_json().unwrap(), json);
    }
}
