//! Runtime configuration for an imaging run

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Block size used for every read, write and digest step (4 MiB)
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Validator executable invoked when none is configured
pub const DEFAULT_VALIDATOR_COMMAND: &str = "isolyzer";

/// Placeholder recorded for metadata that could not be determined
pub const UNKNOWN: &str = "Unknown";

/// Configuration for one imaging run
///
/// The output directory is always `base_dir/filename`; every artifact of
/// the run is named after `filename` inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Disk identifier as reported by the OS (e.g. `disk4`)
    pub disk_id: String,

    /// Volume name of the mounted medium
    pub volume_name: String,

    /// Base name for all output files, without extension
    pub filename: String,

    /// Operator name or initials
    pub operator: String,

    /// Directory that receives the per-run output directory
    pub base_dir: PathBuf,

    /// Block device node (e.g. `/dev/disk4`)
    pub device_path: String,

    /// Raw (unbuffered) device node read by the copier
    pub raw_device_path: String,

    /// Skip unmount, copy and analysis
    pub dry_run: bool,

    /// Record verification as not performed
    pub no_verification: bool,

    /// Run the structural validator after the copy
    pub analysis_enabled: bool,

    /// Executable used for structural analysis
    pub validator_command: String,
}

impl RunConfig {
    /// Create a configuration with default device naming and analysis settings
    pub fn new(
        disk_id: impl Into<String>,
        filename: impl Into<String>,
        operator: impl Into<String>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        let disk_id = disk_id.into();
        Self {
            device_path: format!("/dev/{disk_id}"),
            raw_device_path: format!("/dev/r{disk_id}"),
            disk_id,
            volume_name: UNKNOWN.to_string(),
            filename: filename.into(),
            operator: operator.into(),
            base_dir: base_dir.into(),
            dry_run: false,
            no_verification: false,
            analysis_enabled: true,
            validator_command: DEFAULT_VALIDATOR_COMMAND.to_string(),
        }
    }

    /// Set the volume name
    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    /// Override the block and raw device nodes
    pub fn device_paths(mut self, device: impl Into<String>, raw: impl Into<String>) -> Self {
        self.device_path = device.into();
        self.raw_device_path = raw.into();
        self
    }

    /// Set dry run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set no-verification mode
    pub fn no_verification(mut self, no_verification: bool) -> Self {
        self.no_verification = no_verification;
        self
    }

    /// Enable or disable structural analysis
    pub fn analysis(mut self, enabled: bool) -> Self {
        self.analysis_enabled = enabled;
        self
    }

    /// Set the validator executable
    pub fn validator_command(mut self, command: impl Into<String>) -> Self {
        self.validator_command = command.into();
        self
    }

    /// Check that the identifying fields are usable
    pub fn validate(&self) -> Result<()> {
        if self.disk_id.trim().is_empty() {
            return Err(Error::InvalidConfig("disk identifier is empty".to_string()));
        }
        if self.filename.trim().is_empty() {
            return Err(Error::InvalidConfig("filename is empty".to_string()));
        }
        if self.filename.contains('/') || self.filename.contains('\\') {
            return Err(Error::InvalidConfig(format!(
                "filename must not contain path separators: {}",
                self.filename
            )));
        }
        if self.operator.trim().is_empty() {
            return Err(Error::InvalidConfig("operator is empty".to_string()));
        }
        Ok(())
    }

    /// Whether the copy step actually runs
    pub fn performs_copy(&self) -> bool {
        !self.dry_run
    }

    /// Whether the run reports verification as performed
    pub fn performs_verification(&self) -> bool {
        !self.no_verification && !self.dry_run
    }

    /// Directory holding every artifact of this run
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.filename)
    }

    /// Destination image
    pub fn image_path(&self) -> PathBuf {
        self.output_dir().join(self.image_filename())
    }

    /// Human-readable log
    pub fn log_path(&self) -> PathBuf {
        self.output_dir().join(self.log_filename())
    }

    /// Machine-readable manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir().join(self.manifest_filename())
    }

    /// Directory tree listing
    pub fn tree_path(&self) -> PathBuf {
        self.output_dir().join(self.tree_filename())
    }

    /// Archived structural validator output
    pub fn analysis_path(&self) -> PathBuf {
        self.output_dir().join(self.analysis_filename())
    }

    /// File name of the image
    pub fn image_filename(&self) -> String {
        format!("{}.iso", self.filename)
    }

    /// File name of the human log
    pub fn log_filename(&self) -> String {
        format!("{}.iso.log.txt", self.filename)
    }

    /// File name of the manifest
    pub fn manifest_filename(&self) -> String {
        format!("{}_manifest.json", self.filename)
    }

    /// File name of the tree listing
    pub fn tree_filename(&self) -> String {
        format!("{}_tree.txt", self.filename)
    }

    /// File name of the archived validator output
    pub fn analysis_filename(&self) -> String {
        format!("{}_isolyzer.xml", self.filename)
    }

    /// Where the volume is mounted while the tree listing runs
    pub fn volume_mount_point(&self) -> PathBuf {
        Path::new("/Volumes").join(&self.volume_name)
    }
}

/// Immutable description of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    /// Source stream identifier (raw device node or file)
    pub source: PathBuf,

    /// Destination image file
    pub destination: PathBuf,

    /// Declared total size of the source in bytes
    pub total_size: u64,
}

impl TransferSpec {
    /// Describe a transfer from a run configuration
    pub fn from_config(config: &RunConfig, total_size: u64) -> Self {
        Self {
            source: PathBuf::from(&config.raw_device_path),
            destination: config.image_path(),
            total_size,
        }
    }

    /// Equivalent `dd` command line, quoted in the journal and manifest
    pub fn dd_command(&self) -> String {
        format!(
            "dd if={} of={} bs=4m",
            self.source.display(),
            self.destination.display()
        )
    }
}
