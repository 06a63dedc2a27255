//! Structural analysis of finished images
//!
//! An external validator (isolyzer by default) inspects the image and prints
//! an XML report. [`StructuralAnalysisAdapter`] runs it, archives the raw
//! output next to the image, and turns the report into a typed
//! [`StructuralAnalysis`]. Failures here never fail the run: they are
//! classified and carried in the record instead.

use crate::error::{Error, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// XML namespace of isolyzer reports
pub const ISOLYZER_NAMESPACE: &str = "http://kb.nl/ns/isolyzer/v1/";

/// Filesystem type attribute for ISO 9660
pub const FS_ISO9660: &str = "ISO 9660";

/// Filesystem type attribute for UDF
pub const FS_UDF: &str = "UDF";

/// Why structural analysis did not produce a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisErrorKind {
    /// Validator executable is not installed
    NotFound,
    /// Validator exited unsuccessfully or could not be run
    ExecutionFailed,
    /// Validator output was not a usable report
    ParseError,
}

impl AnalysisErrorKind {
    /// Manifest spelling of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisErrorKind::NotFound => "not_found",
            AnalysisErrorKind::ExecutionFailed => "execution_failed",
            AnalysisErrorKind::ParseError => "parse_error",
        }
    }
}

/// Classified analysis failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Failure class
    pub kind: AnalysisErrorKind,
    /// Human-readable cause
    pub message: String,
}

/// Validator identity as reported by the tool itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool version
    pub version: String,
}

/// File information reported by the validator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name as seen by the validator
    pub name: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last-modified timestamp string
    pub last_modified: String,
}

/// Named test outcomes from the validator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTests {
    /// A recognized filesystem was found
    pub contains_known_filesystem: bool,
    /// Size implied by the filesystem metadata
    pub size_expected: u64,
    /// Actual size of the image
    pub size_actual: u64,
    /// Actual minus expected, in bytes
    pub size_difference: i64,
    /// Difference expressed in 2048-byte sectors
    pub size_difference_sectors: f64,
    /// Sizes agree
    pub size_as_expected: bool,
    /// Image is smaller than its metadata claims
    pub smaller_than_expected: bool,
}

/// ISO 9660 primary volume descriptor fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Iso9660Descriptor {
    /// Volume identifier
    pub volume_identifier: String,
    /// Volume creation date and time
    pub creation_date: String,
    /// Publisher identifier
    pub publisher: String,
    /// Data preparer identifier
    pub data_preparer: String,
    /// Logical block size in bytes
    pub logical_block_size: u64,
    /// Volume space size in logical blocks
    pub volume_space_size: u64,
}

/// UDF logical volume descriptor fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UdfDescriptor {
    /// Logical volume identifier
    pub logical_volume_identifier: String,
    /// Logical block size in bytes
    pub logical_block_size: u64,
    /// Implementation identifier
    pub implementation: String,
}

/// Type-specific filesystem fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilesystemDetails {
    /// ISO 9660 primary volume descriptor
    Iso9660(Iso9660Descriptor),
    /// UDF logical volume descriptor
    Udf(UdfDescriptor),
    /// Unknown type or no descriptor present
    None {},
}

/// One filesystem detected in the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFilesystem {
    /// `TYPE` attribute as reported (e.g. `ISO 9660`, `UDF`)
    #[serde(rename = "type")]
    pub fs_type: String,
    /// Descriptor fields for known types
    pub details: FilesystemDetails,
}

/// Typed result of structural analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    /// Validator identity
    pub tool: ToolInfo,
    /// Image file information
    pub file: Option<FileInfo>,
    /// Validator reported overall success
    pub status_success: bool,
    /// Test outcomes, absent when the report had no tests section
    pub tests: Option<AnalysisTests>,
    /// Filesystems in report order
    pub filesystems: Vec<DetectedFilesystem>,
    /// Warnings derived from the tests, in order
    pub warnings: Vec<String>,
    /// Set when analysis could not produce a report
    pub failure: Option<AnalysisFailure>,
    /// Set when analysis was deliberately not run
    pub skipped: Option<String>,
}

impl StructuralAnalysis {
    /// Record for a run where analysis was not attempted
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Record for a failed analysis attempt
    pub fn failed(kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(AnalysisFailure {
                kind,
                message: message.into(),
            }),
            ..Self::default()
        }
    }

    /// Whether a report was obtained and parsed
    pub fn performed(&self) -> bool {
        self.skipped.is_none() && self.failure.is_none()
    }

    /// An ISO 9660 filesystem was detected
    pub fn valid_iso9660(&self) -> bool {
        self.filesystems.iter().any(|fs| fs.fs_type == FS_ISO9660)
    }

    /// A UDF filesystem was detected
    pub fn contains_udf(&self) -> bool {
        self.filesystems.iter().any(|fs| fs.fs_type == FS_UDF)
    }

    /// Structural integrity verdict used by the quality checklist
    pub fn verdict(&self) -> &'static str {
        if self.performed() && self.valid_iso9660() && self.status_success {
            "verified"
        } else if self.failure.is_some() {
            "failed"
        } else {
            "not_performed"
        }
    }
}

/// External tool that inspects an image and reports on its structure
#[cfg_attr(test, mockall::automock)]
pub trait StructuralValidator {
    /// Name used in messages and placeholder reports
    fn name(&self) -> String;

    /// Run against `image` and return the raw report
    fn run(&self, image: &Path) -> Result<String>;
}

/// Runs the isolyzer executable
#[derive(Debug, Clone)]
pub struct IsolyzerValidator {
    command: String,
}

impl IsolyzerValidator {
    /// Use the given executable name or path
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for IsolyzerValidator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_VALIDATOR_COMMAND)
    }
}

impl StructuralValidator for IsolyzerValidator {
    fn name(&self) -> String {
        Path::new(&self.command)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.command.clone())
    }

    fn run(&self, image: &Path) -> Result<String> {
        tracing::debug!("Running: {} {}", self.command, image.display());

        let output = Command::new(&self.command)
            .arg(image)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::ValidatorMissing(format!("{} not installed", self.command))
                }
                _ => Error::ValidatorExecutionFailed(format!("{}: {}", self.command, e)),
            })?;

        if !output.status.success() {
            return Err(Error::ValidatorExecutionFailed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs a validator and records its outcome
pub struct StructuralAnalysisAdapter<V> {
    validator: V,
}

impl<V: StructuralValidator> StructuralAnalysisAdapter<V> {
    /// Wrap a validator
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    /// Analyze `image`, archiving the raw report to `archive`
    ///
    /// `declared_size` is the size the source reported before the copy; a
    /// disagreement with the image size is added as a warning.
    pub fn analyze(&self, image: &Path, archive: &Path, declared_size: u64) -> StructuralAnalysis {
        let raw = match self.validator.run(image) {
            Ok(raw) => raw,
            Err(Error::ValidatorMissing(message)) => {
                tracing::warn!("{} not found, skipping structural analysis", self.validator.name());
                return StructuralAnalysis::failed(AnalysisErrorKind::NotFound, message);
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Structural analysis failed: {}", message);
                archive_report(archive, &placeholder_report(&self.validator.name(), &message));
                return StructuralAnalysis::failed(AnalysisErrorKind::ExecutionFailed, message);
            }
        };

        archive_report(archive, &raw);

        match parse_report(&raw) {
            Ok(mut analysis) => {
                if let Some(file) = &analysis.file {
                    if declared_size > 0 && file.size_bytes != declared_size {
                        analysis.warnings.push(format!(
                            "Image file size ({} bytes) differs from declared source size ({} bytes)",
                            file.size_bytes, declared_size
                        ));
                    }
                }
                for warning in &analysis.warnings {
                    tracing::warn!("{}", warning);
                }
                tracing::info!(
                    "Structural analysis complete: iso9660={}, udf={}",
                    analysis.valid_iso9660(),
                    analysis.contains_udf()
                );
                analysis
            }
            Err(e) => {
                tracing::warn!("{}", e);
                StructuralAnalysis::failed(AnalysisErrorKind::ParseError, e.to_string())
            }
        }
    }
}

fn archive_report(path: &Path, contents: &str) {
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!("Could not archive analysis report to {}: {}", path.display(), e);
    } else {
        tracing::debug!("Analysis report archived to {}", path.display());
    }
}

/// Minimal, well-formed report written when the validator could not run
pub fn placeholder_report(tool: &str, error: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" ?>\n",
            "<isolyzer xmlns=\"{ns}\">\n",
            "  <toolInfo>\n",
            "    <toolName>{tool}</toolName>\n",
            "    <toolVersion>unknown</toolVersion>\n",
            "  </toolInfo>\n",
            "  <image>\n",
            "    <statusInfo>\n",
            "      <success>False</success>\n",
            "      <error>{error}</error>\n",
            "    </statusInfo>\n",
            "  </image>\n",
            "</isolyzer>\n"
        ),
        ns = ISOLYZER_NAMESPACE,
        tool = escape_xml(tool),
        error = escape_xml(error),
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Report parsing ──────────────────────────────────────────────────────────

/// Parse an isolyzer XML report
///
/// Missing or malformed optional fields default to zero, false or empty.
/// A document that is not XML, or has no `image` element, is a parse error.
pub fn parse_report(xml: &str) -> Result<StructuralAnalysis> {
    let doc = Document::parse(xml).map_err(|e| Error::ValidatorParseFailed(e.to_string()))?;
    let root = doc.root_element();

    let tool = child(root, "toolInfo")
        .map(|info| ToolInfo {
            name: text(info, "toolName"),
            version: text(info, "toolVersion"),
        })
        .unwrap_or_default();

    let image = child(root, "image")
        .ok_or_else(|| Error::ValidatorParseFailed("no image element in report".to_string()))?;

    let file = child(image, "fileInfo").map(|info| FileInfo {
        name: text(info, "fileName"),
        size_bytes: number(info, "fileSizeInBytes"),
        last_modified: text(info, "fileLastModified"),
    });

    let status_success = child(image, "statusInfo")
        .map(|status| flag(status, "success"))
        .unwrap_or(false);

    let tests = child(image, "tests").map(|tests| AnalysisTests {
        contains_known_filesystem: flag(tests, "containsKnownFileSystem"),
        size_expected: number(tests, "sizeExpected"),
        size_actual: number(tests, "sizeActual"),
        size_difference: number(tests, "sizeDifference"),
        size_difference_sectors: number(tests, "sizeDifferenceSectors"),
        size_as_expected: flag(tests, "sizeAsExpected"),
        smaller_than_expected: flag(tests, "smallerThanExpected"),
    });

    let filesystems: Vec<DetectedFilesystem> = child(image, "fileSystems")
        .map(|list| {
            children(list, "fileSystem")
                .map(parse_filesystem)
                .collect()
        })
        .unwrap_or_default();

    let warnings = derive_warnings(tests.as_ref(), &filesystems);

    tracing::debug!(
        "Parsed report: {} filesystem(s), {} warning(s)",
        filesystems.len(),
        warnings.len()
    );

    Ok(StructuralAnalysis {
        tool,
        file,
        status_success,
        tests,
        filesystems,
        warnings,
        failure: None,
        skipped: None,
    })
}

fn parse_filesystem(node: Node<'_, '_>) -> DetectedFilesystem {
    let fs_type = node.attribute("TYPE").unwrap_or_default().to_string();

    let details = match fs_type.as_str() {
        FS_ISO9660 => child(node, "primaryVolumeDescriptor")
            .map(|pvd| {
                FilesystemDetails::Iso9660(Iso9660Descriptor {
                    volume_identifier: text(pvd, "volumeIdentifier"),
                    creation_date: text(pvd, "volumeCreationDateAndTime"),
                    publisher: text(pvd, "publisherIdentifier"),
                    data_preparer: text(pvd, "dataPreparerIdentifier"),
                    logical_block_size: number(pvd, "logicalBlockSize"),
                    volume_space_size: number(pvd, "volumeSpaceSize"),
                })
            })
            .unwrap_or(FilesystemDetails::None {}),
        FS_UDF => child(node, "logicalVolumeDescriptor")
            .map(|lvd| {
                FilesystemDetails::Udf(UdfDescriptor {
                    logical_volume_identifier: text(lvd, "logicalVolumeIdentifier"),
                    logical_block_size: number(lvd, "logicalBlockSize"),
                    implementation: text(lvd, "implementationIdentifier"),
                })
            })
            .unwrap_or(FilesystemDetails::None {}),
        _ => FilesystemDetails::None {},
    };

    DetectedFilesystem { fs_type, details }
}

/// Warnings derived from test outcomes, in a fixed order
pub fn derive_warnings(
    tests: Option<&AnalysisTests>,
    filesystems: &[DetectedFilesystem],
) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(tests) = tests else {
        return warnings;
    };

    if !tests.size_as_expected {
        warnings.push(format!(
            "File size differs from expected by {} bytes",
            tests.size_difference
        ));
    }
    if tests.smaller_than_expected {
        warnings.push(format!(
            "Image is smaller than expected ({} of {} bytes)",
            tests.size_actual, tests.size_expected
        ));
    }
    if !tests.contains_known_filesystem && filesystems.is_empty() {
        warnings.push("No known filesystem detected".to_string());
    }
    warnings
}

fn is_named(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && matches!(node.tag_name().namespace(), None | Some(ISOLYZER_NAMESPACE))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_named(n, name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_named(n, name))
}

fn text(node: Node<'_, '_>, name: &str) -> String {
    child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn number<T: std::str::FromStr + Default>(node: Node<'_, '_>, name: &str) -> T {
    text(node, name).parse().unwrap_or_default()
}

fn flag(node: Node<'_, '_>, name: &str) -> bool {
    text(node, name) == "True"
}

// ============================================================================
// UNIT TESTS
// ============================================================================
