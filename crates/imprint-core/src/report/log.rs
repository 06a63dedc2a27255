//! Human-readable run log

use super::format::{format_bytes, format_duration_short};
use super::manifest::{RunReport, VerificationVerdict};
use crate::analysis::FilesystemDetails;
use crate::disk::DiskMetadata;
use crate::journal::RunJournal;
use chrono::{DateTime, Local};

const TITLE: &str = "IMPRINT DISC IMAGING LOG";

struct LogWriter {
    lines: Vec<String>,
}

impl LogWriter {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        self.lines.push(format!("{label}: {value}"));
    }

    fn section(&mut self, heading: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(heading.to_string());
        self.lines.push("-".repeat(20));
    }

    fn finish(mut self) -> String {
        self.lines.push(String::new());
        self.lines.join("\n")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}

/// Render the log for a finished run
///
/// Sections appear in a fixed order: summary, disc information, output
/// files, operation details, verification results, structure analysis,
/// finalization, system information, detailed disk metadata, footer.
pub fn render_log(
    report: &RunReport,
    journal: &RunJournal,
    disk: &DiskMetadata,
    generated_at: DateTime<Local>,
) -> String {
    let mut log = LogWriter::new();
    let rule = "=".repeat(70);

    log.line(rule.clone());
    log.line(TITLE);
    log.line(rule.clone());

    // Summary
    let run = &report.run;
    let status = &report.status;
    log.section("BACKUP SUMMARY");
    log.field("Run ID", &run.run_id);
    log.field("UUID", &run.uuid);
    log.field("Operator", &run.operator);
    log.field("Start Time", &run.started);
    log.field("End Time", &run.created);
    log.field(
        "Total Duration",
        format_duration_short(report.timing_performance.total_operation.duration_seconds),
    );
    log.field(
        "Status",
        if status.overall_status == "success" {
            "SUCCESS"
        } else {
            "FAILED"
        },
    );
    log.field(
        "Verification",
        match status.verification_passed {
            VerificationVerdict::Passed => "PASS",
            VerificationVerdict::Failed => "FAIL",
            VerificationVerdict::Skipped => "SKIPPED",
        },
    );
    if run.dry_run {
        log.line("Mode: DRY RUN (no image created)");
    }
    for error in &status.errors {
        log.field("Error", error);
    }

    // Disc
    let disc = &report.source_disc;
    let volume = &report.volume_information;
    log.section("DISC INFORMATION");
    log.field("Disk ID", &disc.disk_identifier);
    log.field("Device Path", &disc.device_path);
    log.field("Raw Device", &disc.raw_device_path);
    log.field("Volume Name", &disc.volume_name);
    log.field("Media Type", &disc.media_type);
    log.field("Filesystem", &disc.filesystem);
    log.field("Drive Model", &disc.drive_model);
    log.field("Connection", &disc.connection_type);
    log.field(
        "Total Size",
        format!(
            "{} ({} bytes)",
            volume.total_size_formatted, volume.total_size_bytes
        ),
    );
    log.field(
        "Used Space",
        format!(
            "{} ({} bytes)",
            volume.used_space_formatted, volume.used_space_bytes
        ),
    );
    log.field("Mount Point", &volume.mount_point);

    // Files
    let files = &report.output_files;
    log.section("OUTPUT FILES");
    log.field("Output Directory", &files.output_directory);
    match files.image_file_size_bytes {
        Some(size) => log.field(
            "Image File",
            format!("{} ({})", files.image_filename, format_bytes(size)),
        ),
        None => log.field("Image File", format!("{} (not created)", files.image_filename)),
    }
    log.field("Log File", &files.log_filename);
    log.field("Manifest", &files.manifest_filename);
    log.field("Tree Listing", &files.tree_filename);
    log.field("Analysis Report", &files.analysis_filename);

    // Narrative
    log.section("OPERATION DETAILS");
    if journal.records().is_empty() {
        log.line("No operations recorded");
    }
    for record in journal.records() {
        log.line(format!(
            "[{}] {}",
            record.time.format("%H:%M:%S"),
            record.operation.title()
        ));
        for command in &record.commands {
            log.line(format!("  Command: {command}"));
        }
        log.line(format!("  Status: {}", record.status.as_str().to_uppercase()));
        if let Some(detail) = &record.detail {
            log.line(format!("  Detail: {detail}"));
        }
    }

    // Verification
    let integrity = &report.integrity_verification;
    let timing = &report.timing_performance.image_creation;
    log.section("VERIFICATION RESULTS");
    log.field("Algorithm", "MD5 (128-bit)");
    log.field("Image MD5", integrity.image_hash.as_deref().unwrap_or("N/A"));
    log.field("Source MD5", integrity.source_hash.as_deref().unwrap_or("N/A"));
    log.field(
        "Match",
        integrity.hashes_match.map(yes_no).unwrap_or("N/A"),
    );
    log.field("Integrity Status", &integrity.integrity_status);
    log.field("Creation Time", &timing.duration_formatted);
    log.field("Average Speed", &timing.average_speed_formatted);

    // Structure
    let structure = &report.structural_analysis;
    log.section("STRUCTURE ANALYSIS");
    log.field(
        "Tool",
        format!("{} ({})", structure.tool_used, structure.tool_version),
    );
    if let Some(reason) = &structure.skipped_reason {
        log.field("Status", format!("SKIPPED ({reason})"));
    } else if let (Some(kind), Some(error)) = (&structure.error_type, &structure.error) {
        log.field("Status", format!("ERROR ({kind})"));
        log.field("Error", error);
    } else {
        log.field(
            "Status",
            if structure.analysis_successful {
                "SUCCESS"
            } else {
                "COMPLETED WITH ISSUES"
            },
        );
        log.field("Valid ISO 9660", yes_no(structure.valid_iso9660));
        log.field("Contains UDF", yes_no(structure.contains_udf));
        for fs in &structure.filesystems_detected {
            match &fs.details {
                FilesystemDetails::Iso9660(pvd) => log.line(format!(
                    "  - {} (volume {}, {} blocks of {} bytes)",
                    fs.fs_type,
                    pvd.volume_identifier,
                    pvd.volume_space_size,
                    pvd.logical_block_size
                )),
                FilesystemDetails::Udf(lvd) => log.line(format!(
                    "  - {} (volume {})",
                    fs.fs_type, lvd.logical_volume_identifier
                )),
                FilesystemDetails::None {} => log.line(format!("  - {}", fs.fs_type)),
            }
        }
        let size = &structure.size_validation;
        log.field(
            "Size Check",
            format!(
                "{} (expected {}, actual {}, difference {} bytes / {:.2} sectors)",
                if size.size_as_expected { "OK" } else { "MISMATCH" },
                size.size_expected_formatted,
                size.size_actual_formatted,
                size.size_difference_bytes,
                size.size_difference_sectors
            ),
        );
        if let Some(note) = &size.note {
            log.field("Note", note);
        }
    }
    for warning in &structure.warnings {
        log.field("Warning", warning);
    }

    // Finalization
    let finalization = &report.operations_performed.finalization;
    log.section("FINALIZATION");
    for command in &finalization.commands {
        log.field("Command", command);
    }
    log.field("Status", finalization.status.to_uppercase());

    // Host
    let env = &report.system_environment;
    log.section("SYSTEM INFORMATION");
    log.field("Operating System", &env.operating_system);
    log.field("OS Version", &env.os_version);
    log.field("Kernel", &env.kernel_version);
    log.field("Architecture", &env.machine_architecture);
    log.field("Hostname", &env.hostname);
    log.field("Tool Version", format!("{} {}", run.tool_name, run.tool_version));

    // Metadata
    log.section("DETAILED DISK METADATA");
    let rows = disk.display_rows();
    if rows.is_empty() {
        log.line("No disk metadata available");
    }
    for (label, value) in rows {
        log.field(label, value);
    }

    log.line(String::new());
    log.line(rule);
    log.line(format!(
        "Log generated: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    log.finish()
}
