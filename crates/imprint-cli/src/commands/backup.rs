//! Backup command - images one optical disc
//!
//! This is the main functionality of Imprint. It handles:
//! - Picking the disc and naming the output
//! - Listing the disc's directory tree
//! - Unmounting and copying with progress and inline digests
//! - Structural analysis of the finished image
//! - Remounting and ejecting the disc
//! - Writing the human log and the JSON manifest

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::PathBuf;
use std::sync::Arc;

use imprint_core::report::{format_bytes, format_duration, speed_mb_s};
use imprint_core::{
    CancelToken, DiskMetadata, EnvironmentInfo, Error, ImagingSession, IsolyzerValidator,
    Operation, OperationStatus, RunConfig, RunOutcome, Settings, TransferSpec, UNKNOWN,
};
use imprint_platform::{
    commands, device_path, eject_disk, has_elevated_privileges, mount_disk, open_source,
    raw_device_path, unmount_disk, write_tree_listing,
};

use crate::progress::{CopyView, spinner};

/// Arguments for the backup command
pub struct BackupArgs {
    pub disk: Option<String>,
    pub filename: Option<String>,
    pub directory: Option<PathBuf>,
    pub operator: Option<String>,
    pub dry_run: bool,
    pub no_verification: bool,
    pub no_analysis: bool,
    pub validator: Option<String>,
    pub assume_yes: bool,
    pub cancel: CancelToken,
    pub silent: bool,
}

/// Execute the backup command, returning the process exit status
pub fn execute(args: BackupArgs, settings: &Settings) -> Result<i32> {
    let silent = args.silent;

    // Step 0: raw device access needs root
    if !args.dry_run && !has_elevated_privileges() {
        return Err(Error::PrivilegeRequired(
            "reading the raw disc device needs root. Try running with: sudo imprint backup ..."
                .to_string(),
        )
        .into());
    }

    // Step 1: pick the disc
    let disk_id = match args.disk {
        Some(disk) => normalize_disk_id(&disk),
        None => {
            match imprint_detect::list_disks_text() {
                Ok(listing) => println_if!(silent, "{}", listing.trim_end()),
                Err(e) => eprintln!("{} {}", style("Warning:").yellow(), e),
            }
            normalize_disk_id(&prompt("Disk identifier (e.g. disk4)", silent)?)
        }
    };

    let disk = match imprint_detect::disk_properties(&disk_id) {
        Ok(properties) => DiskMetadata::from_properties(properties),
        Err(e) => {
            tracing::warn!("Could not read disk information for {}: {}", disk_id, e);
            DiskMetadata::default()
        }
    };
    let volume_name = disk.volume_name().unwrap_or(UNKNOWN).to_string();

    println_if!(
        silent,
        "\n{} {}",
        style("Disc:").bold(),
        style(&disk_id).cyan()
    );
    println_if!(
        silent,
        "  {} {}",
        style("✓").green(),
        super::list::describe(&disk)
    );

    // Step 2: name the output
    let filename = match args.filename {
        Some(filename) => filename,
        None => prompt("Image filename (without extension)", silent)?,
    };
    let directory = match args.directory.or_else(|| settings.output.directory.clone()) {
        Some(directory) => directory,
        None => PathBuf::from(prompt("Output directory", silent)?),
    };
    let operator = match args.operator.or_else(|| settings.output.operator.clone()) {
        Some(operator) => operator,
        None => prompt("Operator name or initials", silent)?,
    };

    let config = RunConfig::new(&disk_id, filename.trim(), operator.trim(), directory)
        .volume_name(volume_name)
        .device_paths(device_path(&disk_id), raw_device_path(&disk_id))
        .dry_run(args.dry_run)
        .no_verification(args.no_verification)
        .analysis(settings.analysis.enabled && !args.no_analysis)
        .validator_command(
            args.validator
                .unwrap_or_else(|| settings.analysis.command.clone()),
        );
    let mut session = ImagingSession::new(config)?;

    if args.dry_run {
        println_if!(
            silent,
            "\n{}",
            style("Dry run: the disc will not be unmounted, copied or analyzed.").yellow()
        );
    }

    // Step 3: refuse to clobber an existing image unless confirmed
    let assume_yes = args.assume_yes;
    session.prepare(|image| {
        if assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite it?", image.display()))
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    println_if!(
        silent,
        "  {} Output directory: {}",
        style("✓").green(),
        session.config().output_dir().display()
    );

    // Step 4: directory tree of the mounted volume
    list_tree(&mut session, &disk, silent);

    // Step 5: unmount
    unmount(&mut session, silent);

    // Step 6: copy
    let copy_result = copy(&mut session, &disk, args.cancel, silent);
    match &copy_result {
        Ok(()) => print_transfer_summary(&session, silent),
        Err(e) => eprintln!("{} {}", style("Error:").red().bold(), e),
    }

    // Step 7: structural analysis
    let declared_size = match disk.total_size() {
        0 => session.transfer().map_or(0, |t| t.bytes_written),
        size => size,
    };
    analyze(&mut session, declared_size, silent);

    // Step 8: give the disc back, unless the operator aborted the copy
    if matches!(copy_result, Err(Error::Interrupted { .. })) {
        skip_finalization(&mut session);
    } else {
        finalize(&mut session, silent);
    }

    // Step 9: log and manifest
    let environment = EnvironmentInfo::detect();
    let outcome = session
        .publish(&disk, &environment)
        .context("Failed to write the run report")?;
    print_outcome(&outcome, session.config().dry_run, silent);

    Ok(run_exit_code(&copy_result, &outcome))
}

/// A copy error decides the exit status; otherwise the published outcome does
fn run_exit_code(copy_result: &imprint_core::Result<()>, outcome: &RunOutcome) -> i32 {
    match copy_result {
        Err(e) => e.exit_code(),
        Ok(()) => outcome.exit_code,
    }
}

/// Accept `disk4` as well as `/dev/disk4`
fn normalize_disk_id(input: &str) -> String {
    let trimmed = input.trim();
    trimmed.strip_prefix("/dev/").unwrap_or(trimmed).to_string()
}

fn prompt(label: &str, silent: bool) -> Result<String> {
    if silent {
        bail!("{} is required when running with --silent", label);
    }
    let value: String = Input::new()
        .with_prompt(label)
        .interact_text()
        .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
    if value.trim().is_empty() {
        bail!("{} must not be empty", label);
    }
    Ok(value.trim().to_string())
}

fn list_tree(session: &mut ImagingSession, disk: &DiskMetadata, silent: bool) {
    let mount_point = disk
        .mount_point()
        .map(PathBuf::from)
        .unwrap_or_else(|| session.config().volume_mount_point());
    let command = commands::display(&commands::tree(&mount_point));
    let destination = session.config().tree_path();

    println_if!(silent, "\n{}", style("Listing directory tree...").bold());
    match write_tree_listing(&mount_point, &destination) {
        Ok(()) => {
            session.record(
                Operation::TreeListing,
                vec![command],
                OperationStatus::Success,
                None,
            );
            println_if!(
                silent,
                "  {} Saved to {}",
                style("✓").green(),
                destination.display()
            );
        }
        Err(e) => {
            tracing::warn!("Tree listing failed: {}", e);
            session.record(
                Operation::TreeListing,
                vec![command],
                OperationStatus::Failed,
                Some(e.to_string()),
            );
            println_if!(silent, "  {} Tree listing: {}", style("⚠").yellow(), e);
        }
    }
}

fn unmount(session: &mut ImagingSession, silent: bool) {
    let device = session.config().device_path.clone();
    let command = commands::display(&commands::unmount(&device));

    if session.config().dry_run {
        session.record(
            Operation::DiskUnmount,
            vec![command],
            OperationStatus::Skipped,
            Some("dry run".to_string()),
        );
        return;
    }

    println_if!(silent, "\n{}", style("Unmounting disc...").bold());
    match unmount_disk(&device) {
        Ok(()) => {
            session.record(
                Operation::DiskUnmount,
                vec![command],
                OperationStatus::Success,
                None,
            );
            println_if!(silent, "  {} Disc unmounted", style("✓").green());
        }
        Err(e) => {
            // Not fatal: a disc that is still busy fails when opened
            tracing::warn!("Unmount failed: {}", e);
            session.record(
                Operation::DiskUnmount,
                vec![command],
                OperationStatus::Failed,
                Some(e.to_string()),
            );
            println_if!(silent, "  {} Unmount: {}", style("ℹ").blue(), e);
        }
    }
}

fn copy(
    session: &mut ImagingSession,
    disk: &DiskMetadata,
    cancel: CancelToken,
    silent: bool,
) -> imprint_core::Result<()> {
    if session.config().dry_run {
        return session.copy(std::io::empty(), disk.total_size(), |_| {}, cancel);
    }

    println_if!(silent, "\n{}", style("Creating image...").bold());
    let raw_path = session.config().raw_device_path.clone();
    let source = match open_source(&raw_path) {
        Ok(source) => source,
        Err(e) => {
            let command =
                TransferSpec::from_config(session.config(), disk.total_size()).dd_command();
            session.record(
                Operation::ImageCreation,
                vec![command],
                OperationStatus::Failed,
                Some(e.to_string()),
            );
            return Err(Error::SourceUnavailable {
                path: PathBuf::from(&raw_path),
                source: std::io::Error::other(e.to_string()),
            });
        }
    };

    let total_size = match disk.total_size() {
        0 => source.size(),
        size => size,
    };

    let view = Arc::new(CopyView::new("Imaging", silent));
    session.copy(source, total_size, move |p| view.update(p), cancel)
}

fn print_transfer_summary(session: &ImagingSession, silent: bool) {
    let Some(transfer) = session.transfer() else {
        return;
    };

    println_if!(
        silent,
        "  {} Wrote {} in {} ({:.2} MB/s)",
        style("✓").green(),
        format_bytes(transfer.bytes_written),
        format_duration(transfer.elapsed_seconds),
        speed_mb_s(transfer.bytes_written, transfer.elapsed_seconds)
    );

    if session.config().no_verification {
        println_if!(
            silent,
            "  {} Verification not performed (--no-verification)",
            style("ℹ").blue()
        );
        return;
    }

    match (transfer.digests_match(), &transfer.digest_a) {
        (Some(true), Some(digest)) => println_if!(
            silent,
            "  {} MD5 verified during creation: {}",
            style("✓").green(),
            digest
        ),
        (Some(false), _) => eprintln!(
            "  {} MD5 digests differ between image and source stream",
            style("⚠").yellow().bold()
        ),
        _ => {}
    }
}

fn analyze(session: &mut ImagingSession, declared_size: u64, silent: bool) {
    let will_run = session.config().analysis_enabled
        && session.transfer().is_some_and(|t| t.success);
    let validator = IsolyzerValidator::new(session.config().validator_command.clone());

    if !will_run {
        session.analyze(validator, declared_size);
        return;
    }

    println_if!(silent, "\n{}", style("Analyzing image structure...").bold());
    let pb = spinner("Running structural validator", silent);
    let analysis = session.analyze(validator, declared_size);
    pb.finish_and_clear();

    if let Some(failure) = &analysis.failure {
        eprintln!(
            "  {} Structural analysis {}: {}",
            style("⚠").yellow(),
            failure.kind.as_str(),
            failure.message
        );
        return;
    }

    let filesystems: Vec<&str> = analysis
        .filesystems
        .iter()
        .map(|fs| fs.fs_type.as_str())
        .collect();
    println_if!(
        silent,
        "  {} Structure {} ({})",
        style("✓").green(),
        analysis.verdict(),
        if filesystems.is_empty() {
            "no known filesystem".to_string()
        } else {
            filesystems.join(", ")
        }
    );
    for warning in &analysis.warnings {
        println_if!(silent, "  {} {}", style("⚠").yellow(), warning);
    }
}

/// Normal runs remount and eject; a dry run only mounts a disc that is not mounted
fn finalize(session: &mut ImagingSession, silent: bool) {
    let device = session.config().device_path.clone();
    let mount_command = commands::display(&commands::mount(&device));

    if session.config().dry_run {
        let disk_id = session.config().disk_id.clone();
        match imprint_detect::is_mounted(&disk_id) {
            Ok(true) => session.record(
                Operation::Finalization,
                vec![],
                OperationStatus::Skipped,
                Some("already mounted; dry run does not eject".to_string()),
            ),
            Ok(false) => {
                let (status, detail) = match mount_disk(&device) {
                    Ok(()) => (
                        OperationStatus::Success,
                        "mounted; dry run does not eject".to_string(),
                    ),
                    Err(e) => (OperationStatus::Failed, e.to_string()),
                };
                session.record(
                    Operation::Finalization,
                    vec![mount_command],
                    status,
                    Some(detail),
                );
            }
            Err(e) => session.record(
                Operation::Finalization,
                vec![],
                OperationStatus::Skipped,
                Some(format!("mount state unknown: {e}")),
            ),
        }
        return;
    }

    println_if!(silent, "\n{}", style("Remounting and ejecting disc...").bold());
    let commands = vec![
        mount_command,
        commands::display(&commands::eject(&device)),
    ];
    match mount_disk(&device).and_then(|()| eject_disk(&device)) {
        Ok(()) => {
            session.record(
                Operation::Finalization,
                commands,
                OperationStatus::Success,
                None,
            );
            println_if!(silent, "  {} Disc ejected", style("✓").green());
        }
        Err(e) => {
            tracing::warn!("Finalization failed: {}", e);
            session.record(
                Operation::Finalization,
                commands,
                OperationStatus::Failed,
                Some(e.to_string()),
            );
            println_if!(silent, "  {} {}", style("⚠").yellow(), e);
        }
    }
}

/// An aborted run leaves the disc where it is: no remount, no eject
fn skip_finalization(session: &mut ImagingSession) {
    tracing::info!("Copy interrupted, leaving the disc unmounted");
    session.record(
        Operation::Finalization,
        vec![],
        OperationStatus::Skipped,
        Some("interrupted; disc not remounted or ejected".to_string()),
    );
}

fn print_outcome(outcome: &RunOutcome, dry_run: bool, silent: bool) {
    println_if!(silent);
    println_if!(
        silent,
        "  {} {}",
        style("Log:").dim(),
        outcome.log_path.display()
    );
    println_if!(
        silent,
        "  {} {}",
        style("Manifest:").dim(),
        outcome.manifest_path.display()
    );
    println_if!(silent);

    let message = if dry_run {
        style("✓ Dry run complete. No image was created.").green().bold()
    } else if outcome.exit_code == imprint_core::exit_code::INTEGRITY_MISMATCH {
        style("⚠ Image created, but the integrity digests disagree.")
            .yellow()
            .bold()
    } else if outcome.exit_code == imprint_core::exit_code::SUCCESS {
        style("✓ Imaging complete. The disc can be removed.")
            .green()
            .bold()
    } else {
        style("✗ Imaging failed. See the log for details.").red().bold()
    };
    println_if!(silent, "{}", message);
}
