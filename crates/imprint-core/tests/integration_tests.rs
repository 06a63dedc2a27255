//! Integration tests for imprint-core
//!
//! Full runs against in-memory sources and temporary output directories.

use imprint_core::report::VerificationVerdict;
use imprint_core::{
    CancelToken, DiskMetadata, EnvironmentInfo, Error, ImagingSession, IsolyzerValidator,
    Operation, OperationStatus, RunConfig, RunReport, StructuralValidator, exit_code,
};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Validator returning a canned isolyzer report
struct CannedValidator {
    report: String,
}

impl StructuralValidator for CannedValidator {
    fn name(&self) -> String {
        "isolyzer".to_string()
    }

    fn run(&self, _image: &Path) -> imprint_core::Result<String> {
        Ok(self.report.clone())
    }
}

fn canned_report(size: u64) -> String {
    format!(
        r#"<?xml version="1.0" ?>
<isolyzer xmlns="http://kb.nl/ns/isolyzer/v1/">
  <toolInfo><toolName>isolyzer</toolName><toolVersion>1.4.0</toolVersion></toolInfo>
  <image>
    <fileInfo><fileName>photos.iso</fileName><fileSizeInBytes>{size}</fileSizeInBytes></fileInfo>
    <statusInfo><success>True</success></statusInfo>
    <tests>
      <containsKnownFileSystem>True</containsKnownFileSystem>
      <sizeExpected>{size}</sizeExpected>
      <sizeActual>{size}</sizeActual>
      <sizeDifference>0</sizeDifference>
      <sizeDifferenceSectors>0.0</sizeDifferenceSectors>
      <sizeAsExpected>True</sizeAsExpected>
      <smallerThanExpected>False</smallerThanExpected>
    </tests>
    <fileSystems>
      <fileSystem TYPE="ISO 9660">
        <primaryVolumeDescriptor>
          <volumeIdentifier>PHOTOS</volumeIdentifier>
          <logicalBlockSize>2048</logicalBlockSize>
          <volumeSpaceSize>{sectors}</volumeSpaceSize>
        </primaryVolumeDescriptor>
      </fileSystem>
    </fileSystems>
  </image>
</isolyzer>
"#,
        sectors = size / 2048
    )
}

fn disk(size: u64) -> DiskMetadata {
    DiskMetadata::from_properties([
        ("TotalSize", size.to_string()),
        ("OpticalMediaType", "CD-ROM".to_string()),
        ("BusProtocol", "ATAPI".to_string()),
        ("VolumeName", "PHOTOS".to_string()),
    ])
}

fn config(dir: &Path) -> RunConfig {
    RunConfig::new("disk4", "photos", "JD", dir).volume_name("PHOTOS")
}

fn read_manifest(path: &Path) -> RunReport {
    RunReport::from_json(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Reader that fails once `fail_at` bytes have been served
struct FailingReader {
    served: usize,
    fail_at: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served >= self.fail_at {
            return Err(io::Error::other("medium error"));
        }
        let n = buf.len().min(self.fail_at - self.served);
        buf[..n].fill(0x11);
        self.served += n;
        Ok(n)
    }
}

// ============================================================================
// Full runs
// ============================================================================

#[test]
fn test_full_run_produces_every_artifact() {
    let temp = TempDir::new().unwrap();
    let size = 10 * 1024 * 1024 + 2048;
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

    let mut session = ImagingSession::new(config(temp.path())).unwrap();
    session.prepare(|_| true).unwrap();

    let updates = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&updates);
    session
        .copy(
            Cursor::new(data.clone()),
            size as u64,
            move |p| {
                counter.fetch_add(1, Ordering::SeqCst);
                assert!(p.bytes_done <= p.bytes_total);
            },
            CancelToken::new(),
        )
        .unwrap();
    // Two full 4 MiB blocks and one partial block
    assert_eq!(updates.load(Ordering::SeqCst), 3);

    let analysis = session.analyze(
        CannedValidator {
            report: canned_report(size as u64),
        },
        size as u64,
    );
    assert!(analysis.valid_iso9660());
    assert!(analysis.warnings.is_empty());

    let outcome = session
        .publish(&disk(size as u64), &EnvironmentInfo::detect())
        .unwrap();
    assert_eq!(outcome.exit_code, exit_code::SUCCESS);

    let cfg = session.config();
    assert_eq!(std::fs::read(cfg.image_path()).unwrap(), data);
    assert!(cfg.log_path().exists());
    assert!(cfg.analysis_path().exists());

    let report = read_manifest(&cfg.manifest_path());
    assert_eq!(report.status.overall_status, "success");
    assert_eq!(report.status.verification_passed, VerificationVerdict::Passed);
    assert_eq!(report.integrity_verification.integrity_status, "verified");
    assert_eq!(
        report.integrity_verification.image_hash,
        report.integrity_verification.source_hash
    );
    assert!(report.structural_analysis.valid_iso9660);
    assert_eq!(report.structural_analysis.tool_version, "1.4.0");
    assert_eq!(report.source_disc.media_type, "CD-ROM");
    assert_eq!(report.output_files.image_file_size_bytes, Some(size as u64));

    let log = std::fs::read_to_string(cfg.log_path()).unwrap();
    assert!(log.contains("Status: SUCCESS"));
    assert!(log.contains("Verification: PASS"));
    assert!(log.contains("  - ISO 9660 (volume PHOTOS"));
}

#[test]
fn test_dry_run_writes_reports_only() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path()).dry_run(true)).unwrap();
    session.prepare(|_| true).unwrap();
    session.record(
        Operation::DiskUnmount,
        vec!["diskutil unmountDisk /dev/disk4".to_string()],
        OperationStatus::Skipped,
        Some("dry run".to_string()),
    );
    session
        .copy(Cursor::new(vec![0u8; 64]), 64, |_| {}, CancelToken::new())
        .unwrap();
    session.analyze(IsolyzerValidator::new("/nonexistent/isolyzer"), 64);

    let outcome = session
        .publish(&DiskMetadata::default(), &EnvironmentInfo::detect())
        .unwrap();
    assert_eq!(outcome.exit_code, exit_code::SUCCESS);

    let cfg = session.config();
    assert!(!cfg.image_path().exists());
    assert!(!cfg.analysis_path().exists());

    let report = read_manifest(&outcome.manifest_path);
    assert!(report.run.dry_run);
    assert!(!report.status.image_created);
    assert_eq!(report.integrity_verification.image_hash, None);
    assert_eq!(report.integrity_verification.source_hash, None);
    assert_eq!(report.operations_performed.disk_unmount.status, "skipped");
    assert_eq!(report.structural_analysis.skipped_reason.as_deref(), Some("dry run"));
}

#[test]
fn test_declined_overwrite_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let session = ImagingSession::new(config(temp.path())).unwrap();
    let cfg = session.config().clone();
    std::fs::create_dir_all(cfg.output_dir()).unwrap();
    std::fs::write(cfg.image_path(), b"previous image").unwrap();

    let mut asked = None;
    let err = session
        .prepare(|path| {
            asked = Some(path.to_path_buf());
            false
        })
        .unwrap_err();

    assert!(matches!(err, Error::OverwriteDeclined(_)));
    assert_eq!(asked, Some(cfg.image_path()));
    assert_eq!(std::fs::read(cfg.image_path()).unwrap(), b"previous image");
    assert!(!cfg.log_path().exists());
    assert!(!cfg.manifest_path().exists());
}

#[test]
fn test_missing_validator_does_not_fail_run() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path())).unwrap();
    session.prepare(|_| true).unwrap();
    session
        .copy(Cursor::new(vec![0xEE; 4096]), 4096, |_| {}, CancelToken::new())
        .unwrap();
    session.analyze(
        IsolyzerValidator::new("/nonexistent/bin/isolyzer-missing"),
        4096,
    );

    let outcome = session
        .publish(&disk(4096), &EnvironmentInfo::detect())
        .unwrap();
    assert_eq!(outcome.exit_code, exit_code::SUCCESS);

    let report = read_manifest(&outcome.manifest_path);
    assert_eq!(report.status.overall_status, "success");
    assert_eq!(report.structural_analysis.error_type.as_deref(), Some("not_found"));
    assert!(!report.structural_analysis.analysis_performed);
    assert!(!session.config().analysis_path().exists());
}

#[test]
fn test_read_failure_publishes_failure_report() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path())).unwrap();
    session.prepare(|_| true).unwrap();

    let fail_at = 5 * 1024 * 1024;
    let err = session
        .copy(
            FailingReader { served: 0, fail_at },
            8 * 1024 * 1024,
            |_| {},
            CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::ReadFailure { .. }));
    assert_eq!(err.exit_code(), exit_code::FAILURE);

    let outcome = session
        .publish(&disk(8 * 1024 * 1024), &EnvironmentInfo::detect())
        .unwrap();
    assert_eq!(outcome.exit_code, exit_code::FAILURE);

    // Only the first full block made it to the image
    let image_len = std::fs::metadata(session.config().image_path()).unwrap().len();
    assert_eq!(image_len, 4 * 1024 * 1024);

    let report = read_manifest(&outcome.manifest_path);
    assert_eq!(report.status.overall_status, "failed");
    assert_eq!(report.status.errors.len(), 1);
    assert_eq!(report.integrity_verification.image_hash, None);
    assert_eq!(report.operations_performed.image_creation.status, "failed");
}

#[test]
fn test_no_verification_still_records_digests() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path()).no_verification(true)).unwrap();
    session.prepare(|_| true).unwrap();
    session
        .copy(Cursor::new(vec![1u8; 100]), 100, |_| {}, CancelToken::new())
        .unwrap();

    let outcome = session
        .publish(&disk(100), &EnvironmentInfo::detect())
        .unwrap();
    let report = outcome.report;
    assert!(!report.status.verification_performed);
    assert_eq!(report.status.verification_passed, VerificationVerdict::Skipped);
    assert_eq!(report.integrity_verification.integrity_status, "not_performed");
    assert!(report.integrity_verification.image_hash.is_some());
}

#[test]
fn test_tree_summary_lands_in_manifest() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path()).dry_run(true)).unwrap();
    session.prepare(|_| true).unwrap();
    std::fs::write(
        session.config().tree_path(),
        "/Volumes/PHOTOS\n└── a.jpg\n\n 2.0M used in 4 directories, 17 files\n",
    )
    .unwrap();
    session.record(
        Operation::TreeListing,
        vec!["tree -RapugD --si --du /Volumes/PHOTOS".to_string()],
        OperationStatus::Success,
        None,
    );

    let outcome = session
        .publish(&DiskMetadata::default(), &EnvironmentInfo::detect())
        .unwrap();
    let listing = &outcome.report.operations_performed.tree_listing;
    let summary = listing.summary.as_ref().unwrap();
    assert_eq!(summary.total_directories, 4);
    assert_eq!(summary.total_files, 17);
    assert_eq!(
        listing.command.as_deref(),
        Some("tree -RapugD --si --du /Volumes/PHOTOS")
    );
}

#[test]
fn test_manifest_round_trip_from_disk() {
    let temp = TempDir::new().unwrap();
    let mut session = ImagingSession::new(config(temp.path())).unwrap();
    session.prepare(|_| true).unwrap();
    session
        .copy(Cursor::new(vec![9u8; 2048]), 2048, |_| {}, CancelToken::new())
        .unwrap();
    let outcome = session
        .publish(&disk(2048), &EnvironmentInfo::detect())
        .unwrap();

    let json = std::fs::read_to_string(&outcome.manifest_path).unwrap();
    let parsed = RunReport::from_json(&json).unwrap();
    assert_eq!(parsed, outcome.report);
    assert_eq!(parsed.to_json().unwrap(), json);
}
