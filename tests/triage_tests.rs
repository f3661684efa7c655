use tempfile::TempDir;

use opfuzz::harnesses::find;
use opfuzz::models::{Limits, Outcome};
use opfuzz::triage::{BugReport, read_report, write_report};
use opfuzz::Error;

#[test]
fn report_survives_disk_roundtrip() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("artifacts").join("matmul");
    let report = BugReport::new("matmul", "matmul while invoking: boom", &[9, 8, 7])
        .with_limits(Limits::default());

    let path = write_report(&nested, &report).unwrap();
    assert!(path.starts_with(&nested));
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), report.file_name());

    let loaded = read_report(&path).unwrap();
    assert_eq!(loaded, report);
    assert!(loaded.fingerprint.starts_with("crc32c:0x"));
}

#[test]
fn same_input_overwrites_report() {
    let dir = TempDir::new().unwrap();
    let first = BugReport::new("softmax", "first", &[1, 2]);
    let second = BugReport::new("softmax", "second", &[1, 2]);
    let a = write_report(dir.path(), &first).unwrap();
    let b = write_report(dir.path(), &second).unwrap();
    assert_eq!(a, b);
    assert_eq!(read_report(&b).unwrap().message, "second");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn replaying_a_report_input_is_deterministic() {
    let entry = find("reshape").unwrap();
    let report = BugReport::new(entry.name, "replay", &[0, 1, 3, 0, 0, 0, 0, 0, 0, 0, 1, 2]);
    let first = (entry.run)(&report.input);
    let second = (entry.run)(&report.input);
    assert_eq!(first, second);
    assert_ne!(first, Outcome::BugFound(String::new()));
}

#[test]
fn missing_report_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = read_report(&dir.path().join("crash-none.cbor")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn corrupt_report_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crash-bad.cbor");
    std::fs::write(&path, b"not cbor at all").unwrap();
    assert!(matches!(read_report(&path), Err(Error::CborDeserialize(_))));
}
