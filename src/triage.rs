//! Bug report artifacts for inputs that ended in `BugFound`.
//!
//! A report is a single CBOR document holding the input bytes, the harness
//! name, the diagnostic text and the limits the harness decoded under, so a
//! crash can be replayed and deduplicated later.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::models::Limits;
use crate::utils::{crc32, fingerprint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub harness: String,
    /// CRC-32C of `input`.
    pub fingerprint: String,
    pub message: String,
    #[serde(with = "serde_bytes_compat")]
    pub input: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
    pub created_unix: u64,
}

/// Stores `input` as a CBOR byte string rather than an array of integers.
mod serde_bytes_compat {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        serde_cbor::value::Value::deserialize(deserializer).and_then(|value| match value {
            serde_cbor::value::Value::Bytes(bytes) => Ok(bytes),
            serde_cbor::value::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_cbor::value::Value::Integer(i) => {
                        u8::try_from(i).map_err(serde::de::Error::custom)
                    }
                    _ => Err(serde::de::Error::custom("expected byte")),
                })
                .collect(),
            _ => Err(serde::de::Error::custom("expected byte string")),
        })
    }
}

impl BugReport {
    pub fn new(harness: &str, message: impl Into<String>, input: &[u8]) -> Self {
        let created_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            harness: harness.to_string(),
            fingerprint: fingerprint(input),
            message: message.into(),
            input: input.to_vec(),
            limits: None,
            created_unix,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// `crash-<harness>-<crc>.cbor`
    pub fn file_name(&self) -> String {
        format!("crash-{}-{:08x}.cbor", self.harness, crc32(&self.input))
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, Error> {
        serde_cbor::to_vec(self).map_err(Error::CborSerialize)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, Error> {
        serde_cbor::from_slice(bytes).map_err(Error::CborDeserialize)
    }
}

/// Writes `report` into `dir` (created if missing) and returns its path.
///
/// The file name only depends on harness and input, so the same crash
/// overwrites its previous report.
pub fn write_report(dir: &Path, report: &BugReport) -> Result<PathBuf, Error> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report.file_name());
    fs::write(&path, report.to_cbor()?)?;
    tracing::info!(path = %path.display(), harness = %report.harness, "wrote bug report");
    Ok(path)
}

pub fn read_report(path: &Path) -> Result<BugReport, Error> {
    let bytes = fs::read(path)?;
    BugReport::from_cbor(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_keeps_every_field() {
        let report = BugReport::new("matmul", "matmul while invoking: boom", &[1, 2, 3])
            .with_limits(Limits::default());
        let decoded = BugReport::from_cbor(&report.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, report);
        assert_eq!(decoded.fingerprint, fingerprint(&[1, 2, 3]));
    }

    #[test]
    fn file_name_is_stable() {
        let a = BugReport::new("softmax", "x", b"123456789");
        let b = BugReport::new("softmax", "y", b"123456789");
        assert_eq!(a.file_name(), "crash-softmax-e3069283.cbor");
        assert_eq!(a.file_name(), b.file_name());
    }

    #[test]
    fn garbage_is_a_deserialize_error() {
        assert!(matches!(BugReport::from_cbor(&[0xff, 0x00]), Err(Error::CborDeserialize(_))));
    }
}
