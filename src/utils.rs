//! Small helpers shared by triage and the CLI.

use std::hash::Hasher;

/// CRC-32C of `data`, formatted as `crc32c:0x%08X`.
pub fn fingerprint(data: &[u8]) -> String {
    format!("crc32c:0x{:08X}", crc32(data))
}

#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32c::Crc32cHasher::default();
    hasher.write(data);
    hasher.finish() as u32
}

/// Hex dump of at most `limit` leading bytes, with an ellipsis when truncated.
pub fn hex_preview(data: &[u8], limit: usize) -> String {
    let shown = &data[..data.len().min(limit)];
    let mut out = shown.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ");
    if data.len() > limit {
        out.push_str(&format!(" ... ({} bytes)", data.len()));
    }
    out
}
