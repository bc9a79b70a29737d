use std::path::Path;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Hard client-side cap on avatar uploads: 2 MiB.
pub const MAX_AVATAR_BYTES: u64 = 2 * 1024 * 1024;

pub fn size_ok(len: u64) -> bool {
    len <= MAX_AVATAR_BYTES
}

/// Check the file on disk against the size cap without reading it.
pub fn validate_selection(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    if !size_ok(meta.len()) {
        return Err(anyhow!("File must be less than 2MB"));
    }
    Ok(())
}

/// Read the file and encode it as an inline data URL for the preview.
pub async fn read_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_data_url(&bytes, mime_for_path(path)))
}

pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
