use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How many leading bytes are examined when sniffing a file's real format.
pub const SNIFF_PREFIX_LEN: usize = 512;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const JPEG_MAGIC: [u8; 3] = [0xff, 0xd8, 0xff];

/// The encoded type of an input file as determined from its content,
/// falling back to the declared extension when the content is inconclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Png,
    Jpeg,
    Svg,
    Ico,
    Webp,
    Unknown,
    Error,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Png => "png",
            FileKind::Jpeg => "jpeg",
            FileKind::Svg => "svg",
            FileKind::Ico => "ico",
            FileKind::Webp => "webp",
            FileKind::Unknown => "unknown",
            FileKind::Error => "error",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Map a lowercase extension (no dot) onto a known kind.
pub fn kind_from_extension(extension: &str) -> FileKind {
    match extension.to_lowercase().as_str() {
        "png" => FileKind::Png,
        "jpg" | "jpeg" => FileKind::Jpeg,
        "svg" => FileKind::Svg,
        "ico" => FileKind::Ico,
        "webp" => FileKind::Webp,
        _ => FileKind::Unknown,
    }
}

/// Lowercase extension of a corpus filename, without the dot. Empty when absent.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Determine the real encoded type of a file from its byte content.
///
/// The content check is authoritative: an `.ico` file carrying SVG markup is
/// reported as svg. Checks run in a fixed order: vector markup in the text
/// prefix, PNG magic, JPEG start-of-image, then the declared extension.
pub fn sniff_bytes(bytes: &[u8], extension: &str) -> FileKind {
    let prefix = &bytes[..bytes.len().min(SNIFF_PREFIX_LEN)];
    let text = String::from_utf8_lossy(prefix);
    if text.contains("<?xml") || text.contains("<svg") {
        return FileKind::Svg;
    }
    if bytes.starts_with(&PNG_MAGIC) {
        return FileKind::Png;
    }
    if bytes.starts_with(&JPEG_MAGIC) {
        return FileKind::Jpeg;
    }
    kind_from_extension(extension)
}

/// Sniff a file on disk, reading only the bounded prefix.
/// Never fails: an unreadable file reports `FileKind::Error`.
pub fn sniff_path(path: &Path) -> FileKind {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let mut prefix = [0u8; SNIFF_PREFIX_LEN];
    let read = match File::open(path).and_then(|mut f| f.read(&mut prefix)) {
        Ok(n) => n,
        Err(_) => return FileKind::Error,
    };
    sniff_bytes(&prefix[..read], extension)
}
