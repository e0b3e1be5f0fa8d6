use crate::hasher::{self, Fingerprint};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Number of leading bytes inspected when checking a file's signature.
pub const HEADER_LENGTH: usize = 512;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "heic", "heif", "webp", "dng", "cr2",
    "nef", "arw", "orf", "rw2",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "3gp", "mts", "m2ts", "wmv", "mpg", "mpeg",
];

const HEIF_BRANDS: &[&[u8]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1", b"avif",
];

const QUICKTIME_ATOMS: &[&[u8]] = &[b"moov", b"mdat", b"wide", b"free", b"skip", b"pnot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Classify a path by extension alone. `None` means the file is not media.
pub fn media_kind_for(path: &Path) -> Option<MediaKind> {
    let ext = path.extension().and_then(OsStr::to_str)?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Match the first bytes of a file against known image and video signatures.
/// Truncated or foreign headers yield `None`.
pub fn sniff_header(header: &[u8]) -> Option<MediaKind> {
    let at = |offset: usize, magic: &[u8]| {
        header
            .get(offset..offset + magic.len())
            .map_or(false, |bytes| bytes == magic)
    };

    if at(0, &[0xFF, 0xD8, 0xFF])
        || at(0, b"\x89PNG\r\n\x1a\n")
        || at(0, b"GIF87a")
        || at(0, b"GIF89a")
        || at(0, b"II*\0")
        || at(0, b"MM\0*")
        || at(0, b"IIRO")
        || at(0, b"IIRS")
        || at(0, b"MMOR")
        || at(0, b"IIU\0")
        || (at(0, b"BM") && header.len() >= 14)
        || (at(0, b"RIFF") && at(8, b"WEBP"))
    {
        return Some(MediaKind::Image);
    }

    if at(4, b"ftyp") {
        let brand = header.get(8..12)?;
        return if HEIF_BRANDS.contains(&brand) {
            Some(MediaKind::Image)
        } else {
            Some(MediaKind::Video)
        };
    }

    if (at(0, b"RIFF") && at(8, b"AVI "))
        || QUICKTIME_ATOMS.iter().any(|atom| at(4, atom))
        || at(0, &[0x1A, 0x45, 0xDF, 0xA3])
        || at(0, &[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11])
        || at(0, &[0x00, 0x00, 0x01, 0xBA])
        || at(0, &[0x00, 0x00, 0x01, 0xB3])
        || (at(0, &[0x47]) && at(188, &[0x47]))
        || (at(4, &[0x47]) && at(196, &[0x47]))
    {
        return Some(MediaKind::Video);
    }

    None
}

/// Where a capture time came from, surfaced in the report for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampSource {
    Metadata,
    FilesystemFallback,
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampSource::Metadata => write!(f, "metadata"),
            TimestampSource::FilesystemFallback => write!(f, "filesystem-fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub at: NaiveDateTime,
    pub source: TimestampSource,
}

/// One candidate file for the current run.
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    size: u64,
    kind: MediaKind,
    captured: CaptureTime,
    fingerprint: OnceLock<Fingerprint>,
}

impl MediaFile {
    pub fn new(
        path: PathBuf,
        size: u64,
        kind: MediaKind,
        captured: CaptureTime,
    ) -> Self {
        Self {
            path,
            size,
            kind,
            captured,
            fingerprint: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_else(|| self.path.as_os_str())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn captured(&self) -> CaptureTime {
        self.captured
    }

    /// Content fingerprint, computed on first use and cached for the run.
    pub fn fingerprint(&self) -> io::Result<Fingerprint> {
        if let Some(fp) = self.fingerprint.get() {
            return Ok(*fp);
        }
        let fp = hasher::fingerprint_file(&self.path)?;
        Ok(*self.fingerprint.get_or_init(|| fp))
    }
}
