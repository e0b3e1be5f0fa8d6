use crate::error::FileError;
use crate::media::{self, CaptureTime, MediaFile, MediaKind, TimestampSource, HEADER_LENGTH};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Tags consulted for the capture time, in order of preference.
const CAPTURE_TAGS: [Tag; 2] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// Resolve everything the pipeline needs to know about one file: kind, capture
/// time and content fingerprint.
///
/// Unsupported extensions are rejected before the file is opened. Empty files,
/// unreadable files and files whose header matches no known media signature
/// fail with `ExtractionFailure`. Missing or unparseable capture metadata is not
/// an error; the modification time is used instead.
pub fn extract(path: &Path) -> Result<MediaFile, FileError> {
    let kind = media::media_kind_for(path).ok_or(FileError::UnsupportedType)?;

    let metadata = fs::metadata(path).map_err(|e| extraction_failure("reading metadata", e))?;
    if metadata.len() == 0 {
        return Err(FileError::ExtractionFailure("empty file".to_string()));
    }
    let modified = metadata
        .modified()
        .map_err(|e| extraction_failure("reading modification time", e))?;

    let header = read_header(path).map_err(|e| extraction_failure("reading header", e))?;
    if media::sniff_header(&header).is_none() {
        return Err(FileError::ExtractionFailure(
            "unrecognized or truncated header".to_string(),
        ));
    }

    let captured = resolve_capture_time(path, kind, modified);
    let media = MediaFile::new(path.to_path_buf(), metadata.len(), kind, captured);

    media
        .fingerprint()
        .map_err(|e| extraction_failure("hashing content", e))?;
    trace!("Extracted {} ({})", path.display(), captured.source);
    Ok(media)
}

fn extraction_failure(stage: &str, err: std::io::Error) -> FileError {
    FileError::ExtractionFailure(format!("{}: {}", stage, err))
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let f = File::open(path)?;
    let mut buffer = Vec::with_capacity(HEADER_LENGTH);
    f.take(HEADER_LENGTH as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn resolve_capture_time(path: &Path, kind: MediaKind, modified: SystemTime) -> CaptureTime {
    if kind == MediaKind::Image {
        if let Some(at) = read_exif_timestamp(path) {
            return CaptureTime {
                at,
                source: TimestampSource::Metadata,
            };
        }
    }
    CaptureTime {
        at: DateTime::<Local>::from(modified).naive_local(),
        source: TimestampSource::FilesystemFallback,
    }
}

fn read_exif_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut buffer = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buffer) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No usable EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    CAPTURE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref values) => values.first().and_then(|raw| parse_exif_datetime(raw)),
            _ => None,
        }
    })
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` value into a real calendar date-time.
/// Placeholder values such as `0000:00:00 00:00:00` are rejected.
pub fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
}
