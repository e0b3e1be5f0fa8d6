use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_LENGTH: usize = 64 * 1024; // 64KB

/// BLAKE3 digest of a file's bytes. Names and timestamps play no part.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0.to_hex())
    }
}

/// Stream a file through BLAKE3 in fixed-size chunks.
pub fn fingerprint_file(file: &Path) -> io::Result<Fingerprint> {
    let f = File::open(file)?;
    fingerprint_reader(f)
}

pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; CHUNK_LENGTH];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(Fingerprint(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_identical_content_same_fingerprint() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("renamed.jpeg");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn test_different_content_different_fingerprint() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"content a").unwrap();
        fs::write(&b, b"content b").unwrap();

        assert_ne!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn test_chunked_read_matches_one_shot_digest() {
        // Spans several chunks with a ragged tail.
        let data: Vec<u8> = (0..(CHUNK_LENGTH * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = fingerprint_reader(&data[..]).unwrap();
        assert_eq!(streamed.as_bytes(), blake3::hash(&data).as_bytes());
    }

    #[test]
    fn test_display_is_hex() {
        let fp = fingerprint_reader(&b""[..]).unwrap();
        let text = fp.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
