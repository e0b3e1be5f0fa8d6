use crate::hasher::Fingerprint;
use ahash::AHashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    Unique,
    Duplicate(PathBuf),
}

/// Fingerprint → first path seen with that content.
///
/// Entries are never evicted, so memory grows with the number of distinct
/// files (one digest and one path each), not with their size. Which copy is
/// canonical depends only on registration order.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    canonical: AHashMap<Fingerprint, PathBuf>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_register(&mut self, fingerprint: Fingerprint, path: &Path) -> DuplicateCheck {
        match self.canonical.get(&fingerprint) {
            Some(first) => DuplicateCheck::Duplicate(first.clone()),
            None => {
                self.canonical.insert(fingerprint, path.to_path_buf());
                DuplicateCheck::Unique
            }
        }
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::digest::fingerprint_reader;

    fn fp(data: &[u8]) -> Fingerprint {
        fingerprint_reader(data).unwrap()
    }

    #[test]
    fn test_first_occurrence_is_unique() {
        let mut index = DuplicateIndex::new();
        assert_eq!(
            index.check_and_register(fp(b"one"), Path::new("/lib/a.jpg")),
            DuplicateCheck::Unique
        );
        assert_eq!(
            index.check_and_register(fp(b"two"), Path::new("/lib/b.jpg")),
            DuplicateCheck::Unique
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_repeats_reference_first_path() {
        let mut index = DuplicateIndex::new();
        index.check_and_register(fp(b"same"), Path::new("/lib/a.jpg"));

        for later in ["/lib/b.jpg", "/lib/c.jpeg"] {
            assert_eq!(
                index.check_and_register(fp(b"same"), Path::new(later)),
                DuplicateCheck::Duplicate(PathBuf::from("/lib/a.jpg"))
            );
        }
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_index() {
        let index = DuplicateIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
