//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// Suitable for unit tests and for disk trees that never need to outlive
/// the process.
///
/// # Example
///
/// ```rust
/// use bidms_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let offset = backend.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(backend.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    ///
    /// Useful for reopening a tree image captured with [`Self::data`].
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Clears all data from the backend.
    pub fn clear(&mut self) {
        self.data.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset_usize..end].to_vec())
    }

    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;

        if offset > size {
            return Err(StorageError::WritePastEnd { offset, size });
        }

        let start = offset as usize;
        let end = start + new_data.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(new_data);
        Ok(())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.data().is_empty());
    }

    #[test]
    fn memory_append_returns_correct_offset() {
        let mut backend = InMemoryBackend::new();

        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn memory_read_at_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        assert!(matches!(
            backend.read_at(10, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn memory_write_at_overwrites_and_extends() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"abcdef").unwrap();

        backend.write_at(2, b"ZZ").unwrap();
        assert_eq!(backend.data(), b"abZZef");

        backend.write_at(6, b"gh").unwrap();
        assert_eq!(backend.data(), b"abZZefgh");

        backend.write_at(7, b"XYZ").unwrap();
        assert_eq!(backend.data(), b"abZZefgXYZ");
    }

    #[test]
    fn memory_write_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        assert!(matches!(
            backend.write_at(1, b"x"),
            Err(StorageError::WritePastEnd { offset: 1, size: 0 })
        ));
    }

    #[test]
    fn memory_with_data_and_clear() {
        let mut backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert_eq!(backend.read_at(0, 9).unwrap(), b"preloaded");
        backend.clear();
        assert_eq!(backend.size().unwrap(), 0);
    }


    proptest! {
        #[test]
        fn fixed_records_read_back_last_write(
            writes in prop::collection::vec((0usize..8, any::<u8>()), 1..64)
        ) {
            const RECORD: usize = 16;
            let mut backend = InMemoryBackend::new();
            backend.append(&[0u8; RECORD * 8]).unwrap();

            let mut expected = [0u8; 8];
            for (slot, fill) in writes {
                backend.write_at((slot * RECORD) as u64, &[fill; RECORD]).unwrap();
                expected[slot] = fill;
            }

            for (slot, fill) in expected.iter().enumerate() {
                let record = backend.read_at((slot * RECORD) as u64, RECORD).unwrap();
                prop_assert_eq!(record, vec![*fill; RECORD]);
            }
        }
    }
}
