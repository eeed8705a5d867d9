use super::Backend;
use crate::{Error::InvalidOffset, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// Input file backed by a physical file on disk
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Create a new physical backend
    ///
    /// The file is memory-mapped read-only; the mapping lives as long as the backend.
    ///
    /// ## Arguments
    /// * 'path' - The file path to use
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped
    pub fn new(path: &Path) -> Result<Physical> {
        let file = fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(InvalidOffset {
                offset: offset as u64,
            });
        };

        if offset_end > self.data.len() {
            return Err(InvalidOffset {
                offset: offset as u64,
            });
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
