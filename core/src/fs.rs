//! Local byte storage used as the intermediate buffer between a fetch and
//! its consumer.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_io::{ErrorKind, ErrorType, Write};

pub trait Storage: ErrorType {
    type Writer<'a>: Write<Error = Self::Error>
    where
        Self: 'a;

    /// Creates `name`, truncating any previous contents.
    fn create(&mut self, name: &str) -> Result<Self::Writer<'_>, Self::Error>;
    fn read_all(&mut self, name: &str) -> Result<Vec<u8>, Self::Error>;
}

/// Heap-backed storage for targets without a filesystem.
#[derive(Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }
}

impl ErrorType for MemoryStorage {
    type Error = ErrorKind;
}

pub struct MemoryFile<'a> {
    data: &'a mut Vec<u8>,
}

impl ErrorType for MemoryFile<'_> {
    type Error = ErrorKind;
}

impl Write for MemoryFile<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Storage for MemoryStorage {
    type Writer<'a> = MemoryFile<'a>;

    fn create(&mut self, name: &str) -> Result<MemoryFile<'_>, ErrorKind> {
        let data = self.files.entry(name.into()).or_default();
        data.clear();
        Ok(MemoryFile { data })
    }

    fn read_all(&mut self, name: &str) -> Result<Vec<u8>, ErrorKind> {
        self.files.get(name).cloned().ok_or(ErrorKind::NotFound)
    }
}
