use std::fs::{self, File};
use std::path::{Path, PathBuf};

use embedded_io::{ErrorType, Write};
use zxart_core::fs::Storage;

use crate::io::IoError;

/// Stores each named buffer as a file under one cache directory.
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, IoError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ErrorType for DirStorage {
    type Error = IoError;
}

impl Storage for DirStorage {
    type Writer<'a>
        = FileWriter
    where
        Self: 'a;

    fn create(&mut self, name: &str) -> Result<FileWriter, IoError> {
        Ok(FileWriter {
            file: File::create(self.path(name))?,
        })
    }

    fn read_all(&mut self, name: &str) -> Result<Vec<u8>, IoError> {
        Ok(fs::read(self.path(name))?)
    }
}

pub struct FileWriter {
    file: File,
}

impl ErrorType for FileWriter {
    type Error = IoError;
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        Ok(std::io::Write::write(&mut self.file, buf)?)
    }

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(std::io::Write::flush(&mut self.file)?)
    }
}
