mod datalog;
mod memory;

pub use datalog::*;
pub use memory::*;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Creates the file if missing and writes at its end
    Append,
    /// Creates or truncates the file
    Write,
}

/// Flat flash filesystem.
pub trait FileSystem {
    type File: embedded_io::Read + embedded_io::Write;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File>;

    fn exists(&self, path: &str) -> bool;

    /// Size in bytes, zero for missing files
    fn size(&self, path: &str) -> usize;

    fn remove(&mut self, path: &str) -> Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Erases every file.
    fn format(&mut self) -> Result<()>;
}
