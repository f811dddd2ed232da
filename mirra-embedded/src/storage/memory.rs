use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embedded_io::{ErrorKind, ErrorType, Read, Write};

use super::{FileSystem, OpenMode};
use crate::error::{Error, Result};

type FileData = Rc<RefCell<Vec<u8>>>;

/// RAM backed filesystem.
///
/// Clones share the same files, so a handle kept outside a device survives
/// the device being dropped and rebuilt.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    files: Rc<RefCell<BTreeMap<String, FileData>>>,
    faulty: Rc<Cell<bool>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every open fail until the next format.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.set(faulty);
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|data| data.borrow().clone())
    }

    pub fn write(&self, path: &str, contents: &[u8]) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), Rc::new(RefCell::new(contents.to_vec())));
    }
}

impl FileSystem for MemoryFileSystem {
    type File = MemoryFile;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File> {
        if self.faulty.get() {
            return Err(Error::StorageFault);
        }

        let mut files = self.files.borrow_mut();
        let data = match mode {
            OpenMode::Read => files.get(path).cloned().ok_or(Error::StorageFault)?,
            OpenMode::Append => files.entry(path.to_string()).or_default().clone(),
            OpenMode::Write => {
                let data = FileData::default();
                files.insert(path.to_string(), data.clone());
                data
            }
        };

        let position = match mode {
            OpenMode::Append => data.borrow().len(),
            _ => 0,
        };

        Ok(MemoryFile {
            data,
            position,
            mode,
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn size(&self, path: &str) -> usize {
        self.files
            .borrow()
            .get(path)
            .map(|data| data.borrow().len())
            .unwrap_or(0)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.borrow_mut();
        let data = files.remove(from).ok_or(Error::StorageFault)?;
        files.insert(to.to_string(), data);
        Ok(())
    }

    fn format(&mut self) -> Result<()> {
        self.files.borrow_mut().clear();
        self.faulty.set(false);
        Ok(())
    }
}

pub struct MemoryFile {
    data: FileData,
    position: usize,
    mode: OpenMode,
}

impl ErrorType for MemoryFile {
    type Error = ErrorKind;
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Self::Error> {
        let data = self.data.borrow();
        let available = data.len().saturating_sub(self.position);
        let count = available.min(buf.len());
        buf[..count].copy_from_slice(&data[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Self::Error> {
        if self.mode == OpenMode::Read {
            return Err(ErrorKind::PermissionDenied);
        }

        let mut data = self.data.borrow_mut();
        let end = self.position + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}
