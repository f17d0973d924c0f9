// In-memory File System Service for the EMOS simulator
//
// A flat name -> bytes store. No directories, no locking, nothing survives the
// process.
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// File System Service - Handles file operations
#[derive(Debug, Clone, Default)]
pub struct FileSystemService {
    files: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSystemError {
    FileNotFound,
    InvalidName,
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileSystemError::FileNotFound => write!(f, "No such file"),
            FileSystemError::InvalidName => write!(f, "Invalid file name"),
        }
    }
}

impl std::error::Error for FileSystemError {}

impl FileSystemService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file; returns true when an existing file was replaced
    pub fn create_file(&mut self, name: &str, data: &[u8]) -> Result<bool, FileSystemError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(FileSystemError::InvalidName);
        }

        let entry = FileEntry {
            name: String::from(name),
            data: data.to_vec(),
        };
        let replaced = self.files.insert(entry.name.clone(), entry).is_some();

        if replaced {
            log::info!("[FS] File '{}' already existed, overwritten ({} bytes)", name, data.len());
        } else {
            log::info!("[FS] Created file '{}' ({} bytes)", name, data.len());
        }
        Ok(replaced)
    }

    /// Read the contents of a file
    pub fn read_file(&self, name: &str) -> Result<&[u8], FileSystemError> {
        let entry = self.files.get(name).ok_or(FileSystemError::FileNotFound)?;
        log::debug!("[FS] Read file '{}' ({} bytes)", name, entry.size());
        Ok(&entry.data)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<(), FileSystemError> {
        self.files.remove(name).ok_or(FileSystemError::FileNotFound)?;
        log::info!("[FS] Deleted file '{}'", name);
        Ok(())
    }

    /// List all files in name order
    pub fn list_files(&self) -> Vec<&FileEntry> {
        self.files.values().collect()
    }
}
