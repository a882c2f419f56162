//! Backing stores for compressed sections during encoding.
//!
//! The container format prefixes every section with its compressed size,
//! so the encoder has to hold each finished zstd stream somewhere until
//! all sections are complete. Small datasets can keep them in [`Memory`];
//! large ones should spill to disk through [`tempfile::TempDir`] or a
//! [`SpillDir`] with named, optionally kept temporary files.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Error as IoError;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::error::Error;

/// The section names used for temporary files, in container order.
pub(crate) const SECTION_KINDS: [&str; 6] =
    ["ids", "comments", "lengths", "mask", "sequence", "quality"];

/// A marker type for in-memory storage.
#[derive(Debug, Default, Clone)]
pub struct Memory;

/// An abstract interface for temporary section storage.
pub trait Storage: Sized {
    /// The concrete type to which to write temporary data.
    type Buffer: Write;
    /// Create a new buffer for the section named `kind`.
    fn create_buffer(&self, kind: &str) -> Result<Self::Buffer, IoError>;
    /// Write the contents of the buffer to the given writer.
    fn write_buffer<W: Write>(&self, buffer: Self::Buffer, file: &mut W) -> Result<(), IoError>;
    /// Get the total length of the buffer content.
    fn buffer_length(&self, buffer: &Self::Buffer) -> Result<u64, IoError>;
    /// Close the temporary storage.
    fn close(self) -> Result<(), IoError> {
        Ok(())
    }
}

impl Storage for Memory {
    type Buffer = Vec<u8>;
    fn create_buffer(&self, _kind: &str) -> Result<Self::Buffer, IoError> {
        Ok(Vec::new())
    }
    fn buffer_length(&self, buffer: &Self::Buffer) -> Result<u64, IoError> {
        Ok(buffer.len() as u64)
    }
    fn write_buffer<W: Write>(&self, buffer: Self::Buffer, file: &mut W) -> Result<(), IoError> {
        file.write_all(buffer.as_slice())
    }
}

#[cfg(feature = "tempfile")]
impl Storage for tempfile::TempDir {
    type Buffer = File;
    fn create_buffer(&self, _kind: &str) -> Result<Self::Buffer, IoError> {
        tempfile::tempfile_in(self.path())
    }
    fn buffer_length(&self, buffer: &Self::Buffer) -> Result<u64, IoError> {
        buffer.sync_all()?;
        Ok(buffer.metadata()?.len())
    }
    fn write_buffer<W: Write>(
        &self,
        mut buffer: Self::Buffer,
        file: &mut W,
    ) -> Result<(), IoError> {
        buffer.seek(SeekFrom::Start(0))?;
        std::io::copy(&mut buffer, file)?;
        Ok(())
    }
    fn close(self) -> Result<(), IoError> {
        tempfile::TempDir::close(self)
    }
}

/// Spill storage using named `<prefix>.<section>` files in a directory.
///
/// Unlike [`tempfile::TempDir`], the directory is caller-owned and
/// outlives the encoding; only the section files are removed, and even
/// they can be kept for inspection with [`SpillDir::keep_files`].
#[derive(Debug, Clone)]
pub struct SpillDir {
    dir: PathBuf,
    prefix: String,
    keep: bool,
}

impl SpillDir {
    /// Create a spill storage writing `prefix.<section>` files under `dir`.
    ///
    /// The prefix must be usable in a file name on every platform, so
    /// `\ / : * ? " < > |` and control bytes are rejected.
    pub fn new<P: AsRef<Path>, S: Into<String>>(dir: P, prefix: S) -> Result<Self, Error> {
        let prefix = prefix.into();
        if prefix.bytes().any(|c| c < 0x20 || br#"\/:*?"<>|"#.contains(&c)) {
            return Err(Error::InvalidConfig(
                "temporary file prefix contains characters unsafe in file names",
            ));
        }
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            prefix,
            keep: false,
        })
    }

    /// Keep the section files on close instead of removing them.
    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    fn file_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.prefix, kind))
    }
}

impl Storage for SpillDir {
    type Buffer = File;
    fn create_buffer(&self, kind: &str) -> Result<Self::Buffer, IoError> {
        let path = self.file_path(kind);
        log::debug!("creating temporary {} file {:?}", kind, path);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }
    fn buffer_length(&self, buffer: &Self::Buffer) -> Result<u64, IoError> {
        buffer.sync_all()?;
        Ok(buffer.metadata()?.len())
    }
    fn write_buffer<W: Write>(
        &self,
        mut buffer: Self::Buffer,
        file: &mut W,
    ) -> Result<(), IoError> {
        buffer.seek(SeekFrom::Start(0))?;
        std::io::copy(&mut buffer, file)?;
        Ok(())
    }
    fn close(self) -> Result<(), IoError> {
        if self.keep {
            return Ok(());
        }
        for kind in SECTION_KINDS {
            match std::fs::remove_file(self.file_path(kind)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Drop for SpillDir {
    fn drop(&mut self) {
        // removal on abandoned encodings; a completed close already
        // deleted the files and the misses are ignored
        if !self.keep {
            for kind in SECTION_KINDS {
                let _ = std::fs::remove_file(self.file_path(kind));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_prefix() {
        assert!(SpillDir::new("/tmp", "a/b").is_err());
        assert!(SpillDir::new("/tmp", "a:b").is_err());
        assert!(SpillDir::new("/tmp", "a\x01b").is_err());
        assert!(SpillDir::new("/tmp", "dataset-1").is_ok());
    }
}
