//! A bounded window over a shared reader.

use std::io::Error as IoError;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::sync::RwLock;

use crate::Rc;

/// A `Read`-able view of the byte range `start..end` of a shared reader.
///
/// Every archive section gets its own window over the same underlying
/// source; a read repositions the source first, so the windows can be
/// consumed in any order and interleaved. A window that is never read
/// never touches the bytes of its range.
pub struct SectionWindow<R: Read + Seek> {
    reader: Rc<RwLock<R>>,
    pos: u64,
    start: u64,
    end: u64,
}

impl<R: Read + Seek> SectionWindow<R> {
    pub fn new(reader: Rc<RwLock<R>>, start: u64, end: u64) -> Self {
        Self {
            reader,
            start,
            end,
            pos: start,
        }
    }
}

impl<R: Read + Seek> Read for SectionWindow<R> {
    fn read(&mut self, mut buffer: &mut [u8]) -> Result<usize, IoError> {
        let remaining = (self.end - self.pos) as usize;
        if remaining == 0 {
            return Ok(0);
        }
        if buffer.len() > remaining {
            buffer = &mut buffer[..remaining];
        }

        let mut reader = self.reader.write().expect("reader lock should not be poisoned");
        reader.seek(SeekFrom::Start(self.pos))?;
        let n = reader.read(buffer)?;
        self.pos += n as u64;

        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SectionWindow<R> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        let target = match pos {
            SeekFrom::Start(n) => Some(self.start.saturating_add(n)),
            SeekFrom::End(n) => {
                if n >= 0 {
                    Some(self.end)
                } else {
                    self.end.checked_add_signed(n)
                }
            }
            SeekFrom::Current(n) => self.pos.checked_add_signed(n),
        };
        match target {
            Some(n) if n >= self.start => {
                self.pos = n.min(self.end);
                Ok(self.pos - self.start)
            }
            _ => Err(IoError::new(
                std::io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }

    fn rewind(&mut self) -> Result<(), IoError> {
        self.pos = self.start;
        Ok(())
    }

    fn stream_position(&mut self) -> Result<u64, IoError> {
        Ok(self.pos - self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn read() {
        let data = b"ABCDEF";
        let cursor = Cursor::new(&data);
        let f = Rc::new(RwLock::new(cursor));

        let mut s1 = SectionWindow::new(f.clone(), 0, 2);
        let mut s2 = SectionWindow::new(f.clone(), 2, 4);
        let mut s3 = SectionWindow::new(f.clone(), 4, 6);

        assert_eq!(std::io::read_to_string(&mut s2).unwrap(), "CD");
        assert_eq!(std::io::read_to_string(&mut s1).unwrap(), "AB");
        assert_eq!(std::io::read_to_string(&mut s3).unwrap(), "EF");
        assert_eq!(std::io::read_to_string(&mut s2).unwrap(), "");
    }

    #[test]
    fn seek() {
        let data = b"ABCDEF";
        let cursor = Cursor::new(&data);
        let f = Rc::new(RwLock::new(cursor));

        let mut s1 = SectionWindow::new(f.clone(), 0, 2);
        let mut s2 = SectionWindow::new(f.clone(), 2, 4);

        s2.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(std::io::read_to_string(&mut s1).unwrap(), "AB");
        assert_eq!(std::io::read_to_string(&mut s2).unwrap(), "D");

        s2.seek(SeekFrom::End(-2)).unwrap();
        assert_eq!(std::io::read_to_string(&mut s2).unwrap(), "CD");

        s1.rewind().unwrap();
        s1.seek(SeekFrom::Current(1)).unwrap();
        assert_eq!(std::io::read_to_string(&mut s1).unwrap(), "B");

        assert!(s1.seek(SeekFrom::Current(-10)).is_err());
    }
}
