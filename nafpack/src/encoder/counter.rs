use std::io::Error as IoError;
use std::io::Write;

/// A wrapper counting the number of bytes written through a writer.
///
/// Each section compressor is wrapped in one of these so that the
/// uncompressed section size is known when the container is emitted.
#[derive(Debug, Clone)]
pub struct WriteCounter<W: Write> {
    w: W,
    n: u64,
}

impl<W: Write> WriteCounter<W> {
    pub fn new(w: W) -> Self {
        Self { w, n: 0 }
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

impl<W: Write> Write for WriteCounter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        match self.w.write(buf) {
            Err(e) => Err(e),
            Ok(n) => {
                self.n += n as u64;
                Ok(n)
            }
        }
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count() {
        let mut counter = WriteCounter::new(Vec::new());
        counter.write_all(b"nucleotide").unwrap();
        counter.write_all(b"\0").unwrap();
        assert_eq!(counter.len(), 11);
        assert_eq!(counter.into_inner(), b"nucleotide\0");
    }
}
