//! FASTA/FASTQ parsing for the encoder.
//!
//! The parser comes in two flavors selected by
//! [`FastxReaderBuilder::well_formed`]: a fast path that assumes a strict
//! line layout, and a lenient path that validates every byte against the
//! declared sequence alphabet, discards embedded whitespace, and either
//! replaces unexpected characters (counting them per byte value) or fails
//! when [`FastxReaderBuilder::strict`] is set.

use std::borrow::Cow;
use std::io::BufRead;
use std::path::Path;

pub(crate) mod alphabet;

use crate::data::Record;
use crate::data::SequenceType;
use crate::error::Error;

// --- InputFormat -------------------------------------------------------------

/// The text format of the sequence input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Fasta,
    Fastq,
}

impl InputFormat {
    /// Guess the input format from a file extension, if recognizable.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<InputFormat> {
        let ext = path.as_ref().extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("fa")
            || ext.eq_ignore_ascii_case("fasta")
            || ext.eq_ignore_ascii_case("fna")
        {
            Some(InputFormat::Fasta)
        } else if ext.eq_ignore_ascii_case("fq") || ext.eq_ignore_ascii_case("fastq") {
            Some(InputFormat::Fastq)
        } else {
            None
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Fasta => f.write_str("FASTA"),
            InputFormat::Fastq => f.write_str("FASTQ"),
        }
    }
}

// --- UnexpectedStats ---------------------------------------------------------

/// Per-byte-value tallies of unexpected input characters.
///
/// Only filled by the lenient parser; strict mode fails on the first
/// unexpected character instead.
#[derive(Clone)]
pub struct UnexpectedStats {
    pub id: [u64; 256],
    pub comment: [u64; 256],
    pub sequence: [u64; 256],
    pub quality: [u64; 256],
}

impl UnexpectedStats {
    fn new() -> Self {
        Self {
            id: [0; 256],
            comment: [0; 256],
            sequence: [0; 256],
            quality: [0; 256],
        }
    }

    /// Whether any unexpected character was seen at all.
    pub fn is_empty(&self) -> bool {
        let all = [&self.id, &self.comment, &self.sequence, &self.quality];
        all.iter().all(|counts| counts.iter().all(|&n| n == 0))
    }

    fn report(counts: &[u64; 256], what: &str) {
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return;
        }
        log::warn!("input has {} unexpected {} characters:", total, what);
        for (byte, &n) in counts.iter().enumerate() {
            if n == 0 {
                continue;
            }
            if (0x20..0x7F).contains(&byte) {
                log::warn!("    '{}': {}", byte as u8 as char, n);
            } else {
                log::warn!("    '\\x{:02X}': {}", byte, n);
            }
        }
    }

    /// Write the accumulated statistics to the diagnostic stream.
    pub fn log_report(&self, seq_type: SequenceType) {
        Self::report(&self.id, "id");
        Self::report(&self.comment, "comment");
        Self::report(&self.sequence, seq_type.name());
        Self::report(&self.quality, "quality");
    }
}

impl std::fmt::Debug for UnexpectedStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnexpectedStats")
            .field("id", &self.id.iter().sum::<u64>())
            .field("comment", &self.comment.iter().sum::<u64>())
            .field("sequence", &self.sequence.iter().sum::<u64>())
            .field("quality", &self.quality.iter().sum::<u64>())
            .finish()
    }
}

// --- FastxReaderBuilder ------------------------------------------------------

/// A builder to configure and initialize a [`FastxReader`].
#[derive(Debug, Clone)]
pub struct FastxReaderBuilder {
    sequence_type: SequenceType,
    format: Option<InputFormat>,
    strict: bool,
    well_formed: bool,
}

impl FastxReaderBuilder {
    /// Create a new builder for input of the given sequence type.
    pub fn new(sequence_type: SequenceType) -> Self {
        Self {
            sequence_type,
            format: None,
            strict: false,
            well_formed: false,
        }
    }

    /// Declare the expected input format.
    ///
    /// The format is always detected from the first record marker; a
    /// declared format that disagrees with the detected one makes
    /// [`FastxReaderBuilder::with_reader`] fail instead of proceeding.
    #[inline]
    pub fn format(&mut self, format: InputFormat) -> &mut Self {
        self.format = Some(format);
        self
    }

    /// Fail on the first unexpected input character.
    #[inline]
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Assume well-formed input and skip per-byte validation.
    #[inline]
    pub fn well_formed(&mut self, well_formed: bool) -> &mut Self {
        self.well_formed = well_formed;
        self
    }

    /// Consume the builder to get a reader parsing records from `reader`.
    ///
    /// This skips leading whitespace and peeks the first record marker to
    /// detect the input format, so it may fail with
    /// [`Error::UnknownFormat`] or [`Error::FormatMismatch`] before any
    /// record was requested. Empty input yields a reader that produces no
    /// records.
    pub fn with_reader<R: BufRead>(&self, mut reader: R) -> Result<FastxReader<R>, Error> {
        if self.strict && self.well_formed {
            return Err(Error::InvalidConfig(
                "'well-formed' and 'strict' can't be used together",
            ));
        }

        let mut at_line_start = true;
        let detected = loop {
            let buf = reader.fill_buf()?;
            let c = match buf.first() {
                None => break None,
                Some(&c) => c,
            };
            if alphabet::is_space(c) {
                at_line_start = alphabet::is_eol(c);
                reader.consume(1);
            } else if c == b'>' && at_line_start {
                reader.consume(1);
                break Some(InputFormat::Fasta);
            } else if c == b'@' && at_line_start {
                reader.consume(1);
                break Some(InputFormat::Fastq);
            } else {
                return Err(Error::UnknownFormat);
            }
        };

        let format = match (detected, self.format) {
            (Some(detected), Some(declared)) if detected != declared => {
                return Err(Error::FormatMismatch { declared, detected });
            }
            (Some(detected), _) => detected,
            (None, declared) => declared.unwrap_or(InputFormat::Fasta),
        };

        Ok(FastxReader {
            reader,
            format,
            sequence_type: self.sequence_type,
            strict: self.strict,
            well_formed: self.well_formed,
            eof: detected.is_none(),
            n_records: 0,
            longest_line: 0,
            stats: UnexpectedStats::new(),
            line: Vec::new(),
        })
    }
}

// --- FastxReader -------------------------------------------------------------

/// A streaming FASTA/FASTQ record reader.
///
/// Produced records always carry an id (possibly empty), a comment when
/// the header line had one, a sequence with its length, and, for FASTQ
/// input, a quality string of the same length.
pub struct FastxReader<R: BufRead> {
    reader: R,
    format: InputFormat,
    sequence_type: SequenceType,
    strict: bool,
    well_formed: bool,
    eof: bool,
    n_records: u64,
    longest_line: u64,
    stats: UnexpectedStats,
    line: Vec<u8>,
}

impl<R: BufRead> FastxReader<R> {
    /// The input format detected (or assumed, for empty input).
    #[inline]
    pub fn format(&self) -> InputFormat {
        self.format
    }

    /// The declared sequence type used for validation.
    #[inline]
    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// The byte length of the longest sequence line seen so far.
    #[inline]
    pub fn longest_line(&self) -> u64 {
        self.longest_line
    }

    /// The number of records parsed so far.
    #[inline]
    pub fn n_records(&self) -> u64 {
        self.n_records
    }

    /// The unexpected-character statistics accumulated so far.
    #[inline]
    pub fn stats(&self) -> &UnexpectedStats {
        &self.stats
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, std::io::Error> {
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, std::io::Error> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    /// Read the next line into the scratch buffer, without the line ending.
    /// Returns `false` at end of input.
    fn fill_line(&mut self) -> Result<bool, std::io::Error> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(false);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
        }
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        Ok(true)
    }

    /// Parse the rest of a `>`/`@` header line into id and comment.
    /// The returned flag is `true` when the input ended on this line.
    fn parse_header_line(&mut self) -> Result<(String, Option<String>, bool), Error> {
        let at_eof = !self.fill_line()?;
        let line = std::mem::take(&mut self.line);

        let delimiter = if self.well_formed {
            line.iter().position(|&b| b == b' ')
        } else {
            line.iter().position(|&b| b == b' ' || b == b'\t')
        };
        let (name_bytes, comment_bytes) = match delimiter {
            Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
            None => (&line[..], None),
        };

        let id;
        let comment;
        if self.well_formed {
            id = String::from_utf8(name_bytes.to_vec())?;
            comment = match comment_bytes {
                Some(bytes) => Some(String::from_utf8(bytes.to_vec())?),
                None => None,
            };
        } else {
            let mut buffer = Vec::with_capacity(name_bytes.len());
            self.filter_name(name_bytes, &mut buffer, false)?;
            id = String::from_utf8(buffer).expect("filtered id should be ASCII");
            comment = match comment_bytes {
                Some(bytes) => {
                    let mut buffer = Vec::with_capacity(bytes.len());
                    self.filter_name(bytes, &mut buffer, true)?;
                    Some(String::from_utf8(buffer).expect("filtered comment should be ASCII"))
                }
                None => None,
            };
        }

        self.line = line;
        Ok((id, comment, at_eof))
    }

    fn filter_name(&mut self, bytes: &[u8], out: &mut Vec<u8>, comment: bool) -> Result<(), Error> {
        for &c in bytes {
            if alphabet::is_expected_name(c) {
                out.push(c);
            } else if self.strict {
                return Err(Error::UnexpectedCharacter {
                    byte: c,
                    record: self.n_records + 1,
                });
            } else {
                let counts = if comment {
                    &mut self.stats.comment
                } else {
                    &mut self.stats.id
                };
                counts[c as usize] += 1;
                out.push(alphabet::NAME_REPLACEMENT);
            }
        }
        Ok(())
    }

    /// Append the scratch line to `seq`, validating bytes in lenient mode.
    fn append_sequence_line(&mut self, seq: &mut Vec<u8>) -> Result<(), Error> {
        let line = std::mem::take(&mut self.line);
        if self.well_formed {
            seq.extend_from_slice(&line);
        } else {
            for &c in line.iter() {
                if alphabet::is_space(c) {
                    continue;
                } else if alphabet::is_expected(self.sequence_type, c) {
                    seq.push(c);
                } else if self.strict {
                    return Err(Error::UnexpectedCharacter {
                        byte: c,
                        record: self.n_records + 1,
                    });
                } else {
                    self.stats.sequence[c as usize] += 1;
                    seq.push(alphabet::replacement(self.sequence_type));
                }
            }
        }
        self.line = line;
        Ok(())
    }

    fn next_fasta(&mut self) -> Result<Record<'static>, Error> {
        let (id, comment, at_eof) = self.parse_header_line()?;

        let mut seq = Vec::new();
        if at_eof {
            self.eof = true;
        } else {
            loop {
                match self.peek_byte()? {
                    None => {
                        self.eof = true;
                        break;
                    }
                    Some(b'>') => {
                        self.reader.consume(1);
                        break;
                    }
                    Some(_) => {
                        self.fill_line()?;
                        let before = seq.len();
                        self.append_sequence_line(&mut seq)?;
                        let line_length = (seq.len() - before) as u64;
                        if line_length > self.longest_line {
                            self.longest_line = line_length;
                        }
                    }
                }
            }
        }

        let sequence = String::from_utf8(seq)?;
        Ok(Record {
            id: Some(Cow::Owned(id)),
            comment: comment.map(Cow::Owned),
            length: Some(sequence.len() as u64),
            sequence: Some(Cow::Owned(sequence)),
            quality: None,
        })
    }

    fn next_fastq(&mut self) -> Result<Record<'static>, Error> {
        let (id, comment, at_eof) = self.parse_header_line()?;
        if at_eof || self.peek_byte()?.is_none() {
            return Err(Error::Truncated);
        }

        self.fill_line()?;
        let mut seq = Vec::new();
        self.append_sequence_line(&mut seq)?;
        let read_length = seq.len() as u64;
        if read_length > self.longest_line {
            self.longest_line = read_length;
        }

        self.read_separator_line()?;

        let quality = self.read_quality_line(read_length)?;
        if quality.len() as u64 != read_length {
            return Err(Error::QualityLengthMismatch {
                record: self.n_records + 1,
                sequence: read_length,
                quality: quality.len() as u64,
            });
        }

        // Blank lines before the next record marker, then '@' or EOF.
        if self.well_formed {
            match self.read_byte()? {
                None => self.eof = true,
                Some(b'@') => {}
                Some(_) => return Err(Error::UnknownFormat),
            }
        } else {
            loop {
                match self.read_byte()? {
                    None => {
                        self.eof = true;
                        break;
                    }
                    Some(c) if alphabet::is_eol(c) => continue,
                    Some(b'@') => break,
                    Some(_) => return Err(Error::UnknownFormat),
                }
            }
        }

        let sequence = String::from_utf8(seq)?;
        let quality = String::from_utf8(quality)?;
        Ok(Record {
            id: Some(Cow::Owned(id)),
            comment: comment.map(Cow::Owned),
            length: Some(sequence.len() as u64),
            sequence: Some(Cow::Owned(sequence)),
            quality: Some(Cow::Owned(quality)),
        })
    }

    /// Consume the `+` line between sequence and quality.
    fn read_separator_line(&mut self) -> Result<(), Error> {
        if self.well_formed {
            match self.read_byte()? {
                None => return Err(Error::Truncated),
                Some(b'+') => {}
                Some(_) => return Err(Error::UnknownFormat),
            }
            match self.read_byte()? {
                None => Err(Error::Truncated),
                Some(b'\n') => Ok(()),
                Some(b'\r') => match self.read_byte()? {
                    Some(b'\n') => Ok(()),
                    _ => Err(Error::UnknownFormat),
                },
                Some(_) => Err(Error::UnknownFormat),
            }
        } else {
            let c = loop {
                match self.read_byte()? {
                    None => return Err(Error::Truncated),
                    Some(c) if alphabet::is_eol(c) => continue,
                    Some(c) => break c,
                }
            };
            if c != b'+' {
                return Err(Error::UnknownFormat);
            }
            // Content after the '+' is ignored.
            if !self.fill_line()? {
                return Err(Error::Truncated);
            }
            Ok(())
        }
    }

    fn read_quality_line(&mut self, read_length: u64) -> Result<Vec<u8>, Error> {
        if self.well_formed {
            if self.peek_byte()?.is_none() {
                return Err(Error::Truncated);
            }
            self.fill_line()?;
            return Ok(std::mem::take(&mut self.line));
        }

        // An empty read has an empty quality line, possibly elided.
        if read_length == 0 {
            return Ok(Vec::new());
        }

        let first = loop {
            match self.read_byte()? {
                None => return Err(Error::Truncated),
                Some(c) if alphabet::is_eol(c) => continue,
                Some(c) => break c,
            }
        };
        self.fill_line()?;
        let line = std::mem::take(&mut self.line);

        let mut quality = Vec::with_capacity(line.len() + 1);
        for &c in std::iter::once(&first).chain(line.iter()) {
            if alphabet::is_space(c) {
                continue;
            } else if alphabet::is_expected_quality(c) {
                quality.push(c);
            } else if self.strict {
                return Err(Error::UnexpectedCharacter {
                    byte: c,
                    record: self.n_records + 1,
                });
            } else {
                self.stats.quality[c as usize] += 1;
                quality.push(alphabet::QUALITY_REPLACEMENT);
            }
        }
        self.line = line;
        Ok(quality)
    }
}

impl<R: BufRead> Iterator for FastxReader<R> {
    type Item = Result<Record<'static>, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }
        let result = match self.format {
            InputFormat::Fasta => self.next_fasta(),
            InputFormat::Fastq => self.next_fastq(),
        };
        match result {
            Ok(record) => {
                self.n_records += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.eof = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(input: &'static [u8]) -> FastxReader<&'static [u8]> {
        FastxReaderBuilder::new(SequenceType::Dna)
            .with_reader(input)
            .unwrap()
    }

    #[test]
    fn detect_fasta() {
        let r = reader(b">x\nACGT\n");
        assert_eq!(r.format(), InputFormat::Fasta);
    }

    #[test]
    fn detect_fastq() {
        let r = reader(b"@x\nACGT\n+\n!!!!\n");
        assert_eq!(r.format(), InputFormat::Fastq);
    }

    #[test]
    fn detect_leading_whitespace() {
        let r = reader(b"\n\n  \n>x\nACGT\n");
        assert_eq!(r.format(), InputFormat::Fasta);
    }

    #[test]
    fn detect_marker_not_at_line_start() {
        match FastxReaderBuilder::new(SequenceType::Dna).with_reader(&b"  >x\nACGT\n"[..]) {
            Err(Error::UnknownFormat) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn detect_unknown() {
        match FastxReaderBuilder::new(SequenceType::Dna).with_reader(&b"ACGT\n"[..]) {
            Err(Error::UnknownFormat) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn format_mismatch() {
        let result = FastxReaderBuilder::new(SequenceType::Dna)
            .format(InputFormat::Fastq)
            .with_reader(&b">x\nACGT\n"[..]);
        assert!(matches!(result, Err(Error::FormatMismatch { .. })));
    }

    #[test]
    fn empty_input() {
        let mut r = reader(b"");
        assert!(r.next().is_none());
    }

    #[test]
    fn strict_and_well_formed_conflict() {
        let result = FastxReaderBuilder::new(SequenceType::Dna)
            .strict(true)
            .well_formed(true)
            .with_reader(&b">x\nACGT\n"[..]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
