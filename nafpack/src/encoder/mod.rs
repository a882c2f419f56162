use std::io::Error as IoError;
use std::io::Write;

mod counter;
pub(crate) mod storage;
mod writer;

use self::counter::WriteCounter;
use self::storage::Memory;
use self::storage::Storage;
use self::writer::MaskWriter;
use self::writer::SequenceWriter;
use crate::data::Flag;
use crate::data::Flags;
use crate::data::FormatVersion;
use crate::data::Header;
use crate::data::Record;
use crate::data::SequenceType;
use crate::error::Error;

/// Write a number in variable-length encoding.
///
/// Base-128, most significant group first, high bit set on every byte
/// except the last. Encodings are always the shortest form; zero is a
/// single `0x00` byte.
pub(crate) fn write_variable_length<W: Write>(mut n: u64, mut w: W) -> Result<(), IoError> {
    let mut buffer = [0u8; 10];
    let mut pos = buffer.len() - 1;
    buffer[pos] = (n & 0x7F) as u8;
    n >>= 7;
    while n > 0 {
        pos -= 1;
        buffer[pos] = 0x80 | (n & 0x7F) as u8;
        n >>= 7;
    }
    w.write_all(&buffer[pos..])
}

/// Write a sequence length into the length table.
///
/// Lengths are split into 32-bit little-endian units; every full
/// `u32::MAX` chunk is written as a continuation, so the remainder unit
/// may be zero.
fn write_length<W: Write>(mut l: u64, mut w: W) -> Result<(), IoError> {
    while l >= u32::MAX as u64 {
        w.write_all(&u32::MAX.to_le_bytes()[..])?;
        l -= u32::MAX as u64;
    }
    let n = l as u32;
    w.write_all(&n.to_le_bytes()[..])
}

/// A builder to configure and initialize an [`Encoder`].
///
/// The sections to store are *opt-in*, except for identifiers and
/// sequences which most archives want: use the provided methods to select
/// the layout, then one of [`EncoderBuilder::with_memory`] or
/// [`EncoderBuilder::with_storage`] to obtain the [`Encoder`].
#[derive(Debug, Clone)]
pub struct EncoderBuilder {
    sequence_type: SequenceType,
    id: bool,
    comment: bool,
    sequence: bool,
    quality: bool,
    mask: bool,
    length: Option<bool>,
    title: Option<String>,
    line_length: u64,
    name_separator: char,
    compression_level: i32,
    window_log: Option<u32>,
}

impl EncoderBuilder {
    /// Create a new encoder builder for archives of the given type.
    pub fn new(sequence_type: SequenceType) -> Self {
        Self {
            sequence_type,
            id: true,
            comment: false,
            sequence: true,
            quality: false,
            mask: true,
            length: None,
            title: None,
            line_length: 60,
            name_separator: ' ',
            compression_level: 1,
            window_log: None,
        }
    }

    /// Create a new encoder builder from the given flags.
    pub fn from_flags<F: Into<Flags>>(sequence_type: SequenceType, flags: F) -> Self {
        let flags = flags.into();
        let mut builder = Self::new(sequence_type);
        builder.id(flags.test(Flag::Id));
        builder.comment(flags.test(Flag::Comment));
        builder.sequence(flags.test(Flag::Sequence));
        builder.quality(flags.test(Flag::Quality));
        builder.mask(flags.test(Flag::Mask));
        if flags.test(Flag::Length) {
            builder.length(true);
        }
        builder
    }

    /// Whether or not to store the record identifiers.
    #[inline]
    pub fn id(&mut self, id: bool) -> &mut Self {
        self.id = id;
        self
    }

    /// Whether or not to store the record comments.
    #[inline]
    pub fn comment(&mut self, comment: bool) -> &mut Self {
        self.comment = comment;
        self
    }

    /// Whether or not to store the record sequences.
    #[inline]
    pub fn sequence(&mut self, sequence: bool) -> &mut Self {
        self.sequence = sequence;
        self
    }

    /// Whether or not to store the record qualities.
    #[inline]
    pub fn quality(&mut self, quality: bool) -> &mut Self {
        self.quality = quality;
        self
    }

    /// Whether or not to store the soft mask.
    ///
    /// The mask section only exists for nucleotide archives; for protein
    /// and text archives this controls whether letter case is preserved
    /// in the sequence section itself (the default) or folded away.
    #[inline]
    pub fn mask(&mut self, mask: bool) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Whether or not to store the length table.
    ///
    /// By default the table is stored whenever sequences or qualities
    /// are, since both are framed by it during decoding.
    #[inline]
    pub fn length(&mut self, length: bool) -> &mut Self {
        self.length = Some(length);
        self
    }

    /// Store the given title in the archive.
    #[inline]
    pub fn title<S: Into<String>>(&mut self, title: S) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// The line length hint stored in the header for FASTA re-wrapping.
    #[inline]
    pub fn line_length(&mut self, line_length: u64) -> &mut Self {
        self.line_length = line_length;
        self
    }

    /// The separator written between identifier and comment, space by default.
    #[inline]
    pub fn name_separator(&mut self, separator: char) -> &mut Self {
        self.name_separator = separator;
        self
    }

    /// The Zstandard compression level used for every section.
    #[inline]
    pub fn compression_level(&mut self, level: i32) -> &mut Self {
        self.compression_level = level;
        self
    }

    /// Use a `2^log` window with long-distance matching for the sequence
    /// section, which helps on large repetitive genomes.
    #[inline]
    pub fn window_log(&mut self, log: u32) -> &mut Self {
        self.window_log = Some(log);
        self
    }

    /// Consume the builder to get an encoder storing sections in memory.
    pub fn with_memory<'z>(&self) -> Result<Encoder<'z, Memory>, Error> {
        self.with_storage(Memory)
    }

    /// Consume the builder to get an encoder spilling sections to `storage`.
    pub fn with_storage<'z, S: Storage>(&self, storage: S) -> Result<Encoder<'z, S>, Error> {
        if !(0x20..=0x7E).contains(&(self.name_separator as u32)) {
            return Err(Error::InvalidConfig(
                "name separator must be a printable ASCII character",
            ));
        }

        let store_mask = self.mask && self.sequence && self.sequence_type.is_nucleotide();
        let store_length = self.length.unwrap_or(self.sequence || self.quality);

        let new_section = |kind: &str| -> Result<WriteCounter<zstd::Encoder<'z, S::Buffer>>, Error> {
            let mut encoder = zstd::Encoder::new(storage.create_buffer(kind)?, self.compression_level)?;
            encoder.include_magicbytes(false)?;
            Ok(WriteCounter::new(encoder))
        };

        let ids = if self.id { Some(new_section("ids")?) } else { None };
        let com = if self.comment {
            Some(new_section("comments")?)
        } else {
            None
        };
        let len = if store_length {
            Some(new_section("lengths")?)
        } else {
            None
        };
        let mask = if store_mask {
            Some(MaskWriter::new(new_section("mask")?))
        } else {
            None
        };
        let seq = if self.sequence {
            let mut encoder =
                zstd::Encoder::new(storage.create_buffer("sequence")?, self.compression_level)?;
            encoder.include_magicbytes(false)?;
            if let Some(log) = self.window_log {
                encoder.long_distance_matching(true)?;
                encoder.window_log(log)?;
            }
            Some(SequenceWriter::new(self.sequence_type, !self.mask, encoder))
        } else {
            None
        };
        let qual = if self.quality {
            Some(new_section("quality")?)
        } else {
            None
        };

        let header = Header {
            format_version: if self.sequence_type == SequenceType::Dna {
                FormatVersion::V1
            } else {
                FormatVersion::V2
            },
            sequence_type: self.sequence_type,
            flags: Flags::new(),
            name_separator: self.name_separator,
            line_length: self.line_length,
            number_of_sequences: 0,
        };

        Ok(Encoder {
            header,
            storage,
            title: self.title.clone(),
            ids,
            com,
            len,
            mask,
            seq,
            qual,
        })
    }
}

/// An encoder for Nucleotide Archive Format files.
///
/// Records are accumulated with [`Encoder::push`]; every enabled section
/// is compressed incrementally into its [`Storage`] buffer, so the peak
/// memory use is independent of the dataset size when a spilling storage
/// is used. [`Encoder::write`] finalizes the six streams and emits the
/// container with all section sizes known up front.
pub struct Encoder<'z, S: Storage> {
    header: Header,
    storage: S,
    title: Option<String>,
    ids: Option<WriteCounter<zstd::Encoder<'z, S::Buffer>>>,
    com: Option<WriteCounter<zstd::Encoder<'z, S::Buffer>>>,
    len: Option<WriteCounter<zstd::Encoder<'z, S::Buffer>>>,
    mask: Option<MaskWriter<WriteCounter<zstd::Encoder<'z, S::Buffer>>>>,
    seq: Option<SequenceWriter<zstd::Encoder<'z, S::Buffer>>>,
    qual: Option<WriteCounter<zstd::Encoder<'z, S::Buffer>>>,
}

impl Encoder<'_, Memory> {
    /// Create a new encoder for the given sequence type using memory buffers.
    ///
    /// This constructor is a shortcut for
    /// `EncoderBuilder::new(sequence_type).with_memory()`; use an
    /// [`EncoderBuilder`] to configure the archive layout.
    pub fn new(sequence_type: SequenceType) -> Result<Self, Error> {
        EncoderBuilder::new(sequence_type).with_memory()
    }
}

impl<S: Storage> Encoder<'_, S> {
    /// The number of records pushed so far.
    pub fn n_sequences(&self) -> u64 {
        self.header.number_of_sequences
    }

    /// Store `title` as the archive title.
    pub fn push_title<T: Into<String>>(&mut self, title: T) {
        self.title = Some(title.into());
    }

    /// Override the line length hint stored in the header.
    ///
    /// Typically set after parsing, from
    /// [`FastxReader::longest_line`](crate::fastx::FastxReader::longest_line).
    pub fn set_line_length(&mut self, line_length: u64) {
        self.header.line_length = line_length;
    }

    /// Add a record to the archive.
    ///
    /// The fields required by the configured layout must all be set,
    /// otherwise this fails with [`Error::MissingField`] and the encoder
    /// state is left inconsistent.
    pub fn push(&mut self, record: &Record<'_>) -> Result<(), Error> {
        if let Some(ids) = self.ids.as_mut() {
            let id = record.id.as_deref().ok_or(Error::MissingField("id"))?;
            ids.write_all(id.as_bytes())?;
            ids.write_all(b"\0")?;
        }

        if let Some(com) = self.com.as_mut() {
            // a missing comment is stored as an empty one
            let comment = record.comment.as_deref().unwrap_or("");
            com.write_all(comment.as_bytes())?;
            com.write_all(b"\0")?;
        }

        let length = record
            .sequence
            .as_deref()
            .map(|s| s.len() as u64)
            .or(record.length);

        if let Some(len) = self.len.as_mut() {
            let l = length.ok_or(Error::MissingField("length"))?;
            write_length(l, len)?;
        }

        if let Some(seq) = self.seq.as_mut() {
            let s = record
                .sequence
                .as_deref()
                .ok_or(Error::MissingField("sequence"))?;
            if let Some(mask) = self.mask.as_mut() {
                mask.extract(s.as_bytes())?;
            }
            match seq.write_all(s.as_bytes()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Err(Error::InvalidSequence);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }

        if let Some(qual) = self.qual.as_mut() {
            let q = record
                .quality
                .as_deref()
                .ok_or(Error::MissingField("quality"))?;
            if let Some(l) = length {
                if q.len() as u64 != l {
                    return Err(Error::InvalidLength);
                }
            }
            qual.write_all(q.as_bytes())?;
        }

        self.header.number_of_sequences += 1;
        Ok(())
    }

    /// Finalize the section streams and write the archive to `file`.
    pub fn write<W: Write>(mut self, mut file: W) -> Result<(), Error> {
        // finalize every section stream, in container order
        let mut sections: Vec<(Flag, u64, S::Buffer)> = Vec::new();
        if let Some(ids) = self.ids.take() {
            let original_size = ids.len();
            let mut buffer = ids.into_inner().finish()?;
            buffer.flush()?;
            sections.push((Flag::Id, original_size, buffer));
        }
        if let Some(com) = self.com.take() {
            let original_size = com.len();
            let mut buffer = com.into_inner().finish()?;
            buffer.flush()?;
            sections.push((Flag::Comment, original_size, buffer));
        }
        if let Some(len) = self.len.take() {
            let original_size = len.len();
            let mut buffer = len.into_inner().finish()?;
            buffer.flush()?;
            sections.push((Flag::Length, original_size, buffer));
        }
        if let Some(mask) = self.mask.take() {
            let counter = mask.finish()?;
            let original_size = counter.len();
            let mut buffer = counter.into_inner().finish()?;
            buffer.flush()?;
            sections.push((Flag::Mask, original_size, buffer));
        }
        if let Some(seq) = self.seq.take() {
            let original_size = seq.length();
            let mut buffer = seq.into_inner()?.finish()?;
            buffer.flush()?;
            sections.push((Flag::Sequence, original_size, buffer));
        }
        if let Some(qual) = self.qual.take() {
            let original_size = qual.len();
            let mut buffer = qual.into_inner().finish()?;
            buffer.flush()?;
            sections.push((Flag::Quality, original_size, buffer));
        }

        let mut flags = Flags::new();
        for (flag, _, _) in sections.iter() {
            flags.set(*flag);
        }
        if self.title.is_some() {
            flags.set(Flag::Title);
        }
        self.header.flags = flags;

        // --- header ---
        file.write_all(&[0x01, 0xF9, 0xEC])?;
        match self.header.format_version {
            FormatVersion::V1 => file.write_all(&[1])?,
            FormatVersion::V2 => file.write_all(&[2, self.header.sequence_type as u8])?,
        }
        file.write_all(&[u8::from(flags), self.header.name_separator as u8])?;
        write_variable_length(self.header.line_length, &mut file)?;
        write_variable_length(self.header.number_of_sequences, &mut file)?;

        if let Some(title) = self.title.as_deref() {
            write_variable_length(title.len() as u64, &mut file)?;
            file.write_all(title.as_bytes())?;
        }

        // --- sections ---
        for (_, original_size, buffer) in sections {
            write_variable_length(original_size, &mut file)?;
            write_variable_length(self.storage.buffer_length(&buffer)?, &mut file)?;
            self.storage.write_buffer(buffer, &mut file)?;
        }

        file.flush()?;
        self.storage.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_length() {
        fn encoded(n: u64) -> Vec<u8> {
            let mut buffer = Vec::new();
            write_variable_length(n, &mut buffer).unwrap();
            buffer
        }
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(127), vec![0x7F]);
        assert_eq!(encoded(128), vec![0x81, 0x00]);
        assert_eq!(encoded(300), vec![0x82, 0x2C]);
        assert_eq!(
            encoded(u64::MAX),
            vec![0x81, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]
        );
    }

    #[test]
    fn variable_length_roundtrip() {
        for n in [0u64, 1, 42, 127, 128, 300, 16383, 16384, 1 << 40, u64::MAX] {
            let mut buffer = Vec::new();
            write_variable_length(n, &mut buffer).unwrap();
            let (rest, decoded) = crate::decoder::parser::variable_u64(&buffer).unwrap();
            assert!(rest.is_empty());
            assert_eq!(decoded, n, "roundtrip of {}", n);
        }
    }

    #[test]
    fn length_units() {
        fn encoded(l: u64) -> Vec<u8> {
            let mut buffer = Vec::new();
            write_length(l, &mut buffer).unwrap();
            buffer
        }
        assert_eq!(encoded(0), vec![0, 0, 0, 0]);
        assert_eq!(encoded(5), vec![5, 0, 0, 0]);
        // a length of exactly u32::MAX needs a zero terminator unit
        let max = encoded(u32::MAX as u64);
        assert_eq!(max, vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
        let over = encoded(u32::MAX as u64 + 3);
        assert_eq!(over, vec![0xFF, 0xFF, 0xFF, 0xFF, 3, 0, 0, 0]);
    }
}
