use std::borrow::Cow;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Seek;
use std::io::SeekFrom;
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::RwLock;

pub(crate) mod parser;
pub(crate) mod projection;
mod reader;
mod window;

use self::reader::CStringReader;
use self::reader::LengthReader;
use self::reader::MaskReader;
use self::reader::SequenceReader;
use self::window::SectionWindow;
use crate::data::Flag;
use crate::data::Flags;
use crate::data::Header;
use crate::data::MaskUnit;
use crate::data::Record;
use crate::data::SectionSize;
use crate::data::SequenceType;
use crate::error::Error;
use crate::Rc;

/// The wrapper used to decode a Zstandard section stream.
type ZstdDecoder<'z, R> = BufReader<zstd::stream::read::Decoder<'z, BufReader<SectionWindow<R>>>>;

/// A builder to configure and initialize a [`Decoder`].
///
/// The fields to decode are *opt-out*: by default, the [`Decoder`] will
/// extract all available fields found in the archive into each [`Record`].
/// Use the provided methods to avoid decoding unneeded fields.
///
/// For instance, to read a nucleotide archive and only extract sequence
/// names, skipping decompression of the sequences themselves:
/// ```no_run
/// let decoder = nafpack::DecoderBuilder::new()
///     .sequence(false)
///     .quality(false)
///     .with_path("data/archive.naf")
///     .unwrap();
/// for record in decoder.map(Result::unwrap) {
///     println!(">{}", record.id.unwrap());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DecoderBuilder {
    buffer_size: usize,
    id: bool,
    comment: bool,
    length: bool,
    sequence: bool,
    quality: bool,
    mask: bool,
}

impl DecoderBuilder {
    /// Create a new decoder builder with default parameters.
    ///
    /// By default, all fields are extracted if they are available in
    /// the header.
    pub fn new() -> Self {
        Self {
            buffer_size: 4096,
            id: true,
            comment: true,
            length: true,
            sequence: true,
            quality: true,
            mask: true,
        }
    }

    /// Create a new decoder builder from the given flags.
    ///
    /// This constructor can be used as a shortcut to set up decoding of a
    /// subset of the supported fields. Lengths are implied by sequence or
    /// quality decoding, since both are framed by the length table.
    pub fn from_flags<F: Into<Flags>>(flags: F) -> Self {
        let flags = flags.into();
        let mut builder = Self::new();
        builder.id(flags.test(Flag::Id));
        builder.comment(flags.test(Flag::Comment));
        builder.length(flags.test(Flag::Length));
        builder.mask(flags.test(Flag::Mask));
        builder.sequence(flags.test(Flag::Sequence));
        builder.quality(flags.test(Flag::Quality));
        builder
    }

    /// The buffer size to use while reading.
    ///
    /// Note that [`Decoder`] uses a lot of buffered I/O, and that more than
    /// one buffer will be created. Nevertheless, a higher value will reduce
    /// the necessity to seek the reader while reading the different blocks.
    ///
    /// By default, a buffer size of 4KiB is used for each internal buffer.
    pub fn buffer_size(&mut self, buffer_size: usize) -> &mut Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Whether or not to decode the sequence identifiers if available.
    #[inline]
    pub fn id(&mut self, id: bool) -> &mut Self {
        self.id = id;
        self
    }

    /// Whether or not to decode the sequence comments if available.
    #[inline]
    pub fn comment(&mut self, comment: bool) -> &mut Self {
        self.comment = comment;
        self
    }

    /// Whether or not to decode the length table if available.
    ///
    /// Lengths are decoded regardless of this option when sequences or
    /// qualities are, since records cannot be framed without them.
    #[inline]
    pub fn length(&mut self, length: bool) -> &mut Self {
        self.length = length;
        self
    }

    /// Whether or not to decode the sequence string if available.
    #[inline]
    pub fn sequence(&mut self, sequence: bool) -> &mut Self {
        self.sequence = sequence;
        self
    }

    /// Whether or not to decode the quality string if available.
    #[inline]
    pub fn quality(&mut self, quality: bool) -> &mut Self {
        self.quality = quality;
        self
    }

    /// Whether or not to perform region masking in the output sequence.
    #[inline]
    pub fn mask(&mut self, mask: bool) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Consume the builder to get a decoder reading data from the given buffer.
    pub fn with_bytes<'data, 'z>(
        &self,
        bytes: &'data [u8],
    ) -> Result<Decoder<'z, BufReader<Cursor<&'data [u8]>>>, Error> {
        self.with_reader(BufReader::new(Cursor::new(bytes)))
    }

    /// Consume the builder to get a decoder reading a file at the given path.
    pub fn with_path<'z, P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Decoder<'z, BufReader<File>>, Error> {
        File::open(path.as_ref())
            .map_err(Error::from)
            .and_then(|f| self.with_reader(BufReader::new(f)))
    }

    /// Consume the builder to get a decoder reading data from `reader`.
    pub fn with_reader<'z, R: BufRead + Seek>(
        &self,
        mut reader: R,
    ) -> Result<Decoder<'z, R>, Error> {
        let buffer = reader.fill_buf()?;
        let raw = match self::parser::header(buffer) {
            Ok((i, raw)) => {
                let consumed = buffer.len() - i.len();
                reader.consume(consumed);
                raw
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(Error::from(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to read header",
                )));
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                return Err(Error::from(e));
            }
        };
        let header = Header::try_from(raw)?;

        let mut title = None;
        if header.flags().test(Flag::Title) {
            let buf = reader.fill_buf()?;
            let (i, title_size) = self::parser::variable_u64(buf)?;
            let consumed = buf.len() - i.len();
            reader.consume(consumed);
            let mut bytes = vec![0; title_size as usize];
            reader.read_exact(&mut bytes)?;
            title = Some(String::from_utf8(bytes)?);
        }

        let mut sizes = Vec::new();
        let rc = Rc::new(RwLock::new(reader));
        macro_rules! setup_section {
            ($flags:expr, $flag:ident, $use_section:expr, $rc:ident, $section:ident) => {
                let _length: u64;
                setup_section!($flags, $flag, $use_section, $rc, $section, _length);
            };
            ($flags:expr, $flag:ident, $use_section:expr, $rc:ident, $section:ident, $original:ident) => {
                let $section;
                if $flags.test(Flag::$flag) {
                    // a clone of the shared reader for this section only
                    let tee = $rc.clone();
                    let mut handle = $rc.write().expect("reader lock should not be poisoned");
                    // decode the section sizes
                    let buf = handle.fill_buf()?;
                    let (i, original_size) = self::parser::variable_u64(buf)?;
                    let (i, compressed_size) = self::parser::variable_u64(i)?;
                    $original = original_size;
                    let consumed = buf.len() - i.len();
                    handle.consume(consumed);
                    sizes.push(SectionSize {
                        flag: Flag::$flag,
                        original_size,
                        compressed_size,
                    });
                    // set up an independent decoder over the section window
                    if $use_section {
                        let pos = handle.stream_position()?;
                        let window = SectionWindow::new(tee, pos, pos + compressed_size);
                        let mut decoder = zstd::stream::read::Decoder::new(window)?;
                        decoder.include_magicbytes(false)?;
                        decoder.window_log_max(31)?;
                        $section = Some(BufReader::with_capacity(self.buffer_size, decoder));
                    } else {
                        $section = None;
                    }
                    // skip the section payload with the main reader
                    handle.seek(SeekFrom::Current(compressed_size as i64))?;
                } else {
                    $section = None;
                }
            };
        }

        let flags = header.flags();
        let use_lengths = self.length || self.sequence || self.quality;
        let mut seqlen = 0u64;
        setup_section!(flags, Id, self.id, rc, ids_section);
        setup_section!(flags, Comment, self.comment, rc, com_section);
        setup_section!(flags, Length, use_lengths, rc, len_section);
        setup_section!(flags, Mask, self.mask, rc, mask_section);
        setup_section!(flags, Sequence, self.sequence, rc, seq_section, seqlen);
        setup_section!(flags, Quality, self.quality, rc, quality_section);

        let sequence_type = header.sequence_type();
        Ok(Decoder {
            ids: ids_section.map(|x| CStringReader::new(x, "ids")),
            com: com_section.map(|x| CStringReader::new(x, "comments")),
            len: len_section.map(LengthReader::new),
            seq: seq_section.map(|x| SequenceReader::new(x, sequence_type)),
            qual: quality_section.map(|x| SequenceReader::new(x, SequenceType::Text)),
            mask: mask_section.map(|x| MaskReader::new(x, seqlen)),
            n: 0,
            header,
            title,
            sizes,
            reader: rc,
            unit: MaskUnit::Unmasked(0),
        })
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoder for Nucleotide Archive Format files.
///
/// The internal reader is shared and accessed non-sequentially to read the
/// different sections of the archive, so the actual type should have a
/// reasonably fast [`Seek::seek`] implementation.
///
/// By default, the decoder will decode all available fields, which may not
/// be needed. Use a [`DecoderBuilder`] to configure decoding of individual
/// fields.
///
/// # Thread safety
///
/// By default, `Decoder` objects are not [`Send`] because they use
/// reference counting to share the reader between the section readers.
/// Compile the crate with the *arc* feature to use an [`Arc`] instead,
/// making the decoder [`Send`].
///
/// [`Arc`]: https://doc.rust-lang.org/std/sync/struct.Arc.html
pub struct Decoder<'z, R: BufRead + Seek> {
    header: Header,
    title: Option<String>,
    sizes: Vec<SectionSize>,
    reader: Rc<RwLock<R>>,
    pub(crate) ids: Option<CStringReader<ZstdDecoder<'z, R>>>,
    pub(crate) com: Option<CStringReader<ZstdDecoder<'z, R>>>,
    pub(crate) len: Option<LengthReader<ZstdDecoder<'z, R>>>,
    pub(crate) seq: Option<SequenceReader<ZstdDecoder<'z, R>>>,
    pub(crate) qual: Option<SequenceReader<ZstdDecoder<'z, R>>>,
    pub(crate) mask: Option<MaskReader<ZstdDecoder<'z, R>>>,
    n: usize,
    unit: MaskUnit,
}

impl Decoder<'_, BufReader<File>> {
    /// Create a new decoder from the given path.
    ///
    /// This constructor is a shortcut for `DecoderBuilder::new().with_path(path)`.
    /// Use a [`DecoderBuilder`] to configure a decoder with more options.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        DecoderBuilder::new().with_path(path)
    }
}

impl<R: BufRead + Seek> Decoder<'_, R> {
    /// Create a new decoder from the given reader.
    ///
    /// This constructor is a shortcut for `DecoderBuilder::new().with_reader(reader)`.
    /// Use a [`DecoderBuilder`] to configure a decoder with more options.
    pub fn new(reader: R) -> Result<Self, Error> {
        DecoderBuilder::new().with_reader(reader)
    }

    /// Get the header extracted from the archive.
    ///
    /// The NAF header contains useful metadata which are decoded before
    /// starting to decode the rest of the archive, such as the total number
    /// of sequences (useful for building a progress bar) or the line length
    /// (useful for writing the decoded sequences in FASTA format).
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the archive title, if any was stored.
    #[inline]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Get the recorded sizes of every section present in the archive.
    ///
    /// Sizes are known for all present sections, including the ones the
    /// decoder was configured to skip.
    #[inline]
    pub fn section_sizes(&self) -> &[SectionSize] {
        &self.sizes
    }

    /// Get the type of sequence in the archive being decoded.
    ///
    /// This method is a shortcut for `self.header().sequence_type()`.
    #[inline]
    pub fn sequence_type(&self) -> SequenceType {
        self.header().sequence_type()
    }

    /// Extract the internal reader.
    ///
    /// Note that the internal reader may have been advanced even if no
    /// records were obtained from the decoder yet, since at least the header
    /// needs to be decoded to obtain a working decoder.
    pub fn into_inner(self) -> R {
        let reader = self.reader.clone();
        drop(self);
        Rc::into_inner(reader)
            .expect("reference count should be 1 after decoder is dropped")
            .into_inner()
            .expect("lock shouldn't be poisoned")
    }

    /// Attempt to read the next record from the archive.
    ///
    /// This function expects that a record is available; use `Decoder::next`
    /// to check beforehand whether all sequences were read from the archive.
    fn next_record(&mut self) -> Result<Record<'static>, Error> {
        let id = match self.ids.as_mut().and_then(|r| r.next()).transpose()? {
            Some(id) => Some(Cow::Owned(id.into_string()?)),
            None => None,
        };
        let comment = match self.com.as_mut().and_then(|r| r.next()).transpose()? {
            Some(com) => Some(Cow::Owned(com.into_string()?)),
            None => None,
        };
        let length = self.len.as_mut().and_then(|r| r.next()).transpose()?;

        let mut sequence: Option<Cow<'static, str>> = None;
        let mut quality = None;
        if let Some(l) = length {
            sequence = self
                .seq
                .as_mut()
                .map(|r| r.next(l))
                .transpose()?
                .map(Cow::Owned);
            quality = self
                .qual
                .as_mut()
                .map(|r| r.next(l))
                .transpose()?
                .map(Cow::Owned);
            if let Some(seq) = sequence.as_mut() {
                self.mask_sequence(seq.to_mut())?;
            }
        }

        self.n += 1;
        Ok(Record {
            id,
            comment,
            sequence,
            quality,
            length,
        })
    }

    /// Attempt to mask some regions of the given sequence.
    fn mask_sequence(&mut self, sequence: &mut str) -> Result<(), Error> {
        let mask_reader = match self.mask.as_mut() {
            Some(reader) => reader,
            None => return Ok(()),
        };

        let total = sequence.len();
        let mut offset = 0usize;
        let mut mask = self.unit.clone();
        loop {
            let remaining = (total - offset) as u64;
            match mask {
                MaskUnit::Masked(n) => {
                    if n < remaining {
                        sequence[offset..offset + n as usize].make_ascii_lowercase();
                        offset += n as usize;
                    } else {
                        sequence[offset..].make_ascii_lowercase();
                        self.unit = MaskUnit::Masked(n - remaining);
                        break;
                    }
                }
                MaskUnit::Unmasked(n) => {
                    if n < remaining {
                        offset += n as usize;
                    } else {
                        self.unit = MaskUnit::Unmasked(n - remaining);
                        break;
                    }
                }
            }
            mask = match mask_reader.next() {
                Some(Ok(unit)) => unit,
                Some(Err(e)) => return Err(e),
                None => return Err(Error::Corrupt("mask")),
            };
        }

        Ok(())
    }
}

impl<R: BufRead + Seek> Iterator for Decoder<'_, R> {
    type Item = Result<Record<'static>, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.n as u64 >= self.header.number_of_sequences() {
            return None;
        }
        Some(self.next_record())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.header.number_of_sequences() as usize - self.n;
        (remaining, Some(remaining))
    }
}

impl<R: BufRead + Seek> ExactSizeIterator for Decoder<'_, R> {}

impl<R: BufRead + Seek> FusedIterator for Decoder<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_empty() {
        match Decoder::new(std::io::Cursor::new(b"")) {
            Ok(_decoder) => panic!("unexpected success"),
            Err(Error::Io(e)) => assert!(matches!(e.kind(), std::io::ErrorKind::UnexpectedEof)),
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn error_not_naf() {
        match Decoder::new(std::io::Cursor::new(b">chr1\nACGT\n")) {
            Ok(_decoder) => panic!("unexpected success"),
            Err(Error::Nom(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
}
