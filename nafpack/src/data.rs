//! Common data types for this crate.

use std::borrow::Cow;

use crate::error::Error;

// --- MaskUnit ----------------------------------------------------------------

/// A single run with associated status decoded from the mask block.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskUnit {
    Masked(u64),
    Unmasked(u64),
}

impl MaskUnit {
    /// The number of sequence positions covered by this run.
    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            Self::Masked(n) | Self::Unmasked(n) => *n,
        }
    }

    #[inline]
    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Masked(_))
    }
}

// --- Record ------------------------------------------------------------------

/// A single sequence record from a Nucleotide Archive Format file.
///
/// ## Quality
///
/// If set, the quality string length should be equal to the sequence
/// string length, and to the record length. Since the data is compressed
/// as raw text, it could contain other sort of annotation, such as RNA
/// secondary structure in dot-bracket notation, or protein secondary
/// structure.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record<'a> {
    /// The record identifier (accession number).
    pub id: Option<Cow<'a, str>>,
    /// The record comment (description).
    pub comment: Option<Cow<'a, str>>,
    /// The record sequence.
    pub sequence: Option<Cow<'a, str>>,
    /// The record quality string.
    pub quality: Option<Cow<'a, str>>,
    /// The record sequence length.
    pub length: Option<u64>,
}

// --- FormatVersion -----------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FormatVersion {
    #[default]
    V1 = 1,
    V2 = 2,
}

// --- SequenceType ------------------------------------------------------------

/// The type of sequence stored in a Nucleotide Archive Format file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequenceType {
    #[default]
    Dna = 0,
    Rna = 1,
    Protein = 2,
    Text = 3,
}

impl SequenceType {
    /// Check whether the sequence type is a nucleotide type.
    #[inline]
    pub fn is_nucleotide(&self) -> bool {
        match self {
            Self::Dna | Self::Rna => true,
            Self::Protein | Self::Text => false,
        }
    }

    /// The human-readable name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dna => "DNA",
            Self::Rna => "RNA",
            Self::Protein => "protein",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// --- Flags -------------------------------------------------------------------

/// A single bit of the header flags byte, naming one optional section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flag {
    Quality = 0x01,
    Sequence = 0x02,
    Mask = 0x04,
    Length = 0x08,
    Comment = 0x10,
    Id = 0x20,
    Title = 0x40,
    Extended = 0x80,
}

impl Flag {
    /// All flags, in increasing bit order.
    pub fn values() -> &'static [Flag; 8] {
        &[
            Flag::Quality,
            Flag::Sequence,
            Flag::Mask,
            Flag::Length,
            Flag::Comment,
            Flag::Id,
            Flag::Title,
            Flag::Extended,
        ]
    }

    #[inline]
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// The section name used in diagnostics and part listings.
    pub fn section_name(&self) -> &'static str {
        match self {
            Flag::Quality => "Quality",
            Flag::Sequence => "Sequence",
            Flag::Mask => "Mask",
            Flag::Length => "Lengths",
            Flag::Comment => "Comments",
            Flag::Id => "IDs",
            Flag::Title => "Title",
            Flag::Extended => "Extended",
        }
    }
}

impl std::ops::BitOr<Flag> for Flag {
    type Output = Flags;
    fn bitor(self, rhs: Flag) -> Flags {
        Flags(self.as_byte() | rhs.as_byte())
    }
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Self {
        Flags(flag.as_byte())
    }
}

/// The flags byte of a NAF header, as a set of [`Flag`] values.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    /// Create a new empty flag set.
    pub fn new() -> Self {
        Self(0)
    }

    /// Check whether the given flag is set.
    #[inline]
    pub fn test(&self, flag: Flag) -> bool {
        (self.0 & flag.as_byte()) != 0
    }

    /// Set the given flag.
    #[inline]
    pub fn set(&mut self, flag: Flag) {
        self.0 |= flag.as_byte();
    }

    /// Clear the given flag.
    #[inline]
    pub fn clear(&mut self, flag: Flag) {
        self.0 &= !flag.as_byte();
    }
}

impl std::ops::BitOr<Flag> for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flag) -> Flags {
        Flags(self.0 | rhs.as_byte())
    }
}

impl std::ops::BitOr<Flags> for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl From<u8> for Flags {
    fn from(byte: u8) -> Self {
        Self(byte)
    }
}

impl From<Flags> for u8 {
    fn from(flags: Flags) -> u8 {
        flags.0
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut set = f.debug_set();
        for flag in Flag::values() {
            if self.test(*flag) {
                set.entry(flag);
            }
        }
        set.finish()
    }
}

// --- Header ------------------------------------------------------------------

/// The raw bytes of a NAF header, before validation.
///
/// Produced by the binary parser; use [`Header::try_from`] to validate the
/// version, sequence type and separator bytes into a proper [`Header`].
#[derive(Debug, Clone, Copy)]
pub struct RawHeader {
    pub(crate) format_version: u8,
    pub(crate) sequence_type: u8,
    pub(crate) flags: u8,
    pub(crate) name_separator: u8,
    pub(crate) line_length: u64,
    pub(crate) number_of_sequences: u64,
}

/// The header section of a Nucleotide Archive Format file.
///
/// Headers are the only mandatory section of NAF files, and contain
/// metadata about the stored sequences, as well as some metadata for
/// the formatting of the records during decompression.
///
#[derive(Debug, Clone)]
pub struct Header {
    pub(crate) format_version: FormatVersion,
    pub(crate) sequence_type: SequenceType,
    pub(crate) flags: Flags,
    pub(crate) name_separator: char,
    pub(crate) line_length: u64,
    pub(crate) number_of_sequences: u64,
}

impl Header {
    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn line_length(&self) -> u64 {
        self.line_length
    }

    pub fn name_separator(&self) -> char {
        self.name_separator
    }

    pub fn number_of_sequences(&self) -> u64 {
        self.number_of_sequences
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }
}

impl Default for Header {
    fn default() -> Self {
        Header {
            format_version: FormatVersion::V1,
            sequence_type: SequenceType::Dna,
            flags: Flags::default(),
            name_separator: ' ',
            line_length: 60,
            number_of_sequences: 0,
        }
    }
}

impl TryFrom<RawHeader> for Header {
    type Error = Error;
    fn try_from(raw: RawHeader) -> Result<Self, Error> {
        let format_version = match raw.format_version {
            1 => FormatVersion::V1,
            2 => FormatVersion::V2,
            other => return Err(Error::UnsupportedVersion(other)),
        };
        let sequence_type = match format_version {
            FormatVersion::V1 => SequenceType::Dna,
            FormatVersion::V2 => match raw.sequence_type {
                0 => SequenceType::Dna,
                1 => SequenceType::Rna,
                2 => SequenceType::Protein,
                3 => SequenceType::Text,
                other => return Err(Error::UnknownSequenceType(other)),
            },
        };
        if !(0x20..=0x7E).contains(&raw.name_separator) {
            return Err(Error::InvalidSeparator(raw.name_separator));
        }
        Ok(Header {
            format_version,
            sequence_type,
            flags: Flags::from(raw.flags),
            name_separator: raw.name_separator as char,
            line_length: raw.line_length,
            number_of_sequences: raw.number_of_sequences,
        })
    }
}

// --- SectionSize -------------------------------------------------------------

/// The on-disk footprint of one archive section.
///
/// Recorded while walking the container, whether or not the section is
/// decoded, since every present section is prefixed by its sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSize {
    /// The flag bit naming the section.
    pub flag: Flag,
    /// Uncompressed size of the section content, in bytes.
    pub original_size: u64,
    /// Compressed size as stored in the archive (zstd frame minus magic).
    pub compressed_size: u64,
}
