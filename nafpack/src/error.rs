//! Common error type for this crate.

use crate::fastx::InputFormat;

#[derive(Debug)]
pub enum Error {
    /// An underlying read, write or seek failed.
    Io(std::io::Error),
    /// The container framing could not be parsed.
    Nom(nom::error::Error<Vec<u8>>),
    /// A decoded text section is not valid UTF-8.
    Utf8(std::str::Utf8Error),
    /// A sequence character outside the 4-bit nucleotide code map.
    InvalidSequence,
    /// Quality and sequence lengths disagree within a pushed record.
    InvalidLength,
    /// A record is missing a field required by the archive layout.
    MissingField(&'static str),
    /// The input ended before a complete record or section was read.
    Truncated,
    /// The input is neither FASTA nor FASTQ.
    UnknownFormat,
    /// The detected input format disagrees with the declared one.
    FormatMismatch {
        declared: InputFormat,
        detected: InputFormat,
    },
    /// An unexpected character was found while parsing in strict mode.
    UnexpectedCharacter { byte: u8, record: u64 },
    /// A FASTQ quality line length differs from its sequence length.
    QualityLengthMismatch {
        record: u64,
        sequence: u64,
        quality: u64,
    },
    /// The archive version byte is outside the supported range.
    UnsupportedVersion(u8),
    /// The archive sequence type byte is unknown.
    UnknownSequenceType(u8),
    /// The archive name separator is not printable ASCII.
    InvalidSeparator(u8),
    /// A decoded section violates an integrity invariant.
    Corrupt(&'static str),
    /// The requested configuration is contradictory.
    InvalidConfig(&'static str),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<nom::error::Error<Vec<u8>>> for Error {
    fn from(error: nom::error::Error<Vec<u8>>) -> Self {
        Error::Nom(error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::from(error.utf8_error())
    }
}

impl From<std::ffi::IntoStringError> for Error {
    fn from(error: std::ffi::IntoStringError) -> Self {
        Error::Utf8(error.utf8_error())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(error: std::str::Utf8Error) -> Self {
        Error::Utf8(error)
    }
}

impl<'i> From<nom::error::Error<&'i [u8]>> for Error {
    fn from(error: nom::error::Error<&'i [u8]>) -> Self {
        Error::Nom(nom::error::Error::new(error.input.to_owned(), error.code))
    }
}

impl<E> From<nom::Err<E>> for Error
where
    E: Into<Error>,
{
    fn from(error: nom::Err<E>) -> Self {
        match error {
            nom::Err::Error(e) | nom::Err::Failure(e) => e.into(),
            nom::Err::Incomplete(_) => Error::Truncated,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => e.fmt(f),
            Error::Nom(e) => nom::Err::Error(e).fmt(f),
            Error::Utf8(e) => e.fmt(f),
            Error::InvalidSequence => f.write_str("invalid character in sequence"),
            Error::InvalidLength => f.write_str("inconsistent sequence length"),
            Error::MissingField(field) => write!(f, "missing record field: {:?}", field),
            Error::Truncated => f.write_str("incomplete or truncated input"),
            Error::UnknownFormat => f.write_str(
                "input data is in unknown format - first non-space character is neither '>' nor '@'",
            ),
            Error::FormatMismatch { declared, detected } => write!(
                f,
                "detected {} input but {} was specified",
                detected, declared
            ),
            Error::UnexpectedCharacter { byte, record } => {
                if byte.is_ascii_graphic() {
                    write!(f, "unexpected character '{}' in sequence {}", *byte as char, record)
                } else {
                    write!(f, "unexpected character '\\x{:02X}' in sequence {}", byte, record)
                }
            }
            Error::QualityLengthMismatch {
                record,
                sequence,
                quality,
            } => write!(
                f,
                "quality length of sequence {} ({}) doesn't match sequence length ({})",
                record, quality, sequence
            ),
            Error::UnsupportedVersion(v) => write!(f, "unknown version ({}) of NAF format", v),
            Error::UnknownSequenceType(t) => {
                write!(f, "unknown sequence type ({}) found in NAF file", t)
            }
            Error::InvalidSeparator(b) => {
                write!(f, "unsupported name separator character (0x{:02X})", b)
            }
            Error::Corrupt(section) => write!(f, "corrupted {} section", section),
            Error::InvalidConfig(what) => write!(f, "invalid configuration: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Utf8(e) => Some(e),
            _ => None,
        }
    }
}
