//! Binary parsers for the container framing.

use nom::IResult;

use crate::data::RawHeader;

pub fn byte(i: &[u8]) -> IResult<&[u8], u8> {
    let (i, n) = nom::bytes::streaming::take(1usize)(i)?;
    Ok((i, n[0]))
}

/// Parse a variable-length encoded number.
///
/// The encoding is base-128, most significant group first, with the high
/// bit set on every byte but the last. An orphan continuation byte
/// (`0x80` first) and values overflowing 64 bits are rejected.
pub fn variable_u64(i: &[u8]) -> IResult<&[u8], u64> {
    const TOP: u64 = 0x7F << 57;

    let (rest, limbs) = nom::bytes::streaming::take_while(|byte: u8| (byte & 0x80) != 0)(i)?;
    let (rest, last) = self::byte(rest)?;

    if limbs.first() == Some(&0x80) {
        let error = nom::error::Error::new(i, nom::error::ErrorKind::Verify);
        return Err(nom::Err::Failure(error));
    }

    let mut num = 0u64;
    for &limb in limbs {
        if num & TOP != 0 {
            let error = nom::error::Error::new(i, nom::error::ErrorKind::TooLarge);
            return Err(nom::Err::Failure(error));
        }
        num = (num << 7) | ((limb & 0x7F) as u64);
    }
    if num & TOP != 0 {
        let error = nom::error::Error::new(i, nom::error::ErrorKind::TooLarge);
        return Err(nom::Err::Failure(error));
    }

    Ok((rest, (num << 7) | (last as u64)))
}

pub fn format_descriptor(i: &[u8]) -> IResult<&[u8], &[u8]> {
    nom::bytes::streaming::tag([0x01, 0xF9, 0xEC])(i)
}

/// Parse the fixed header prefix into raw, unvalidated bytes.
///
/// The sequence type byte is only present from format version 2 on;
/// version bytes other than 1 are assumed to carry one so that the
/// validation in [`Header::try_from`] sees a consistent layout.
///
/// [`Header::try_from`]: crate::data::Header
pub fn header(i: &[u8]) -> IResult<&[u8], RawHeader> {
    let (i, _) = format_descriptor(i)?;
    let (i, format_version) = self::byte(i)?;
    let (i, sequence_type) = if format_version == 1 {
        (i, 0)
    } else {
        self::byte(i)?
    };
    let (i, flags) = self::byte(i)?;
    let (i, name_separator) = self::byte(i)?;
    let (i, line_length) = variable_u64(i)?;
    let (i, number_of_sequences) = variable_u64(i)?;
    Ok((
        i,
        RawHeader {
            format_version,
            sequence_type,
            flags,
            name_separator,
            line_length,
            number_of_sequences,
        },
    ))
}

#[cfg(test)]
mod tests {
    use crate::data::Header;
    use crate::data::SequenceType;
    use crate::error::Error;

    #[test]
    fn header() {
        const HEADER: [u8; 8] = [0x01, 0xF9, 0xEC, 0x01, 0x3E, 0x20, 0x3C, 0x20];
        let (i, raw) = super::header(&HEADER[..]).unwrap();
        let h = Header::try_from(raw).unwrap();
        assert_eq!(h.name_separator(), ' ');
        assert_eq!(h.line_length(), 60);
        assert_eq!(h.number_of_sequences(), 32);
        assert_eq!(h.sequence_type(), SequenceType::Dna);
        assert_eq!(i, b"");
    }

    #[test]
    fn unsupported_version() {
        const HEADER: [u8; 9] = [0x01, 0xF9, 0xEC, 0x07, 0x00, 0x3E, 0x20, 0x3C, 0x20];
        let (_, raw) = super::header(&HEADER[..]).unwrap();
        assert!(matches!(
            Header::try_from(raw),
            Err(Error::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn invalid_separator() {
        const HEADER: [u8; 8] = [0x01, 0xF9, 0xEC, 0x01, 0x3E, 0x07, 0x3C, 0x20];
        let (_, raw) = super::header(&HEADER[..]).unwrap();
        assert!(matches!(
            Header::try_from(raw),
            Err(Error::InvalidSeparator(0x07))
        ));
    }

    #[test]
    fn variable_u64() {
        assert_eq!(super::variable_u64(&[0x00]).unwrap().1, 0);
        assert_eq!(super::variable_u64(&[0x7F]).unwrap().1, 127);
        assert_eq!(super::variable_u64(&[0x81, 0x00]).unwrap().1, 128);
        assert_eq!(super::variable_u64(&[0x82, 0x2C]).unwrap().1, 300);
        assert_eq!(
            super::variable_u64(&[0x81, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F])
                .unwrap()
                .1,
            u64::MAX
        );
    }

    #[test]
    fn variable_u64_orphan_continuation() {
        assert!(matches!(
            super::variable_u64(&[0x80, 0x00]),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn variable_u64_overflow() {
        // 11 groups of 7 bits exceed 64 bits.
        let encoded = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(matches!(
            super::variable_u64(&encoded),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn variable_u64_incomplete() {
        assert!(matches!(
            super::variable_u64(&[0x81]),
            Err(nom::Err::Incomplete(_))
        ));
    }
}
