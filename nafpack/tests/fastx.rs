extern crate nafpack;

use std::borrow::Cow;

use nafpack::fastx::FastxReader;
use nafpack::fastx::FastxReaderBuilder;
use nafpack::Error;
use nafpack::Record;
use nafpack::SequenceType;

fn parse(
    input: &'static [u8],
    ty: SequenceType,
) -> (Vec<Record<'static>>, FastxReader<&'static [u8]>) {
    let mut reader = FastxReaderBuilder::new(ty).with_reader(input).unwrap();
    let records = reader
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .expect("parsing should succeed");
    (records, reader)
}

#[test]
fn empty_fasta_record() {
    let (records, _) = parse(b">\n", SequenceType::Dna);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, Some(Cow::from("")));
    assert_eq!(records[0].comment, None);
    assert_eq!(records[0].sequence, Some(Cow::from("")));
    assert_eq!(records[0].length, Some(0));
}

#[test]
fn two_record_fasta() {
    let (records, reader) = parse(b">chr1 human\nACgt\nN\n>chr2\nTT\n", SequenceType::Dna);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, Some(Cow::from("chr1")));
    assert_eq!(records[0].comment, Some(Cow::from("human")));
    assert_eq!(records[0].sequence, Some(Cow::from("ACgtN")));
    assert_eq!(records[0].length, Some(5));

    assert_eq!(records[1].id, Some(Cow::from("chr2")));
    assert_eq!(records[1].comment, None);
    assert_eq!(records[1].sequence, Some(Cow::from("TT")));
    assert_eq!(records[1].length, Some(2));

    assert_eq!(reader.longest_line(), 4);
    assert_eq!(reader.n_records(), 2);
}

#[test]
fn well_formed_fasta() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .well_formed(true)
        .with_reader(&b">chr1 human\nACgt\nN\n>chr2\nTT\n"[..])
        .unwrap();
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sequence, Some(Cow::from("ACgtN")));
    assert_eq!(records[1].id, Some(Cow::from("chr2")));
    assert_eq!(reader.longest_line(), 4);
}

#[test]
fn fasta_no_trailing_newline() {
    let (records, reader) = parse(b">x\nACGTAC", SequenceType::Dna);
    assert_eq!(records[0].sequence, Some(Cow::from("ACGTAC")));
    assert_eq!(reader.longest_line(), 6);
}

#[test]
fn fasta_embedded_whitespace() {
    let (records, reader) = parse(b">x\nAC GT\tAC\n", SequenceType::Dna);
    assert_eq!(records[0].sequence, Some(Cow::from("ACGTAC")));
    // discarded whitespace does not count towards the line length
    assert_eq!(reader.longest_line(), 6);
}

#[test]
fn fasta_empty_sequence_between_records() {
    let (records, _) = parse(b">a\n>b\nAC\n", SequenceType::Dna);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sequence, Some(Cow::from("")));
    assert_eq!(records[1].sequence, Some(Cow::from("AC")));
}

#[test]
fn fasta_replaces_unexpected() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b">x\nACQT\n"[..])
        .unwrap();
    let record = reader.next().unwrap().unwrap();
    assert_eq!(record.sequence, Some(Cow::from("ACNT")));
    assert_eq!(reader.stats().sequence[b'Q' as usize], 1);
    assert!(!reader.stats().is_empty());
}

#[test]
fn fasta_strict_rejects_unexpected() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .strict(true)
        .with_reader(&b">x\nACQT\n"[..])
        .unwrap();
    match reader.next().unwrap() {
        Err(Error::UnexpectedCharacter { byte, record }) => {
            assert_eq!(byte, b'Q');
            assert_eq!(record, 1);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn fasta_protein_replacement() {
    let (records, _) = parse(b">x\nMY8K\n", SequenceType::Protein);
    assert_eq!(records[0].sequence, Some(Cow::from("MYXK")));
}

#[test]
fn fasta_text_greater_than_inside_line() {
    let (records, _) = parse(b">x\nfoo>bar\n>y\nbaz\n", SequenceType::Text);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sequence, Some(Cow::from("foo>bar")));
    assert_eq!(records[1].sequence, Some(Cow::from("baz")));
}

#[test]
fn fastq_two_records() {
    let (records, reader) = parse(
        b"@N1 sample\nAAAAA\n+\n!!!!!\n@N2\nCCC\n+ignored\n~~~\n",
        SequenceType::Dna,
    );
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, Some(Cow::from("N1")));
    assert_eq!(records[0].comment, Some(Cow::from("sample")));
    assert_eq!(records[0].sequence, Some(Cow::from("AAAAA")));
    assert_eq!(records[0].quality, Some(Cow::from("!!!!!")));

    assert_eq!(records[1].id, Some(Cow::from("N2")));
    assert_eq!(records[1].sequence, Some(Cow::from("CCC")));
    assert_eq!(records[1].quality, Some(Cow::from("~~~")));

    assert_eq!(reader.longest_line(), 5);
}

#[test]
fn well_formed_fastq() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .well_formed(true)
        .with_reader(&b"@N1\nAAAAA\n+\n!!!!!\n@N2\nCCC\n+\n~~~\n"[..])
        .unwrap();
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].quality, Some(Cow::from("~~~")));
}

#[test]
fn fastq_blank_lines_between_records() {
    let (records, _) = parse(b"@a\nAC\n+\n!!\n\n\n@b\nGT\n+\n##\n\n", SequenceType::Dna);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, Some(Cow::from("b")));
}

#[test]
fn fastq_truncated_no_sequence() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b"@r1 x\n"[..])
        .unwrap();
    assert!(matches!(reader.next().unwrap(), Err(Error::Truncated)));
}

#[test]
fn fastq_truncated_no_separator() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b"@r1\nACGT\n"[..])
        .unwrap();
    assert!(matches!(reader.next().unwrap(), Err(Error::Truncated)));
}

#[test]
fn fastq_truncated_no_quality() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b"@r1\nACGT\n+\n"[..])
        .unwrap();
    assert!(matches!(reader.next().unwrap(), Err(Error::Truncated)));
}

#[test]
fn fastq_quality_length_mismatch() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b"@r1\nACGT\n+\n!!!\n"[..])
        .unwrap();
    match reader.next().unwrap() {
        Err(Error::QualityLengthMismatch {
            record,
            sequence,
            quality,
        }) => {
            assert_eq!(record, 1);
            assert_eq!(sequence, 4);
            assert_eq!(quality, 3);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn fastq_parsing_stops_after_error() {
    let mut reader = FastxReaderBuilder::new(SequenceType::Dna)
        .with_reader(&b"@r1\nACGT\n+\n!!!\n"[..])
        .unwrap();
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}
