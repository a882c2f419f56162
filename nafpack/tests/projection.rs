extern crate nafpack;

use std::borrow::Cow;
use std::io::Cursor;

use nafpack::EncoderBuilder;
use nafpack::Projection;
use nafpack::ProjectionWriter;
use nafpack::Record;
use nafpack::SequenceType;

/// A small two-record DNA archive with a soft-masked region.
///
/// Sequences: `ACgtN` and `TT`, so the concatenated stream is `ACgtNTT`
/// with mask runs `[2, 2, 3]` and the packed codes `48 12 1F 01`.
fn dna_archive() -> Vec<u8> {
    let mut builder = EncoderBuilder::new(SequenceType::Dna);
    builder.comment(true).line_length(4);
    let mut encoder = builder.with_memory().unwrap();
    encoder
        .push(&Record {
            id: Some(Cow::from("chr1")),
            comment: Some(Cow::from("human")),
            sequence: Some(Cow::from("ACgtN")),
            ..Default::default()
        })
        .unwrap();
    encoder
        .push(&Record {
            id: Some(Cow::from("chr2")),
            sequence: Some(Cow::from("TT")),
            ..Default::default()
        })
        .unwrap();
    let mut buffer = Vec::new();
    encoder.write(&mut buffer).unwrap();
    buffer
}

fn project(archive: &[u8], projection: Projection) -> Vec<u8> {
    let mut out = Vec::new();
    ProjectionWriter::new(&mut out)
        .write(projection, Cursor::new(archive))
        .unwrap();
    out
}

fn project_nomask(archive: &[u8], projection: Projection) -> Vec<u8> {
    let mut out = Vec::new();
    ProjectionWriter::new(&mut out)
        .mask(false)
        .write(projection, Cursor::new(archive))
        .unwrap();
    out
}

#[test]
fn format() {
    assert_eq!(project(&dna_archive(), Projection::Format), b"NAF v.1\n");
}

#[test]
fn part_list() {
    assert_eq!(
        project(&dna_archive(), Projection::PartList),
        b"IDs, Comments, Lengths, Mask, Sequence\n"
    );
}

#[test]
fn sizes() {
    let out = project(&dna_archive(), Projection::Sizes);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("IDs: "));
    assert!(lines[1].starts_with("Comments: "));
    assert!(lines[2].starts_with("Lengths: "));
    assert!(lines[3].starts_with("Mask: "));
    assert!(lines[4].starts_with("Sequence: "));
    // uncompressed ids size is "chr1\0chr2\0"
    assert!(lines[0].contains("/ 10 ("));
}

#[test]
fn number() {
    assert_eq!(project(&dna_archive(), Projection::Number), b"2\n");
}

#[test]
fn title() {
    assert_eq!(project(&dna_archive(), Projection::Title), b"\n");

    let mut builder = EncoderBuilder::new(SequenceType::Dna);
    builder.title("my title");
    let mut encoder = builder.with_memory().unwrap();
    encoder
        .push(&Record {
            id: Some(Cow::from("x")),
            sequence: Some(Cow::from("A")),
            ..Default::default()
        })
        .unwrap();
    let mut archive = Vec::new();
    encoder.write(&mut archive).unwrap();

    assert_eq!(project(&archive, Projection::Title), b"my title\n");
    let sizes = project(&archive, Projection::Sizes);
    assert!(sizes.starts_with(b"Title: 8\n"));
}

#[test]
fn ids() {
    assert_eq!(project(&dna_archive(), Projection::Ids), b"chr1\nchr2\n");
}

#[test]
fn names() {
    assert_eq!(
        project(&dna_archive(), Projection::Names),
        b"chr1 human\nchr2\n"
    );
}

#[test]
fn lengths() {
    assert_eq!(project(&dna_archive(), Projection::Lengths), b"5\n2\n");
}

#[test]
fn total_length() {
    assert_eq!(project(&dna_archive(), Projection::TotalLength), b"7\n");
}

#[test]
fn mask() {
    assert_eq!(project(&dna_archive(), Projection::Mask), b"2\n2\n3\n");
}

#[test]
fn total_mask_length() {
    assert_eq!(project(&dna_archive(), Projection::TotalMaskLength), b"2\n");
}

#[test]
fn four_bit() {
    assert_eq!(
        project(&dna_archive(), Projection::FourBit),
        vec![0x48, 0x12, 0x1F, 0x01]
    );
}

#[test]
fn seq() {
    assert_eq!(project(&dna_archive(), Projection::Seq), b"ACgtNTT");
    assert_eq!(project_nomask(&dna_archive(), Projection::Seq), b"ACGTNTT");
}

#[test]
fn sequences() {
    assert_eq!(project(&dna_archive(), Projection::Sequences), b"ACgtN\nTT\n");
}

#[test]
fn dna() {
    // mask is ignored regardless of the option
    assert_eq!(project(&dna_archive(), Projection::Dna), b"ACGTNTT");
}

#[test]
fn masked_dna() {
    assert_eq!(project(&dna_archive(), Projection::MaskedDna), b"ACgtNTT");
}

#[test]
fn char_count() {
    assert_eq!(
        project(&dna_archive(), Projection::CharCount),
        b"A\t1\nC\t1\nN\t1\nT\t2\ng\t1\nt\t1\n"
    );
    assert_eq!(
        project_nomask(&dna_archive(), Projection::CharCount),
        b"A\t1\nC\t1\nG\t1\nN\t1\nT\t3\n"
    );
}

#[test]
fn fasta() {
    assert_eq!(
        project(&dna_archive(), Projection::Fasta),
        b">chr1 human\nACgt\nN\n>chr2\nTT\n"
    );
}

#[test]
fn fasta_unmasked() {
    assert_eq!(
        project_nomask(&dna_archive(), Projection::Fasta),
        b">chr1 human\nACGT\nN\n>chr2\nTT\n"
    );
}

#[test]
fn fastq_of_dna_archive() {
    // FASTQ output renders uppercase sequences
    let mut builder = EncoderBuilder::new(SequenceType::Dna);
    builder.quality(true);
    let mut encoder = builder.with_memory().unwrap();
    encoder
        .push(&Record {
            id: Some(Cow::from("N1")),
            sequence: Some(Cow::from("AAAAA")),
            quality: Some(Cow::from("!!!!!")),
            ..Default::default()
        })
        .unwrap();
    encoder
        .push(&Record {
            id: Some(Cow::from("N2")),
            sequence: Some(Cow::from("CCC")),
            quality: Some(Cow::from("~~~")),
            ..Default::default()
        })
        .unwrap();
    let mut archive = Vec::new();
    encoder.write(&mut archive).unwrap();

    assert_eq!(
        project(&archive, Projection::Fastq),
        b"@N1\nAAAAA\n+\n!!!!!\n@N2\nCCC\n+\n~~~\n"
    );
}
