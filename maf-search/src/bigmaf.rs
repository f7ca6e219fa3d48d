//! BigMaf block decoder (§4.6, C6): a BigBed feature's `mafBlock` extra column, split on `;`,
//! each `s`-prefixed segment parsed into a row.

use crate::model::{AlignmentBlock, Row, Strand};

/// Parses one `s <asm.chr> <start> <size> <strand> <srcSize> <seq>` segment, tokenized on runs of
/// ASCII whitespace. Returns `None` on a malformed segment (§7: recover locally, skip).
fn parse_s_line(segment: &str) -> Option<Row> {
  let mut tokens = segment.split_whitespace();
  if tokens.next()? != "s" {
    return None;
  }
  let token = tokens.next()?;
  let (assembly_name, chr) = crate::names::parse_simple(token);
  let start: u32 = tokens.next()?.parse().ok()?;
  // The BigMaf `size` column is the aligned span, redundant with the encoded seq's non-gap
  // count; it is not carried on `Row` separately.
  let _size: u32 = tokens.next()?.parse().ok()?;
  let strand = match tokens.next()? {
    "+" => Strand::Forward,
    "-" => Strand::Reverse,
    _ => return None,
  };
  let src_size: u32 = tokens.next()?.parse().ok()?;
  let seq = tokens.next()?;

  Some(Row {
    assembly_name,
    chr,
    start,
    src_size,
    strand,
    seq: crate::codec::PackedSeq::encode(seq.as_bytes()),
  })
}

/// Decodes a single BigBed feature into an [`AlignmentBlock`]. The feature's own `(ref_name,
/// feature_start, feature_end)` is used directly for the block's reference span; the *first*
/// `s` row encountered becomes the reference row's sequence, per BigMaf convention (§4.6).
pub fn decode_feature(
  ref_name: &str,
  feature_start: u32,
  feature_end: u32,
  maf_block: &str,
) -> AlignmentBlock {
  let rows: Vec<Row> = maf_block
    .split(';')
    .map(str::trim)
    .filter(|segment| segment.starts_with("s "))
    .filter_map(parse_s_line)
    .collect();

  let ref_seq = rows.first().map(|row| row.seq.clone()).unwrap_or_default();

  AlignmentBlock {
    ref_name: ref_name.to_string(),
    ref_start: feature_start,
    ref_end: feature_end,
    ref_seq,
    rows,
  }
}
