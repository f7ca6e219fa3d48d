//! MafTabix block decoder (§4.7, C7): a Tabix row's 5th field, comma-separated `:`-delimited
//! alignment tuples.

use crate::codec::PackedSeq;
use crate::model::{resolve_ref_seq, AlignmentBlock, Row, Strand};
use crate::names::{parse_heuristic, resolve_reference};

/// Parses one `assembly.chr:start:srcSize:strand:unknown:seq` tuple. Returns `None` on a
/// malformed tuple (§7: recover locally, skip).
fn parse_tuple(tuple: &str) -> Option<Row> {
  let mut fields = tuple.split(':');
  let token = fields.next()?;
  let (assembly_name, chr) = parse_heuristic(token);
  let start: u32 = fields.next()?.parse().ok()?;
  let src_size: u32 = fields.next()?.parse().ok()?;
  let strand = match fields.next()? {
    "+" => Strand::Forward,
    "-" => Strand::Reverse,
    _ => return None,
  };
  let _unknown = fields.next()?;
  let seq = fields.next()?;

  Some(Row {
    assembly_name,
    chr,
    start,
    src_size,
    strand,
    seq: PackedSeq::encode(seq.as_bytes()),
  })
}

/// Treats an empty configured string as absent, matching S5's `refAssemblyName=""`.
fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|s| !s.is_empty())
}

/// Decodes a single Tabix row's 5th field into an [`AlignmentBlock`]. `ref_name`/`start`/`end` are
/// the row's own BED coordinates; reference row resolution follows the §4.2 cascade.
pub fn decode_row(
  ref_name: &str,
  start: u32,
  end: u32,
  field5: &str,
  configured_ref: Option<&str>,
  query_assembly: Option<&str>,
) -> AlignmentBlock {
  let configured_ref = non_empty(configured_ref);
  let rows: Vec<Row> = field5.split(',').filter_map(parse_tuple).collect();

  let ref_seq = resolve_ref_seq(&rows, configured_ref, query_assembly);

  AlignmentBlock {
    ref_name: ref_name.to_string(),
    ref_start: start,
    ref_end: end,
    ref_seq,
    rows,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn s5_decodes_two_rows_and_resolves_reference_by_query_assembly() {
    let field5 = "hg38.chr1:100:1000:+:0:ACGT,mm10.chr1:200:2000:-:0:A-GT";
    let block = decode_row("chr1", 100, 104, field5, Some(""), Some("hg38"));
    assert_eq!(block.rows.len(), 2);
    assert_eq!(block.ref_seq.decode(), b"ACGT");
  }

  #[test]
  fn malformed_tuple_is_skipped() {
    let field5 = "hg38.chr1:notanumber:1000:+:0:ACGT,mm10.chr1:200:2000:-:0:A-GT";
    let block = decode_row("chr1", 100, 104, field5, None, None);
    assert_eq!(block.rows.len(), 1);
    assert_eq!(block.row("mm10").unwrap().start, 200);
  }

  #[test]
  fn resolve_reference_respects_the_full_cascade() {
    let order = vec!["mm10".to_string(), "hg38".to_string()];
    assert_eq!(
      resolve_reference(&order, non_empty(Some("")), Some("hg38")),
      Some("hg38")
    );
  }
}
