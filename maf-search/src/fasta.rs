//! FASTA materializer (§4.10, C10): assembles selected samples' gapped sequences over a region
//! from a block stream, with optional reference-gap (insertion) expansion.

use std::collections::{BTreeMap, HashMap};

use crate::model::AlignmentBlock;

/// Materialization options.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastaOptions {
  /// When `false`, non-gap aligned columns are rendered as `.` rather than the base itself.
  pub show_all_letters: bool,
  /// When `true`, reference-gap columns where a visible sample has a base are spliced back in.
  pub include_insertions: bool,
}

/// Materializes `visible_samples` over `[region_start, region_end)` from `blocks`. Every sample
/// name gets an entry in the returned map, even if no block covers it (left `-`-filled).
pub fn materialize(
  region_start: u32,
  region_end: u32,
  visible_samples: &[String],
  blocks: impl IntoIterator<Item = AlignmentBlock>,
  options: FastaOptions,
) -> HashMap<String, Vec<u8>> {
  let length = region_end.saturating_sub(region_start) as usize;
  let mut output: HashMap<String, Vec<u8>> =
    visible_samples.iter().map(|name| (name.clone(), vec![b'-'; length])).collect();

  // ref_pos -> sample -> inserted bases, only ever populated from visible rows (§4.10 "Critical
  // rule": a non-visible sample's insertion must never reach this map).
  let mut insertions: BTreeMap<u32, HashMap<String, Vec<u8>>> = BTreeMap::new();

  for block in blocks {
    for row in &block.rows {
      if !visible_samples.iter().any(|sample| sample == &row.assembly_name) {
        continue;
      }
      write_row(&block, row, region_start, region_end, options, &mut output, &mut insertions);
    }
  }

  if options.include_insertions {
    splice_insertions(&mut output, &insertions, visible_samples, region_start, region_end);
  }

  output
}

fn write_row(
  block: &AlignmentBlock,
  row: &crate::model::Row,
  region_start: u32,
  region_end: u32,
  options: FastaOptions,
  output: &mut HashMap<String, Vec<u8>>,
  insertions: &mut BTreeMap<u32, HashMap<String, Vec<u8>>>,
) {
  let length = region_end.saturating_sub(region_start) as usize;
  let out = output.get_mut(&row.assembly_name).expect("sample allocated up front");

  let mut ref_cursor = block.ref_start;
  let mut pending_insertion: Vec<u8> = Vec::new();
  let columns = block.ref_seq.len().max(row.seq.len());

  for i in 0..columns {
    let ref_is_gap = i >= block.ref_seq.len() || block.ref_seq.is_gap(i);
    let row_is_gap = i >= row.seq.len() || row.seq.is_gap(i);

    if ref_is_gap {
      if !row_is_gap && options.include_insertions {
        pending_insertion.push(row.seq.base_at_lower(i) as u8);
      }
      continue;
    }

    if options.include_insertions && !pending_insertion.is_empty() {
      insertions
        .entry(ref_cursor)
        .or_default()
        .insert(row.assembly_name.clone(), std::mem::take(&mut pending_insertion));
    }

    // Blocks are yielded on overlap, not containment: positions outside [region_start,
    // region_end) at a block's edges are expected and simply clipped, not an invariant failure.
    if ref_cursor >= region_start {
      let offset = (ref_cursor - region_start) as usize;
      if offset < length {
        out[offset] = if row_is_gap {
          b'-'
        } else if options.show_all_letters {
          row.seq.base_at_lower(i) as u8
        } else {
          b'.'
        };
      }
    }
    ref_cursor += 1;
  }

  if options.include_insertions && !pending_insertion.is_empty() {
    insertions.entry(ref_cursor).or_default().insert(row.assembly_name.clone(), pending_insertion);
  }
}

/// Splices accumulated insertion columns into every visible sample's vector, from the highest
/// reference position down so earlier splice points stay valid (§4.10 step 3).
fn splice_insertions(
  output: &mut HashMap<String, Vec<u8>>,
  insertions: &BTreeMap<u32, HashMap<String, Vec<u8>>>,
  visible_samples: &[String],
  region_start: u32,
  region_end: u32,
) {
  for (&ref_pos, by_sample) in insertions.iter().rev() {
    if ref_pos < region_start || ref_pos > region_end {
      continue;
    }
    let max_len = by_sample.values().map(Vec::len).max().unwrap_or(0);
    if max_len == 0 {
      continue;
    }

    let offset = (ref_pos - region_start) as usize;
    for sample in visible_samples {
      let Some(vec) = output.get_mut(sample) else { continue };
      let mut column = by_sample.get(sample).cloned().unwrap_or_default();
      column.resize(max_len, b'-');
      let insert_at = offset.min(vec.len());
      vec.splice(insert_at..insert_at, column);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::PackedSeq;
  use crate::model::{Row, Strand};

  fn row(assembly: &str, seq: &str) -> Row {
    Row {
      assembly_name: assembly.to_string(),
      chr: "chr1".to_string(),
      start: 0,
      src_size: 1000,
      strand: Strand::Forward,
      seq: PackedSeq::encode(seq.as_bytes()),
    }
  }

  fn block(ref_seq: &str, rows: Vec<Row>) -> AlignmentBlock {
    let ref_seq = PackedSeq::encode(ref_seq.as_bytes());
    let ref_end = ref_seq.non_gap_count();
    AlignmentBlock {
      ref_name: "chr1".to_string(),
      ref_start: 0,
      ref_end,
      ref_seq,
      rows,
    }
  }

  #[test]
  fn s6_non_visible_insertion_does_not_expand_visible_output() {
    let b = block(
      "AC--GTAC",
      vec![row("a1", "AC--GTAC"), row("a2", "AC--GTAC"), row("a3", "ACTTGTAC")],
    );
    let visible = vec!["a1".to_string(), "a2".to_string()];
    let options = FastaOptions { show_all_letters: true, include_insertions: true };
    let out = materialize(0, 6, &visible, vec![b], options);

    assert_eq!(out["a1"], b"acgtac".to_vec());
    assert_eq!(out["a2"], b"acgtac".to_vec());
    assert_eq!(out.len(), 2);
  }

  #[test]
  fn visible_insertion_expands_output_for_all_visible_samples() {
    let b = block("AC--GT", vec![row("a1", "ACTTGT"), row("a2", "AC--GT")]);
    let visible = vec!["a1".to_string(), "a2".to_string()];
    let options = FastaOptions { show_all_letters: true, include_insertions: true };
    let out = materialize(0, 4, &visible, vec![b], options);

    assert_eq!(out["a1"], b"acttgt".to_vec());
    assert_eq!(out["a2"], b"ac--gt".to_vec());
  }

  #[test]
  fn no_insertions_requested_ignores_reference_gaps() {
    let b = block("AC--GT", vec![row("a1", "ACTTGT")]);
    let visible = vec!["a1".to_string()];
    let options = FastaOptions { show_all_letters: true, include_insertions: false };
    let out = materialize(0, 4, &visible, vec![b], options);
    assert_eq!(out["a1"], b"acgt".to_vec());
  }

  #[test]
  fn show_all_letters_false_renders_dots() {
    let b = block("ACGT", vec![row("a1", "ACGT")]);
    let visible = vec!["a1".to_string()];
    let options = FastaOptions { show_all_letters: false, include_insertions: false };
    let out = materialize(0, 4, &visible, vec![b], options);
    assert_eq!(out["a1"], b"....".to_vec());
  }

  #[test]
  fn samples_absent_from_any_block_stay_gap_filled() {
    let out = materialize(0, 5, &["ghost".to_string()], Vec::new(), FastaOptions::default());
    assert_eq!(out["ghost"], vec![b'-'; 5]);
  }

  #[test]
  fn includeinsertions_with_gapless_reference_matches_without() {
    let b = block("ACGT", vec![row("a1", "ACGT")]);
    let visible = vec!["a1".to_string()];
    let with = materialize(
      0,
      4,
      &visible,
      vec![b.clone()],
      FastaOptions { show_all_letters: true, include_insertions: true },
    );
    let without = materialize(
      0,
      4,
      &visible,
      vec![b],
      FastaOptions { show_all_letters: true, include_insertions: false },
    );
    assert_eq!(with["a1"], without["a1"]);
  }
}
