//! TAF block reconstructor (§4.5, C5) — the hard part: a stateful fold over coordinate and
//! bases-only lines that carries the previous block's row list forward, replays row
//! instructions, and transposes accumulated columns into row-major sequences.

use crate::codec::PackedSeq;
use crate::instructions::{parse_instructions, rewrite_for_indexed_start, RowInstruction};
use crate::model::{resolve_ref_seq, AlignmentBlock, Row, Strand};
use crate::names::resolve_reference;
use crate::status::{report, StatusCallback};

/// How often (in processed lines) the `"Processing line N"` status marker (§7) fires.
const STATUS_LINE_INTERVAL: u64 = 1000;

/// A row's structural state while a block is being accumulated: everything but the bases, which
/// live in the column accumulator until finalization (§4.5.1).
#[derive(Debug, Clone)]
struct RowState {
  assembly_name: String,
  chr: String,
  start: u32,
  strand: Strand,
  src_size: u32,
}

/// Strips an optional `" @..."` tag suffix used by TAF for block annotations; the core does not
/// interpret tags.
fn strip_tag(s: &str) -> &str {
  match s.find(" @") {
    Some(idx) => &s[..idx],
    None => s,
  }
}

/// Decodes one column's bases token. Without RLE, each byte is one row's base, in row order.
/// With RLE (§4.5.2), the token is alternating `(base-char, decimal-count)` pairs expanded in
/// place; an empty token or a zero count contribute no bytes.
fn parse_column_bases(token: &str, rle: bool) -> Vec<u8> {
  if !rle {
    return token.as_bytes().to_vec();
  }

  let bytes = token.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    let base = bytes[i];
    i += 1;
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
      i += 1;
    }
    if digits_start == i {
      out.push(base);
      continue;
    }
    let count: u32 = token[digits_start..i].parse().unwrap_or(0);
    out.extend(std::iter::repeat(base).take(count as usize));
  }
  out
}

/// Applies a parsed instruction vector to a row list in place (§4.4/§4.5 step d).
fn apply_instructions(rows: &mut Vec<RowState>, instructions: &[RowInstruction]) {
  for instruction in instructions {
    match instruction {
      RowInstruction::Insert { row, assembly_name, chr, start, strand, src_size } => {
        let idx = (*row).min(rows.len());
        rows.insert(
          idx,
          RowState {
            assembly_name: assembly_name.clone(),
            chr: chr.clone(),
            start: *start,
            strand: *strand,
            src_size: *src_size,
          },
        );
      }
      RowInstruction::Substitute { row, assembly_name, chr, start, strand, src_size } => {
        let replacement = RowState {
          assembly_name: assembly_name.clone(),
          chr: chr.clone(),
          start: *start,
          strand: *strand,
          src_size: *src_size,
        };
        match rows.get_mut(*row) {
          Some(slot) => *slot = replacement,
          None => rows.push(replacement),
        }
      }
      RowInstruction::Delete { row } => {
        if *row < rows.len() {
          rows.remove(*row);
        }
      }
      RowInstruction::Gap { row, gap_len } => {
        if let Some(slot) = rows.get_mut(*row) {
          slot.start += gap_len;
        }
      }
      RowInstruction::GapSubstring { row, gap_substring } => {
        if let Some(slot) = rows.get_mut(*row) {
          slot.start += gap_substring.len() as u32;
        }
      }
    }
  }
}

/// Transposes `columns` (one entry per accumulated line, each a row-indexed byte vector) into
/// `rows.len()` row-major packed sequences. Each row gets its own pre-sized `columns.len()`-byte
/// buffer written in a single pass — not an accumulating `bases += byte` loop, which would be
/// `O(columns² )` at the sizes this format targets.
fn finalize(rows: &[RowState], columns: &[Vec<u8>]) -> Vec<Row> {
  let num_rows = rows.len();
  let num_columns = columns.len();
  let mut bases: Vec<Vec<u8>> = (0..num_rows).map(|_| vec![b'-'; num_columns]).collect();

  for (col_idx, column) in columns.iter().enumerate() {
    for (row_idx, &base) in column.iter().enumerate() {
      // A column longer than the row list has no row to receive the extra entries; they are
      // simply dropped (§4.5.4).
      if let Some(row_bases) = bases.get_mut(row_idx) {
        row_bases[col_idx] = base;
      }
    }
  }

  rows
    .iter()
    .zip(bases)
    .map(|(state, row_bases)| Row {
      assembly_name: state.assembly_name.clone(),
      chr: state.chr.clone(),
      start: state.start,
      src_size: state.src_size,
      strand: state.strand,
      seq: PackedSeq::encode(&row_bases),
    })
    .collect()
}

/// Streams [`AlignmentBlock`]s out of a decoded TAF body, filtered to `[query_start, query_end)`
/// (§4.5.3). Blocks outside the query window are still constructed (their row state feeds the
/// next block) but never returned — only `O(one block)` is held at a time.
pub struct TafReconstructor {
  body: String,
  pos: usize,
  rle: bool,
  query_start: u32,
  query_end: u32,
  configured_ref: Option<String>,
  query_assembly: Option<String>,
  prev_rows: Option<Vec<Row>>,
  current_rows: Option<Vec<RowState>>,
  columns: Vec<Vec<u8>>,
  is_first_coord_line: bool,
  done: bool,
  lines_processed: u64,
  status: Option<StatusCallback>,
}

impl TafReconstructor {
  pub fn new(
    body: impl Into<String>,
    query_start: u32,
    query_end: u32,
    configured_ref: Option<String>,
    query_assembly: Option<String>,
  ) -> Self {
    let body = body.into();
    let rle = body
      .lines()
      .next()
      .map(|header| header.starts_with("#taf") && header.contains("run_length_encode_bases:1"))
      .unwrap_or(false);

    Self {
      body,
      pos: 0,
      rle,
      query_start,
      query_end,
      configured_ref,
      query_assembly,
      prev_rows: None,
      current_rows: None,
      columns: Vec::new(),
      is_first_coord_line: true,
      done: false,
      lines_processed: 0,
      status: None,
    }
  }

  /// Attaches a status callback (§7), reported roughly every [`STATUS_LINE_INTERVAL`] lines.
  pub fn with_status(mut self, status: StatusCallback) -> Self {
    self.status = Some(status);
    self
  }

  fn build_block(&self, rows: Vec<Row>) -> AlignmentBlock {
    let ref_seq = resolve_ref_seq(
      &rows,
      self.configured_ref.as_deref(),
      self.query_assembly.as_deref(),
    );
    let order: Vec<String> = rows.iter().map(|row| row.assembly_name.clone()).collect();
    let ref_assembly = resolve_reference(
      &order,
      self.configured_ref.as_deref(),
      self.query_assembly.as_deref(),
    );
    let ref_row = ref_assembly.and_then(|assembly| rows.iter().find(|r| r.assembly_name == assembly));

    let ref_name = ref_row
      .map(|row| {
        if row.chr.is_empty() {
          row.assembly_name.clone()
        } else {
          format!("{}.{}", row.assembly_name, row.chr)
        }
      })
      .unwrap_or_default();
    let ref_start = ref_row.map(|row| row.start).unwrap_or(0);
    let ref_end = ref_start + ref_seq.non_gap_count();

    AlignmentBlock { ref_name, ref_start, ref_end, ref_seq, rows }
  }

  /// Finalizes the in-progress block (if any), records it as the new `prev_rows`, and returns the
  /// built block for the caller to filter.
  fn finalize_current(&mut self) -> Option<AlignmentBlock> {
    let rows = self.current_rows.take()?;
    if self.columns.is_empty() {
      return None;
    }
    let columns = std::mem::take(&mut self.columns);
    let finalized = finalize(&rows, &columns);
    self.prev_rows = Some(finalized.clone());
    Some(self.build_block(finalized))
  }

  fn start_next_block(&mut self, instructions_text: &str) {
    let mut instructions = parse_instructions(instructions_text);
    if self.is_first_coord_line {
      instructions = rewrite_for_indexed_start(instructions);
      self.is_first_coord_line = false;
    }

    let mut rows: Vec<RowState> = match &self.prev_rows {
      Some(prev) => prev
        .iter()
        .map(|row| RowState {
          assembly_name: row.assembly_name.clone(),
          chr: row.chr.clone(),
          start: row.start + row.aligned_span(),
          strand: row.strand,
          src_size: row.src_size,
        })
        .collect(),
      None => Vec::new(),
    };
    apply_instructions(&mut rows, &instructions);
    self.current_rows = Some(rows);
  }

  /// Pulls the next `\n`-terminated line out of the owned buffer without allocating. `body` and
  /// `pos` are disjoint fields, so this can hand back a borrow of `self.body` after advancing
  /// `self.pos`.
  fn next_raw_line(&mut self) -> Option<&str> {
    if self.pos >= self.body.len() {
      return None;
    }
    let rest = &self.body[self.pos..];
    let (line, consumed) = match rest.find('\n') {
      Some(idx) => (&rest[..idx], idx + 1),
      None => (rest, rest.len()),
    };
    self.pos += consumed;
    Some(line)
  }
}

impl Iterator for TafReconstructor {
  type Item = AlignmentBlock;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if self.done {
        return None;
      }

      let Some(raw_line) = self.next_raw_line() else {
        self.done = true;
        let block = self.finalize_current();
        return block.filter(|b| b.overlaps(self.query_start, self.query_end));
      };

      // Copied out of the owned buffer immediately: the rest of this iteration needs several
      // `&mut self` calls, which can't coexist with a borrow of `self.body`.
      let line = raw_line.trim_end().to_string();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }

      self.lines_processed += 1;
      if self.lines_processed % STATUS_LINE_INTERVAL == 0 {
        report(self.status.as_ref(), &format!("Processing line {}", self.lines_processed));
      }

      if let Some(sep) = line.find(" ; ") {
        let left = strip_tag(&line[..sep]).to_string();
        let right = strip_tag(&line[sep + 3..]).to_string();

        let finished = self.finalize_current();
        self.start_next_block(&right);
        self.columns.push(parse_column_bases(&left, self.rle));

        if let Some(block) = finished {
          if block.overlaps(self.query_start, self.query_end) {
            return Some(block);
          }
        }
      } else if self.current_rows.is_some() {
        self.columns.push(parse_column_bases(&line, self.rle));
      }
      // A bases-only line before any coordinate line has been seen is skipped (§4.5 step 3).
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect(body: &str, qs: u32, qe: u32) -> Vec<AlignmentBlock> {
    TafReconstructor::new(body, qs, qe, None, None).collect()
  }

  #[test]
  fn s1_minimal_two_row_block() {
    let body = "#taf version:1\nACGT ; i 0 hg38.chr1 100 + 1000 i 1 mm10.chr1 200 + 2000\nACGT\nACGT\n";
    let blocks = collect(body, 0, 1_000_000);
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.ref_name, "hg38.chr1");
    assert_eq!(block.ref_start, 100);
    assert_eq!(block.ref_end, 103);
    assert_eq!(block.row("hg38").unwrap().seq.decode(), b"AAA");
    assert_eq!(block.row("mm10").unwrap().seq.decode(), b"CCC");
  }

  #[test]
  fn s2_gap_instruction_advances_start() {
    let body = "#taf version:1\nACGT ; i 0 hg38.chr1 100 + 1000 i 1 mm10.chr1 200 + 2000\nACGT\nACGT\nAC ; g 1 50\n";
    let blocks = collect(body, 0, 1_000_000);
    assert_eq!(blocks.len(), 2);
    let second = &blocks[1];
    assert_eq!(second.row("hg38").unwrap().start, 103);
    assert_eq!(second.row("mm10").unwrap().start, 253);
  }

  #[test]
  fn s3_delete_removes_row() {
    let body = "#taf version:1\nABC ; i 0 a.c1 0 + 10 i 1 b.c1 0 + 10 i 2 c.c1 0 + 10\nAB ; d 2\n";
    let blocks = collect(body, 0, 1_000_000);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].rows.len(), 2);
    assert!(blocks[1].row("c").is_none());
  }

  #[test]
  fn s4_indexed_position_rewrite() {
    let body =
      "AC ; d 2 d 2 s 0 ce10.chrI 2272337 + 15072423 s 1 caeSp111.Scaffold80 35303 - 57550\n";
    let blocks = collect(body, 0, 3_000_000);
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    let ce10 = block.row("ce10").unwrap();
    assert_eq!(ce10.start, 2272337);
    assert_eq!(ce10.strand.as_i8(), 1);
    let caesp = block.row("caeSp111").unwrap();
    assert_eq!(caesp.start, 35303);
    assert_eq!(caesp.strand.as_i8(), -1);
  }

  #[test]
  fn rle_expands_runs() {
    let body = "#taf version:1 run_length_encode_bases:1\nA3C2 ; i 0 a.c1 0 + 100 i 1 b.c1 0 + 100 i 2 c.c1 0 + 100 i 3 d.c1 0 + 100 i 4 e.c1 0 + 100\n";
    let blocks = collect(body, 0, 1_000_000);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].rows[0].seq.decode(), b"A");
    assert_eq!(blocks[0].rows[2].seq.decode(), b"A");
    assert_eq!(blocks[0].rows[3].seq.decode(), b"C");
  }

  #[test]
  fn query_filter_drops_blocks_outside_window_but_keeps_carrying_state() {
    let body = "#taf version:1\nAAAA ; i 0 a.c1 0 + 1000\nAAAA\nCCCC ; g 0 100\nCCCC\n";
    // First block spans [0, 2); it is dropped by the filter but its state (start advanced by
    // its own non-gap count, then by the `g 0 100` gap) still carries forward to the second.
    let blocks = collect(body, 100, 110);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].row("a").unwrap().start, 102);
  }

  #[test]
  fn unexpected_eof_mid_block_still_yields_its_one_column() {
    let body = "#taf version:1\nAAAA ; i 0 a.c1 0 + 1000\nAAAA\nCCCC ; g 0 100\n";
    // The last coordinate line starts a new block and the input ends right after, with no
    // bases-only continuation line. It still carries its own coordinate-line column, so by
    // §4.5.4 it is yielded rather than silently dropped.
    let blocks = collect(body, 0, 1_000_000);
    assert_eq!(blocks.len(), 2);
  }

  #[test]
  fn empty_rle_token_and_zero_count_contribute_nothing() {
    assert_eq!(parse_column_bases("", true), Vec::<u8>::new());
    assert_eq!(parse_column_bases("A0C1", true), b"C".to_vec());
  }

  #[test]
  fn status_callback_fires_every_thousand_lines() {
    use crate::status::StatusCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let mut body = String::from("#taf version:1\nACGT ; i 0 a.c1 0 + 1000\n");
    for _ in 0..1100 {
      body.push_str("ACGT\n");
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let status = {
      let calls = calls.clone();
      StatusCallback::new(move |message| {
        assert!(message.starts_with("Processing line"));
        calls.fetch_add(1, Ordering::SeqCst);
      })
    };

    let reconstructor =
      TafReconstructor::new(body, 0, 1_000_000, None, None).with_status(status);
    let _: Vec<_> = reconstructor.collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
