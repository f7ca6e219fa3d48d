//! Rendering state / pixel-span geometry (§4.11, C11). Only the column->pixel coordinate math and
//! hit-test tuple emission live here; the canvas and the spatial index itself are both external.

use std::collections::HashMap;

use crate::model::{AlignmentBlock, Row};

/// One emitted hit-test span, ready to be handed to an external spatial index.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSpan {
  pub min_x: f64,
  pub min_y: f64,
  pub max_x: f64,
  pub max_y: f64,
  pub pos: u32,
  pub chr: String,
  pub base: char,
  pub row_index: usize,
}

/// What kind of alignment column a span represents, carried only for caller convenience — the
/// geometry emitted is identical regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
  Match,
  Mismatch,
  Gap,
  Insertion,
}

/// Per-row pixel-space rendering state: tracks the last x a span was emitted at, so repeated
/// columns at sub-pixel resolution collapse into one span (§4.11).
#[derive(Debug, Default)]
pub struct RenderState {
  last_x: HashMap<usize, f64>,
}

impl RenderState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Emits pixel spans for `rows` (the block's visible rows, via [`crate::model::visible_rows`],
  /// in display order), at row height `row_height_px` starting at `row_index_offset`. `bp_per_px`
  /// is the zoom level; `scale = 1 / bp_per_px` converts a reference-space coordinate to pixel
  /// space.
  pub fn emit_block<'a>(
    &mut self,
    block: &AlignmentBlock,
    rows: impl IntoIterator<Item = &'a Row>,
    bp_per_px: f64,
    row_index_offset: usize,
    row_height_px: f64,
  ) -> Vec<PixelSpan> {
    let scale = 1.0 / bp_per_px;
    let gate = 1.0 * bp_per_px.max(1.0);
    let mut spans = Vec::new();

    for (i, row) in rows.into_iter().enumerate() {
      let row_index = row_index_offset + i;
      let min_y = row_index as f64 * row_height_px;
      let max_y = min_y + row_height_px;

      let mut ref_cursor = block.ref_start;
      let columns = block.ref_seq.len().max(row.seq.len());

      for col in 0..columns {
        let ref_is_gap = col >= block.ref_seq.len() || block.ref_seq.is_gap(col);
        let row_is_gap = col >= row.seq.len() || row.seq.is_gap(col);

        let (pos, kind) = if ref_is_gap && !row_is_gap {
          (ref_cursor, ColumnKind::Insertion)
        } else if !ref_is_gap {
          let kind = if row_is_gap {
            ColumnKind::Gap
          } else if row.seq.base_at_lower(col) == block.ref_seq.base_at_lower(col) {
            ColumnKind::Match
          } else {
            ColumnKind::Mismatch
          };
          (ref_cursor, kind)
        } else {
          // Reference gap, row gap too: no column to render, no cursor advance.
          continue;
        };

        // Pixel x tracks the alignment column index, not the reference coordinate: an insertion
        // run and the reference column that follows it are distinct columns and must land at
        // distinct x, even though they share the same (unadvanced) `pos`.
        let x = col as f64 * scale;
        let last = self.last_x.get(&row_index).copied();
        let gated = last.is_some_and(|last_x| (x - last_x).abs() <= gate);

        if !gated {
          let base = if row_is_gap { '-' } else { row.seq.base_at_lower(col) };
          spans.push(PixelSpan {
            min_x: x,
            min_y,
            max_x: x + scale,
            max_y,
            pos,
            chr: block.ref_name.clone(),
            base,
            row_index,
          });
          self.last_x.insert(row_index, x);
        }

        let _ = kind;
        if !ref_is_gap {
          ref_cursor += 1;
        }
      }
    }

    spans
  }
}
