//! The `.tai` index (§4.3, C3): per-refName sorted virtual-offset arrays, with binary search for
//! the `(firstEntry, nextEntry)` pair a query needs to bound its read.

use std::collections::HashMap;

use noodles::bgzf::VirtualPosition;

/// One `.tai` row, resolved to absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaiEntry {
  pub chr_start: u32,
  pub voffset: VirtualPosition,
}

/// The parsed `.tai` file: `refName -> entries sorted by chrStart`.
#[derive(Debug, Clone, Default)]
pub struct TaiIndex {
  by_ref_name: HashMap<String, Vec<TaiEntry>>,
}

/// First index `i` such that `list[i].chr_start >= x` (standard `lower_bound`).
fn lower_bound(list: &[TaiEntry], x: u32) -> usize {
  list.partition_point(|entry| entry.chr_start < x)
}

impl TaiIndex {
  /// Parses a `.tai` file's text. Lines are tab-separated `(chr, chrStart, virtualOffset)`; a
  /// literal `*` in the `chr` column means both numeric columns are deltas against the previous
  /// row's absolute values, and the refName carries over unchanged. A fully qualified absolute
  /// `chr` (`assembly.chrX`) is reduced to the substring after the last `.`. Malformed rows are
  /// skipped (§7 Malformed input: recover locally).
  pub fn parse(text: &str) -> Self {
    let mut by_ref_name: HashMap<String, Vec<TaiEntry>> = HashMap::new();
    let mut prev_ref_name: Option<String> = None;
    let mut prev_chr_start: u32 = 0;
    let mut prev_voffset: u64 = 0;

    for line in text.lines() {
      let line = line.trim_end();
      if line.is_empty() {
        continue;
      }
      let mut fields = line.split('\t');
      let (Some(chr_field), Some(start_field), Some(voff_field)) =
        (fields.next(), fields.next(), fields.next())
      else {
        continue;
      };

      let resolved = if chr_field == "*" {
        let Some(ref_name) = prev_ref_name.clone() else {
          continue;
        };
        let (Ok(delta_start), Ok(delta_voff)) =
          (start_field.parse::<i64>(), voff_field.parse::<i64>())
        else {
          continue;
        };
        let chr_start = (prev_chr_start as i64 + delta_start) as u32;
        let voffset_raw = (prev_voffset as i64 + delta_voff) as u64;
        (ref_name, chr_start, voffset_raw)
      } else {
        let ref_name = match chr_field.rsplit_once('.') {
          Some((_, chr)) => chr.to_string(),
          None => chr_field.to_string(),
        };
        let (Ok(chr_start), Ok(voffset_raw)) =
          (start_field.parse::<u32>(), voff_field.parse::<u64>())
        else {
          continue;
        };
        (ref_name, chr_start, voffset_raw)
      };

      let (ref_name, chr_start, voffset_raw) = resolved;
      prev_ref_name = Some(ref_name.clone());
      prev_chr_start = chr_start;
      prev_voffset = voffset_raw;

      by_ref_name.entry(ref_name).or_default().push(TaiEntry {
        chr_start,
        voffset: VirtualPosition::from(voffset_raw),
      });
    }

    for entries in by_ref_name.values_mut() {
      entries.sort_unstable_by_key(|entry| entry.chr_start);
    }

    Self { by_ref_name }
  }

  /// Whether any entries were indexed for `ref_name`.
  pub fn contains(&self, ref_name: &str) -> bool {
    self.by_ref_name.contains_key(ref_name)
  }

  /// Resolves `(firstEntry, nextEntry)` bounding `[q_start, q_end)` on `ref_name`. Returns `None`
  /// only if the refName is absent from the index entirely (§4.5.4: "yield an empty sequence; not
  /// an error" is the caller's responsibility). Never fails for an out-of-range query: the two
  /// entries may come out equal, which the caller turns into a single-block read.
  pub fn lookup(&self, ref_name: &str, q_start: u32, q_end: u32) -> Option<(TaiEntry, TaiEntry)> {
    let entries = self.by_ref_name.get(ref_name)?;
    if entries.is_empty() {
      return None;
    }

    let i = lower_bound(entries, q_start);
    let first = entries[i.checked_sub(1).unwrap_or(0)];

    let j = lower_bound(entries, q_end);
    let next = entries
      .get(j + 1)
      .copied()
      .unwrap_or_else(|| *entries.last().unwrap());

    Some((first, next))
  }
}
