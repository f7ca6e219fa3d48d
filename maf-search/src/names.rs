//! Assembly/chr name parsing and reference-row resolution (§4.2, C2).

/// Splits an `assembly[.version].chr[.more]` token the "simple" way: on the *first* `.`. Used by
/// the BigMaf and TAF adapters. If there is no `.`, the whole token is the assembly name and the
/// chr is empty.
pub fn parse_simple(token: &str) -> (String, String) {
  match token.split_once('.') {
    Some((assembly, chr)) => (assembly.to_string(), chr.to_string()),
    None => (token.to_string(), String::new()),
  }
}

/// Splits an `assembly[.version].chr[.more]` token the MafTabix way: if the substring between the
/// first two dots is all decimal digits, it's an assembly version suffix and gets folded into the
/// assembly name; otherwise the first dot is the separator, same as [`parse_simple`]. With zero or
/// one dot this behaves exactly like [`parse_simple`].
///
/// This heuristic is preserved verbatim from the upstream `parseAssemblyAndChr`; it can
/// misclassify an assembly name that contains a numeric component followed by a chromosome with a
/// leading digit (e.g. `asm.2.chr2` vs. `asm.2.2`). See Open Question in spec §9.
pub fn parse_heuristic(token: &str) -> (String, String) {
  let Some(first_dot) = token.find('.') else {
    return (token.to_string(), String::new());
  };

  let rest = &token[first_dot + 1..];
  let Some(second_dot) = rest.find('.') else {
    return parse_simple(token);
  };

  let between = &rest[..second_dot];
  if !between.is_empty() && between.bytes().all(|b| b.is_ascii_digit()) {
    let assembly = &token[..first_dot + 1 + second_dot];
    let chr = &rest[second_dot + 1..];
    (assembly.to_string(), chr.to_string())
  } else {
    parse_simple(token)
  }
}

/// Reference-row resolution cascade (§4.2): explicit config override, then the query's assembly
/// name, then the first assembly observed in the block's row order. Returns `None` if no row
/// matches any of the three keys, in which case the block is still yielded with an empty
/// reference sequence (see the caller in `taf`/`bigmaf`/`maftabix`).
pub fn resolve_reference<'a>(
  row_order: &'a [String],
  configured: Option<&str>,
  query_assembly: Option<&str>,
) -> Option<&'a str> {
  for candidate in [configured, query_assembly].into_iter().flatten() {
    if let Some(found) = row_order.iter().find(|key| key.as_str() == candidate) {
      return Some(found.as_str());
    }
  }
  row_order.first().map(String::as_str)
}
