//! Small utility helpers used across modules.

/// Render a factorization as a product: `[2, 2, 3]` -> "2×2×3".
pub fn format_product(factors: &[u32]) -> String {
  factors.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("×")
}

/// Log-safe truncation for player-typed strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}
