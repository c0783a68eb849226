//! Money-string canonicalization.
//!
//! Accepts the formats business spreadsheets actually contain: currency
//! symbols or codes, European and Anglo thousands/decimal separators, and
//! `k`/`m` magnitude suffixes. Returns `None` for anything that does not
//! reduce to a finite non-negative number - the caller records the miss as
//! a note instead of failing the item.

use crate::models::RawBudget;

/// Parse a raw budget into a non-negative amount.
pub fn parse_budget(raw: &RawBudget) -> Option<f64> {
    match raw {
        RawBudget::Number(n) if n.is_finite() && *n >= 0.0 => Some(*n),
        RawBudget::Number(_) => None,
        RawBudget::Text(s) => parse_money(s),
    }
}

/// Parse a money-like string: "€1.500.000", "1,500,000.50", "250k", "1.5m".
pub fn parse_money(input: &str) -> Option<f64> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }

    let (body, multiplier) = split_magnitude_suffix(&trimmed);

    // Strip currency symbols, codes, and spacing; keep digits, separators,
    // and a leading minus (rejected later, but kept so "-5" parses as -5
    // and is reported as negative rather than as garbage).
    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = normalize_separators(&cleaned)?;
    let value: f64 = normalized.parse().ok()?;
    let value = value * multiplier;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Split a trailing magnitude suffix: k ×1_000, m/mln ×1_000_000.
fn split_magnitude_suffix(s: &str) -> (&str, f64) {
    for (suffix, mult) in [("mln", 1_000_000.0), ("m", 1_000_000.0), ("k", 1_000.0)] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            // Only treat as magnitude when it follows a digit ("250k"),
            // not a currency code ("dkk").
            if stripped.trim_end().ends_with(|c: char| c.is_ascii_digit()) {
                return (stripped, mult);
            }
        }
    }
    (s, 1.0)
}

/// Reduce mixed `.`/`,` usage to a plain decimal-point number string.
fn normalize_separators(s: &str) -> Option<String> {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    let out = match (dots, commas) {
        (0, 0) => s.to_string(),
        // Both present: the last separator is the decimal mark.
        (d, c) if d > 0 && c > 0 => {
            let last_dot = s.rfind('.')?;
            let last_comma = s.rfind(',')?;
            if last_dot > last_comma {
                s.replace(',', "")
            } else {
                s.replace('.', "").replace(',', ".")
            }
        }
        // Single separator kind, multiple occurrences: thousands grouping.
        (d, 0) if d > 1 => s.replace('.', ""),
        (0, c) if c > 1 => s.replace(',', ""),
        // One occurrence: exactly three trailing digits reads as grouping
        // ("1.500" → 1500), anything else as a decimal mark ("1.5" → 1.5).
        (1, 0) => {
            let after = s.len() - s.rfind('.')? - 1;
            if after == 3 {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (0, 1) => {
            let after = s.len() - s.rfind(',')? - 1;
            if after == 3 {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        _ => s.to_string(),
    };
    Some(out)
}
