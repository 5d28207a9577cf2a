// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Number formatting used by canonical serials and waveform labels.
//!
//! The serials double as identity keys, so the output must be stable:
//! equal inputs always produce byte-identical text.

/// Format a float with six decimals, stripping trailing zeros and a bare
/// trailing decimal point, e.g. `0.5` -> `"0.5"`, `1.0` -> `"1"`.
pub fn format_float(value: f64) -> String {
    let formatted = format!("{value:.6}");
    if !formatted.contains('.') {
        // inf and NaN
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format an integer with `_` separating groups of three digits,
/// e.g. `200000000` -> `"200_000_000"`.
pub fn format_grouped(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('_');
        }
        grouped.push(digit);
    }
    grouped
}
