//! Number formatting for SVG path data and attributes.
//!
//! Coordinates are rounded half-up to 3 fractional digits and printed without trailing
//! zeros, so `45.0` prints as `45` and `46.66666` as `46.667`. Non-finite values and
//! values that round to zero print as `0`.

use std::fmt::Write as _;

pub fn fmt_num(v: f64) -> String {
    let mut out = String::new();
    fmt_num_into(&mut out, v);
    out
}

pub fn fmt_num_into(out: &mut String, v: f64) {
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }

    let k = (v * 1000.0 + 0.5).floor() as i64;
    if k == 0 {
        out.push('0');
        return;
    }
    append_fixed_3dp_trimmed(out, k);
}

fn append_fixed_3dp_trimmed(out: &mut String, k: i64) {
    let abs = k.unsigned_abs();
    let int_part = abs / 1000;
    let frac = abs % 1000;

    if k.is_negative() {
        out.push('-');
    }
    let _ = write!(out, "{int_part}");

    if frac == 0 {
        return;
    }

    let digits = [
        b'0' + (frac / 100) as u8,
        b'0' + ((frac / 10) % 10) as u8,
        b'0' + (frac % 10) as u8,
    ];
    let mut end = digits.len();
    while end > 0 && digits[end - 1] == b'0' {
        end -= 1;
    }
    out.push('.');
    for &b in &digits[..end] {
        out.push(b as char);
    }
}
