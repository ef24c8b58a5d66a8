//! Human-readable rendering of snapshot values.

use time::macros::offset;

use crate::UtcDateTime;

/// `1234500` -> `1,234,500`.
pub fn format_price(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Signed change with an explicit `+` for non-negative values.
pub fn format_change(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        format!("+{grouped}")
    }
}

/// Percent with explicit sign and two decimals, e.g. `+1.23%`.
pub fn format_pct(value: f64) -> String {
    if value < 0.0 {
        format!("{value:.2}%")
    } else {
        format!("+{:.2}%", value.abs())
    }
}

/// Korea Standard Time, `YYYY.MM.DD HH:MM KST`.
pub fn format_kst(timestamp: UtcDateTime) -> String {
    let kst = timestamp.into_inner().to_offset(offset!(+9));
    format!(
        "{:04}.{:02}.{:02} {:02}:{:02} KST",
        kst.year(),
        u8::from(kst.month()),
        kst.day(),
        kst.hour(),
        kst.minute()
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
