//! Small markup helpers for the external wire format
//!
//! The envelope is assembled by hand into a `String`; the helpers here keep
//! escaping and element syntax in one place so the codec proper reads as
//! the accounting layout it describes.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Escape free text for element content and attribute values
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Append `<NAME>value</NAME>`, escaping the value
pub fn tag(buf: &mut String, name: &str, value: &str) {
    buf.push('<');
    buf.push_str(name);
    buf.push('>');
    buf.push_str(&escape(value));
    buf.push_str("</");
    buf.push_str(name);
    buf.push('>');
}

/// Append an opening element
pub fn open(buf: &mut String, name: &str) {
    buf.push('<');
    buf.push_str(name);
    buf.push('>');
}

/// Append a closing element
pub fn close(buf: &mut String, name: &str) {
    buf.push_str("</");
    buf.push_str(name);
    buf.push('>');
}

/// Dates travel as compact year-month-day
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Amounts travel with exactly two decimal places
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
