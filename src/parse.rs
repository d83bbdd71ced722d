//! Normalizes one raw registry line into an [`RpcEntry`].
//!
//! Both backends hand over lines in the same format:
//!
//! ```text
//! name <ws> number [<ws> alias]* [# comment]
//! ```
//!
//! where `<ws>` is any run of spaces and tabs. Lines that do not describe a
//! program (comments, blank lines, a name with no blank after it) yield `None`;
//! skipping them is the caller's business.

use crate::entry::{RpcEntry, MAX_ALIASES};

/// Longest line considered; anything past it is cut off.
pub const MAX_LINE_LEN: usize = 8192;

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parses one line. The trailing newline, if any, is optional.
pub fn interpret(line: &[u8]) -> Option<RpcEntry> {
    let line = &line[..line.len().min(MAX_LINE_LEN)];
    if line.first() == Some(&b'#') {
        return None;
    }
    let end = line.iter().position(|&b| b == b'#' || b == b'\n').unwrap_or(line.len());
    let line = &line[..end];

    if line.iter().all(|&b| is_blank(b)) {
        return None;
    }

    // A line starting with a blank has an empty name.
    let split = line.iter().position(|&b| is_blank(b))?;
    let name = &line[..split];

    let rest = &line[split + 1..];
    let rest = &rest[rest.iter().position(|&b| !is_blank(b)).unwrap_or(rest.len())..];
    let number = parse_number(rest);

    // Whatever follows the number token is the alias list.
    let aliases = match rest.iter().position(|&b| is_blank(b)) {
        Some(pos) => rest[pos..]
            .split(|&b| is_blank(b))
            .filter(|token| !token.is_empty())
            .take(MAX_ALIASES)
            .map(text)
            .collect(),
        None => Vec::new(),
    };

    Some(RpcEntry { name: text(name), aliases, number })
}

/// Leading decimal integer with an optional sign, `0` when there is none.
/// Out-of-range values saturate.
fn parse_number(token: &[u8]) -> i32 {
    let (negative, digits) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
