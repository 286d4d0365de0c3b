//! Long-format directory listing parser
//!
//! `ls -la` output is not a format, it is a family of dialects. Three are
//! supported:
//!
//! - GNU with `--time-style=long-iso`: date and time are two tokens
//!   (`2024-03-01 12:30`)
//! - GNU/BusyBox default: month, day, then time-of-day or year
//!   (`Mar  1 12:30` / `Mar  1  2023`)
//! - anything narrower: degraded mode, only the name is recovered
//!
//! The policy throughout is "never crash, degrade silently": a row that
//! defeats the heuristics still yields an entry with zero/empty fields. A
//! filename containing date-like tokens can misparse — that soft failure is
//! deliberately preferred over rejecting rows on minimal container images.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// One parsed directory entry. Ordering of a listing follows the remote
/// command's own output order; nothing is re-sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// The raw mode string, e.g. `drwxr-xr-x`
    pub raw_mode: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// None when the row's dialect did not carry a parseable timestamp
    pub mod_time: Option<NaiveDateTime>,
    /// Three-digit octal string (`"755"`), empty for malformed mode strings
    pub octal_permissions: String,
}

/// Parse raw long-listing text into entries. `.` and `..` are excluded,
/// as are blank lines and the leading `total` summary.
pub fn parse_listing(raw: &str) -> Vec<FileEntry> {
    raw.lines()
        .filter_map(parse_row)
        .filter(|entry| entry.name != "." && entry.name != "..")
        .collect()
}

fn parse_row(line: &str) -> Option<FileEntry> {
    let line = line.trim_end_matches('\r');
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("total") {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mode = *tokens.first()?;
    let is_dir = mode.starts_with('d');
    let is_symlink = mode.starts_with('l');

    let (size, mod_time, name) = if tokens.len() >= 8 && looks_like_iso_date(tokens[5]) {
        // ISO dialect: ... size date time name...
        (
            tokens[4].parse().unwrap_or(0),
            parse_iso_timestamp(tokens[5], tokens[6]),
            tokens[7..].join(" "),
        )
    } else if tokens.len() >= 9 {
        // month/day/(time-or-year) dialect: ... size Mon DD TT name...
        (
            tokens[4].parse().unwrap_or(0),
            parse_month_timestamp(tokens[5], tokens[6], tokens[7]),
            tokens[8..].join(" "),
        )
    } else {
        // Degraded: only the name is recoverable
        (0, None, tokens.last()?.to_string())
    };

    // Symlink rows carry `name -> target`; keep only the name
    let name = match name.find(" -> ") {
        Some(arrow) => name[..arrow].to_string(),
        None => name,
    };

    Some(FileEntry {
        octal_permissions: mode_to_octal(mode),
        raw_mode: mode.to_string(),
        name,
        size,
        is_dir,
        is_symlink,
        mod_time,
    })
}

/// Hyphenated date token, the ISO-dialect discriminator
fn looks_like_iso_date(token: &str) -> bool {
    token.len() >= 8 && token.contains('-') && token.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn parse_iso_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(date.and_time(time))
}

fn parse_month_timestamp(month: &str, day: &str, time_or_year: &str) -> Option<NaiveDateTime> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;

    // Time-of-day first; recent files carry no year, so default to the
    // current one
    if let Ok(time) = NaiveTime::parse_from_str(time_or_year, "%H:%M") {
        let date = NaiveDate::from_ymd_opt(Utc::now().year(), month, day)?;
        return Some(date.and_time(time));
    }

    let year: i32 = time_or_year.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(NaiveTime::MIN))
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Convert the 9-character rwx portion of a mode string to a 3-digit octal
/// string by summing 4/2/1 per triad. Mode strings shorter than 10
/// characters yield an empty string rather than a guess.
pub fn mode_to_octal(mode: &str) -> String {
    let bytes = mode.as_bytes();
    if bytes.len() < 10 {
        return String::new();
    }

    let mut octal = String::with_capacity(3);
    for triad in bytes[1..10].chunks(3) {
        let mut value = 0u8;
        if triad[0] == b'r' {
            value += 4;
        }
        if triad[1] == b'w' {
            value += 2;
        }
        // setuid/setgid/sticky render as s/t in the execute slot
        if matches!(triad[2], b'x' | b's' | b't') {
            value += 1;
        }
        octal.push((b'0' + value) as char);
    }
    octal
}
