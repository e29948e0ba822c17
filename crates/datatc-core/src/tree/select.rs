//! Name matching and date ranking used to pick children of a directory.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Outcome of matching a hint against a list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Exact(usize),
    /// The only name containing the hint, ignoring case.
    Unique(usize),
    Many(Vec<usize>),
    None,
}

/// Match `hint` against `names`: an exact name wins, otherwise every name
/// containing the hint case-insensitively is a candidate.
pub fn match_names<'a>(names: impl IntoIterator<Item = &'a str>, hint: &str) -> NameMatch {
    let needle = hint.to_lowercase();
    let mut candidates = Vec::new();
    for (i, name) in names.into_iter().enumerate() {
        if name == hint {
            return NameMatch::Exact(i);
        }
        if name.to_lowercase().contains(&needle) {
            candidates.push(i);
        }
    }
    match candidates.len() {
        0 => NameMatch::None,
        1 => NameMatch::Unique(candidates[0]),
        _ => NameMatch::Many(candidates),
    }
}

/// The first date (with optional time) embedded in a name.
///
/// Recognizes `YYYY-MM-DD`, `YYYY_MM_DD`, `YYYY.MM.DD`, `YYYY/MM/DD` and
/// `YYYYMMDD`, optionally followed by `[T_ -]HH[-:]MM[-:]SS`. Digits may not
/// run on either side of the date.
pub fn date_token(name: &str) -> Option<NaiveDateTime> {
    let bytes = name.as_bytes();
    (0..bytes.len()).find_map(|start| {
        if start > 0 && bytes[start - 1].is_ascii_digit() {
            return None;
        }
        date_at(bytes, start)
    })
}

fn digits(bytes: &[u8], at: usize, len: usize) -> Option<u32> {
    let run = bytes.get(at..at + len)?;
    if !run.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(run.iter().fold(0, |acc, d| acc * 10 + u32::from(*d - b'0')))
}

fn date_at(bytes: &[u8], start: usize) -> Option<NaiveDateTime> {
    let year = digits(bytes, start, 4)?;
    let mut pos = start + 4;
    let sep = bytes.get(pos).copied().filter(|c| b"-_./".contains(c));
    if sep.is_some() {
        pos += 1;
    }
    let month = digits(bytes, pos, 2)?;
    pos += 2;
    if let Some(sep) = sep {
        if bytes.get(pos) != Some(&sep) {
            return None;
        }
        pos += 1;
    }
    let day = digits(bytes, pos, 2)?;
    pos += 2;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    let time = time_at(bytes, pos).or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
    Some(date.and_time(time))
}

fn time_at(bytes: &[u8], pos: usize) -> Option<NaiveTime> {
    if !matches!(bytes.get(pos), Some(b'T' | b'_' | b' ' | b'-')) {
        return None;
    }
    let mut pos = pos + 1;
    let hour = digits(bytes, pos, 2)?;
    pos += 2;
    let sep = bytes.get(pos).copied().filter(|c| *c == b'-' || *c == b':');
    if sep.is_some() {
        pos += 1;
    }
    let minute = digits(bytes, pos, 2)?;
    pos += 2;
    if let Some(sep) = sep {
        if bytes.get(pos) != Some(&sep) {
            return None;
        }
        pos += 1;
    }
    let second = digits(bytes, pos, 2)?;
    pos += 2;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}
