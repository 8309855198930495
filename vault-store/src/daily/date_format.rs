//! Moment-style date patterns, as used by Obsidian's daily-notes `format` setting.
//!
//! Supported tokens: `YYYY YY MMMM MMM MM M DD D dddd ddd HH H mm m`.
//! Anything else is copied through literally.

use chrono::{Datelike, Timelike};

/// Longest first within each family so `MMMM` is never read as `MM` + `MM`
const TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "dddd", "ddd", "HH", "H", "mm", "m",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn format_date<T: Datelike + Timelike>(time: &T, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    'scan: while let Some(c) = rest.chars().next() {
        for token in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(&render_token(token, time));
                rest = tail;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn render_token<T: Datelike + Timelike>(token: &str, time: &T) -> String {
    let month_name = MONTH_NAMES[time.month0() as usize];
    let weekday_name = WEEKDAY_NAMES[time.weekday().num_days_from_monday() as usize];

    match token {
        "YYYY" => format!("{:04}", time.year()),
        "YY" => format!("{:02}", time.year().rem_euclid(100)),
        "MMMM" => month_name.to_string(),
        "MMM" => month_name[..3].to_string(),
        "MM" => format!("{:02}", time.month()),
        "M" => time.month().to_string(),
        "DD" => format!("{:02}", time.day()),
        "D" => time.day().to_string(),
        "dddd" => weekday_name.to_string(),
        "ddd" => weekday_name[..3].to_string(),
        "HH" => format!("{:02}", time.hour()),
        "H" => time.hour().to_string(),
        "mm" => format!("{:02}", time.minute()),
        "m" => time.minute().to_string(),
        _ => token.to_string(),
    }
}
