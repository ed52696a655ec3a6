//! Evaluation of the scheduler's `${...}` date macros.
//!
//! A macro is a dot-separated chain of segments evaluated left to right:
//!
//! ```text
//! ${start("yyyyMMdd",-1)}                 yesterday, formatted
//! ${zdt.addDay(-1).format("yyyyMMdd")}    same thing, as a chain
//! ${zdt.add(2,-1).format("yyyy-MM-dd")}   one month back
//! ${zdt.getTime()}                        unix timestamp in seconds
//! ```
//!
//! Anything the interpreter does not understand is returned unchanged.
use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone,
    Timelike,
};
use regex::{Captures, Regex};

static MACRO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]+\}").expect("macro pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq)]
enum ExpressionValue {
    Unresolved,
    DateTime(NaiveDateTime),
    Text(String),
    Timestamp(i64),
}

#[derive(Debug, Clone, Copy)]
enum AddUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
}

impl AddUnit {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AddUnit::Year),
            2 => Some(AddUnit::Month),
            3 | 4 => Some(AddUnit::Week),
            5 => Some(AddUnit::Day),
            11 => Some(AddUnit::Hour),
            _ => None,
        }
    }
}

struct Segment<'a> {
    name: &'a str,
    args: Vec<&'a str>,
}

/// Evaluates macros against a fixed evaluation instant.
#[derive(Debug, Clone)]
pub struct ExpressionInterpreter {
    now: DateTime<FixedOffset>,
}

impl Default for ExpressionInterpreter {
    fn default() -> Self {
        Self::at(Local::now().fixed_offset())
    }
}

impl ExpressionInterpreter {
    /// Interpreter evaluating at the current local time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreter pinned to `now`; its offset is used by `getTime()`.
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    /// Evaluates a single macro, with or without its `${` `}` delimiters.
    /// Unrecognized macros come back as `${<chain>}`.
    pub fn evaluate(&self, text: &str) -> String {
        let chain = text.strip_prefix("${").unwrap_or(text);
        let chain = chain.strip_suffix('}').unwrap_or(chain);
        match self.evaluate_chain(chain) {
            ExpressionValue::Text(text) => text,
            ExpressionValue::Timestamp(ts) => ts.to_string(),
            ExpressionValue::DateTime(_) | ExpressionValue::Unresolved => {
                log::debug!("Leaving macro unexpanded: ${{{}}}", chain);
                format!("${{{}}}", chain)
            }
        }
    }

    /// Replaces every `${...}` occurrence in `script`. Substituted text is not
    /// scanned again.
    pub fn expand_all(&self, script: &str) -> String {
        MACRO_PATTERN
            .replace_all(script, |caps: &Captures| self.evaluate(&caps[0]))
            .into_owned()
    }

    fn evaluate_chain(&self, chain: &str) -> ExpressionValue {
        let mut value = ExpressionValue::Unresolved;
        for (i, segment_str) in split_top_level(chain, '.').into_iter().enumerate() {
            let Some(segment) = parse_segment(segment_str) else {
                return ExpressionValue::Unresolved;
            };
            value = if i == 0 {
                self.evaluate_first(&segment)
            } else {
                self.evaluate_method(value, &segment)
            };
            if value == ExpressionValue::Unresolved {
                return value;
            }
        }
        value
    }

    fn evaluate_first(&self, segment: &Segment) -> ExpressionValue {
        match (segment.name, segment.args.as_slice()) {
            ("start", [pattern, offset]) => {
                let (Some(pattern), Some(days)) = (unquote(pattern), parse_int(offset)) else {
                    return ExpressionValue::Unresolved;
                };
                match add_days(self.now.naive_local(), days) {
                    Some(dt) => ExpressionValue::Text(render(pattern, &dt)),
                    None => ExpressionValue::Unresolved,
                }
            }
            ("zdt", []) => ExpressionValue::DateTime(self.now.naive_local()),
            _ => ExpressionValue::Unresolved,
        }
    }

    fn evaluate_method(&self, value: ExpressionValue, segment: &Segment) -> ExpressionValue {
        let ExpressionValue::DateTime(dt) = value else {
            return ExpressionValue::Unresolved;
        };
        let shifted = match (segment.name, segment.args.as_slice()) {
            ("addDay", [days]) => parse_int(days).and_then(|days| add_days(dt, days)),
            ("add", [unit, n]) => {
                match (parse_int(unit).and_then(AddUnit::from_code), parse_int(n)) {
                    (Some(unit), Some(n)) => add(dt, unit, n),
                    _ => None,
                }
            }
            ("format", [pattern]) => {
                return match unquote(pattern) {
                    Some(pattern) => ExpressionValue::Text(render(pattern, &dt)),
                    None => ExpressionValue::Unresolved,
                };
            }
            ("getTime", []) => {
                return match self.now.offset().from_local_datetime(&dt).single() {
                    Some(local) => ExpressionValue::Timestamp(local.timestamp()),
                    None => ExpressionValue::Unresolved,
                };
            }
            _ => None,
        };
        shifted.map_or(ExpressionValue::Unresolved, ExpressionValue::DateTime)
    }
}

fn add(dt: NaiveDateTime, unit: AddUnit, n: i64) -> Option<NaiveDateTime> {
    match unit {
        AddUnit::Year => {
            let year = i32::try_from(i64::from(dt.year()).checked_add(n)?).ok()?;
            with_year_month(dt, year, dt.month())
        }
        AddUnit::Month => {
            let months = i64::from(dt.year())
                .checked_mul(12)?
                .checked_add(i64::from(dt.month0()))?
                .checked_add(n)?;
            let year = i32::try_from(months.div_euclid(12)).ok()?;
            let month = u32::try_from(months.rem_euclid(12)).ok()? + 1;
            with_year_month(dt, year, month)
        }
        AddUnit::Week => add_days(dt, n.checked_mul(7)?),
        AddUnit::Day => add_days(dt, n),
        AddUnit::Hour => dt.checked_add_signed(TimeDelta::try_hours(n)?),
    }
}

fn add_days(dt: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    dt.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Moves `dt` to the given year and month, clamping the day to the month's end.
fn with_year_month(dt: NaiveDateTime, year: i32, month: u32) -> Option<NaiveDateTime> {
    let day = dt.day().min(days_in_month(year, month)?);
    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_time(dt.time()))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    Some(
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?
            .pred_opt()?
            .day(),
    )
}

const PATTERN_TOKENS: [&str; 6] = ["yyyy", "MM", "dd", "HH", "mm", "ss"];

/// Renders `yyyy`, `MM`, `dd`, `HH`, `mm` and `ss`; other characters are copied.
fn render(pattern: &str, dt: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        match PATTERN_TOKENS.iter().find(|&&token| rest.starts_with(token)) {
            Some(&token) => {
                let value = match token {
                    "yyyy" => format!("{:04}", dt.year()),
                    "MM" => format!("{:02}", dt.month()),
                    "dd" => format!("{:02}", dt.day()),
                    "HH" => format!("{:02}", dt.hour()),
                    "mm" => format!("{:02}", dt.minute()),
                    _ => format!("{:02}", dt.second()),
                };
                out.push_str(&value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// `name` or `name(arg, ...)`.
fn parse_segment(segment: &str) -> Option<Segment<'_>> {
    let segment = segment.trim();
    match segment.find('(') {
        Some(idx) => {
            let inner = segment[idx + 1..].strip_suffix(')')?;
            let args = if inner.trim().is_empty() {
                vec![]
            } else {
                split_top_level(inner, ',')
                    .into_iter()
                    .map(str::trim)
                    .collect()
            };
            Some(Segment {
                name: segment[..idx].trim(),
                args,
            })
        }
        None => Some(Segment {
            name: segment,
            args: vec![],
        }),
    }
}

/// Splits on `sep` outside of quotes and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(arg: &str) -> Option<&str> {
    ['"', '\'']
        .into_iter()
        .find_map(|q| arg.strip_prefix(q)?.strip_suffix(q))
}

fn parse_int(arg: &str) -> Option<i64> {
    arg.trim().parse::<i64>().ok()
}
