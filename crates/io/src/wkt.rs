//! Well-known-text for the two geometry kinds the layers carry.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use sotamerge_core::{LineString, MultiLineString, Point};

fn part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]*)\)").expect("valid part pattern"))
}

fn write_points(out: &mut String, points: &[Point]) {
    out.push('(');
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {}", p.x, p.y);
    }
    out.push(')');
}

pub fn format_linestring(line: &LineString) -> String {
    let mut out = String::from("LINESTRING ");
    write_points(&mut out, line.points());
    out
}

pub fn format_multilinestring(multi: &MultiLineString) -> String {
    if multi.parts.is_empty() {
        return "MULTILINESTRING EMPTY".into();
    }
    let mut out = String::from("MULTILINESTRING (");
    for (i, part) in multi.parts.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_points(&mut out, part.points());
    }
    out.push(')');
    out
}

fn parse_points(text: &str) -> Result<LineString, String> {
    let mut points = Vec::new();
    for pair in text.split(',') {
        let mut nums = pair.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(x)), Some(Ok(y))) = (nums.next(), nums.next()) else {
            return Err(format!("bad coordinate '{}'", pair.trim()));
        };
        points.push(Point::new(x, y));
    }
    LineString::try_from(points)
}

/// Parse `LINESTRING (...)` or `MULTILINESTRING ((...), ...)` into its parts.
/// A third (Z) ordinate is accepted and dropped.
pub fn parse(text: &str) -> Result<Vec<LineString>, String> {
    let t = text.trim();
    let upper = t.to_ascii_uppercase();
    let (multi, rest) = if let Some(rest) = upper.strip_prefix("MULTILINESTRING") {
        (true, &t[t.len() - rest.len()..])
    } else if let Some(rest) = upper.strip_prefix("LINESTRING") {
        (false, &t[t.len() - rest.len()..])
    } else {
        return Err(format!("unsupported geometry '{}'", t.chars().take(24).collect::<String>()));
    };

    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('Z')
        .or_else(|| rest.strip_prefix('z'))
        .unwrap_or(rest)
        .trim();
    if rest.eq_ignore_ascii_case("EMPTY") {
        return Err("empty geometry".into());
    }
    if !rest.starts_with('(') || !rest.ends_with(')') {
        return Err("missing parentheses".into());
    }

    if multi {
        let inner = &rest[1..rest.len() - 1];
        let parts: Vec<LineString> = part_re()
            .captures_iter(inner)
            .map(|c| parse_points(&c[1]))
            .collect::<Result<_, _>>()?;
        if parts.is_empty() {
            return Err("no parts".into());
        }
        Ok(parts)
    } else {
        Ok(vec![parse_points(&rest[1..rest.len() - 1])?])
    }
}
