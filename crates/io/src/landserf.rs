//! Landserf vector summit lists (`.lst`).
//!
//! Each summit is a block of four records:
//!
//! ```text
//! P <x> <y> <prominence>      summit
//! P <x> <y> <-prominence>     col
//! L <n> <z>                   ridge header
//!  <x> <y>                    n ridge vertices, col first
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sotamerge_core::{LineString, Point};

use crate::error::IoError;

const NUM: &str = r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";

struct Patterns {
    point: Regex,
    ridge: Regex,
    coord: Regex,
}

fn patterns() -> &'static Patterns {
    static RE: OnceLock<Patterns> = OnceLock::new();
    RE.get_or_init(|| Patterns {
        point: Regex::new(&format!(r"^P ({NUM}) ({NUM}) ({NUM})$")).expect("valid point pattern"),
        ridge: Regex::new(&format!(r"^L (\d+) ({NUM})$")).expect("valid ridge pattern"),
        coord: Regex::new(&format!(r"^\s+({NUM})\s+({NUM})$")).expect("valid coordinate pattern"),
    })
}

/// One summit with its ridge line, summit first.
#[derive(Debug, Clone, PartialEq)]
pub struct LandserfSummit {
    /// Prominence as computed by Landserf, in raster units.
    pub prominence: i64,
    pub ridge: LineString,
}

impl LandserfSummit {
    pub fn summit(&self) -> Point {
        self.ridge.first()
    }

    pub fn col(&self) -> Point {
        self.ridge.last()
    }
}

pub fn read_lst(path: &Path) -> Result<Vec<LandserfSummit>, IoError> {
    let content = std::fs::read_to_string(path)?;
    parse_lst(&content)
}

enum State {
    Summit,
    Col { summit: (f64, f64, i64) },
    Ridge { summit: (f64, f64, i64), col: (f64, f64, i64) },
    Vertices { summit: (f64, f64, i64), col: (f64, f64, i64), left: usize, vertices: Vec<Point> },
}

fn err(line: usize, message: impl Into<String>) -> IoError {
    IoError::Landserf {
        line,
        message: message.into(),
    }
}

fn point_entry(line: &str, lineno: usize, what: &str) -> Result<(f64, f64, i64), IoError> {
    let c = patterns()
        .point
        .captures(line)
        .ok_or_else(|| err(lineno, format!("wrong {what} entry '{line}'")))?;
    let num = |i: usize| c[i].parse::<f64>().map_err(|e| err(lineno, format!("{e} in '{line}'")));
    Ok((num(1)?, num(2)?, num(3)? as i64))
}

pub fn parse_lst(content: &str) -> Result<Vec<LandserfSummit>, IoError> {
    let p = patterns();
    let mut summits = Vec::new();
    let mut state = State::Summit;

    for (idx, raw) in content.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        state = match state {
            State::Summit => State::Col {
                summit: point_entry(line, lineno, "summit")?,
            },
            State::Col { summit } => State::Ridge {
                summit,
                col: point_entry(line, lineno, "col")?,
            },
            State::Ridge { summit, col } => {
                let c = p
                    .ridge
                    .captures(line)
                    .ok_or_else(|| err(lineno, format!("wrong ridge entry '{line}'")))?;
                let n: usize = c[1].parse().map_err(|_| err(lineno, "ridge vertex count out of range"))?;
                if n < 2 {
                    return Err(err(lineno, format!("ridge needs at least 2 vertices, got {n}")));
                }
                State::Vertices {
                    summit,
                    col,
                    left: n,
                    vertices: Vec::new(),
                }
            }
            State::Vertices {
                summit,
                col,
                left,
                mut vertices,
            } => {
                let c = p
                    .coord
                    .captures(line)
                    .ok_or_else(|| err(lineno, format!("wrong coordinate entry '{line}'")))?;
                let x: f64 = c[1].parse().map_err(|_| err(lineno, "bad x coordinate"))?;
                let y: f64 = c[2].parse().map_err(|_| err(lineno, "bad y coordinate"))?;
                vertices.push(Point::new(x, y));

                if left > 1 {
                    State::Vertices {
                        summit,
                        col,
                        left: left - 1,
                        vertices,
                    }
                } else {
                    // Listed col to summit.
                    vertices.reverse();
                    let (first, last) = (vertices[0], vertices[vertices.len() - 1]);
                    if first != Point::new(summit.0, summit.1) || last != Point::new(col.0, col.1) {
                        return Err(err(lineno, "summit/col position doesn't match ridge start/end"));
                    }
                    if summit.2 != -col.2 {
                        return Err(err(
                            lineno,
                            format!("summit/col prominence mismatch {} <> {}", summit.2, col.2),
                        ));
                    }
                    let ridge = LineString::new(vertices)
                        .ok_or_else(|| err(lineno, "ridge needs at least 2 vertices"))?;
                    summits.push(LandserfSummit {
                        prominence: summit.2,
                        ridge,
                    });
                    State::Summit
                }
            }
        };
    }

    if !matches!(state, State::Summit) {
        return Err(err(content.lines().count(), "unterminated summit data"));
    }
    if summits.is_empty() {
        return Err(err(0, "no summits read"));
    }
    Ok(summits)
}
