// Delimited table reading shared by every layer format

use std::io::Read;
use std::path::Path;

use crate::error::IoError;

/// A headed table read fully into memory.
#[derive(Debug, Clone)]
pub struct Table {
    pub file: String,
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Table, IoError> {
        let content = read_file_as_utf8(path)?;
        Table::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, file: &str) -> Result<Table, IoError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(content))
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            file: file.to_string(),
            headers,
            rows,
        })
    }

    /// Column position by header, ignoring case and surrounding blanks.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn require(&self, name: &str) -> Result<usize, IoError> {
        self.column(name).ok_or_else(|| IoError::MissingColumn {
            file: self.file.clone(),
            column: name.to_string(),
        })
    }
}

/// Trimmed, non-empty text of `col` in `row`.
pub fn field(row: &csv::StringRecord, col: Option<usize>) -> Option<&str> {
    col.and_then(|c| row.get(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn owned_field(row: &csv::StringRecord, col: Option<usize>) -> Option<String> {
    field(row, col).map(str::to_string)
}

/// Integer cell; `1234.0` is accepted as `1234`. Anything else is `None`.
pub fn parse_int(text: &str) -> Option<i32> {
    let t = text.trim();
    if let Ok(v) = t.parse::<i32>() {
        return Some(v);
    }
    let f = t.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Consistent lines times field count; WKT commas inside quotes do not count.
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (survey sheets are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>, IoError> {
    Ok(csv::WriterBuilder::new().from_path(path)?)
}
