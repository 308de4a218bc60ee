use std::fmt;

#[derive(Debug)]
pub enum IoError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// A required column is absent from a table header.
    MissingColumn { file: String, column: String },
    /// Unparseable WKT or coordinate text, `line` is 1-based (header is line 1).
    Geometry { line: usize, message: String },
    /// Malformed Landserf summit list, `line` is 1-based.
    Landserf { line: usize, message: String },
    /// Malformed or unusable elevation grid.
    Grid(String),
    Json(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
            Self::MissingColumn { file, column } => {
                write!(f, "{file}: missing required column '{column}'")
            }
            Self::Geometry { line, message } => write!(f, "line {line}: invalid geometry: {message}"),
            Self::Landserf { line, message } => {
                write!(f, "Landserf vector file line {line}: {message}")
            }
            Self::Grid(msg) => write!(f, "elevation grid: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}
