//! Elevation rasters in ESRI ASCII grid format.

use std::path::Path;

use sotamerge_core::Point;

use crate::error::IoError;

/// Point elevation lookup on a DEM.
pub trait ElevationSampler {
    /// Elevation at `p`, `None` outside the raster or on a no-data cell.
    fn sample(&self, p: Point) -> Option<f64>;

    /// Smallest valid value of the raster.
    fn minimum(&self) -> Option<f64>;
}

/// A fully loaded ESRI ASCII grid. Sampling picks the containing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGrid {
    ncols: usize,
    nrows: usize,
    /// Lower-left corner of the lower-left cell.
    xll: f64,
    yll: f64,
    cellsize: f64,
    nodata: Option<f64>,
    /// Row-major, top row first.
    values: Vec<f64>,
    minimum: Option<f64>,
}

/// Row or column count from a header value; must be a whole, non-negative number.
fn dimension(key: &str, num: f64) -> Result<usize, IoError> {
    if !(num.is_finite() && num >= 0.0 && num.fract() == 0.0 && num <= usize::MAX as f64) {
        return Err(IoError::Grid(format!("header '{key}': '{num}' is not a cell count")));
    }
    Ok(num as usize)
}

impl AsciiGrid {
    pub fn read(path: &Path) -> Result<Self, IoError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, IoError> {
        let mut tokens = content.split_whitespace().peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut x = None;
        let mut y = None;
        let mut centered = (false, false);
        let mut cellsize = None;
        let mut nodata = None;

        while let Some(key) = tokens.peek().copied() {
            if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
                break;
            }
            tokens.next();
            let value = tokens
                .next()
                .ok_or_else(|| IoError::Grid(format!("header '{key}' has no value")))?;
            let num: f64 = value
                .parse()
                .map_err(|_| IoError::Grid(format!("header '{key}': bad number '{value}'")))?;
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(dimension(key, num)?),
                "nrows" => nrows = Some(dimension(key, num)?),
                "xllcorner" => x = Some(num),
                "yllcorner" => y = Some(num),
                "xllcenter" => {
                    x = Some(num);
                    centered.0 = true;
                }
                "yllcenter" => {
                    y = Some(num);
                    centered.1 = true;
                }
                "cellsize" => cellsize = Some(num),
                "nodata_value" => nodata = Some(num),
                other => return Err(IoError::Grid(format!("unknown header '{other}'"))),
            }
        }

        let missing = |what: &str| IoError::Grid(format!("missing header '{what}'"));
        let ncols = ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = nrows.ok_or_else(|| missing("nrows"))?;
        let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;
        let mut xll = x.ok_or_else(|| missing("xllcorner"))?;
        let mut yll = y.ok_or_else(|| missing("yllcorner"))?;
        if cellsize.is_nan() || cellsize <= 0.0 || ncols == 0 || nrows == 0 {
            return Err(IoError::Grid("empty raster or non-positive cellsize".into()));
        }
        if centered.0 {
            xll -= cellsize / 2.0;
        }
        if centered.1 {
            yll -= cellsize / 2.0;
        }

        let values: Vec<f64> = tokens
            .map(|t| t.parse::<f64>().map_err(|_| IoError::Grid(format!("bad cell value '{t}'"))))
            .collect::<Result<_, _>>()?;
        let cells = ncols
            .checked_mul(nrows)
            .ok_or_else(|| IoError::Grid(format!("raster too large ({ncols} x {nrows})")))?;
        if values.len() != cells {
            return Err(IoError::Grid(format!(
                "expected {cells} cells ({ncols} x {nrows}), found {}",
                values.len()
            )));
        }

        let minimum = values
            .iter()
            .copied()
            .filter(|v| Some(*v) != nodata)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));

        Ok(Self {
            ncols,
            nrows,
            xll,
            yll,
            cellsize,
            nodata,
            values,
            minimum,
        })
    }

    pub fn size(&self) -> (usize, usize) {
        (self.ncols, self.nrows)
    }
}

impl ElevationSampler for AsciiGrid {
    fn sample(&self, p: Point) -> Option<f64> {
        let cx = ((p.x - self.xll) / self.cellsize).floor();
        let cy = ((p.y - self.yll) / self.cellsize).floor();
        let inside = (0.0..self.ncols as f64).contains(&cx) && (0.0..self.nrows as f64).contains(&cy);
        if !inside {
            return None;
        }
        let row = self.nrows - 1 - cy as usize;
        let v = self.values[row * self.ncols + cx as usize];
        if Some(v) == self.nodata {
            None
        } else {
            Some(v)
        }
    }

    fn minimum(&self) -> Option<f64> {
        self.minimum
    }
}
