//! Settings from URL-query-style strings.
//!
//! All keys are optional:
//! - x, y: Center of the view. Rationals: `p/q`, integers or decimals. Defaults to -1/2, 0.
//! - magnification (or mag): Zoom factor. Defaults to 1.
//! - iters: Maximum number of iterations. Defaults to 100.
//! - radius: Escape radius. Defaults to 2.
//! - algorithm: "mandelbrot", "perpendicular" or "julia".
//! - numeric: Backend tag, "f32", "f64", "decimal40" or "exact". Defaults to "f64".
//! - julia_re, julia_im: The Julia constant. Defaults to -0.8 + 0.156i.
//! - threads: Worker count. Defaults to the global rayon pool's size.
//! - gradual: One cell per frame (true) or every cell per frame (false). Defaults to true.
//! - cells_x, cells_y: Cell grid. Defaults to 4x3.
//! - chunks: Largest chunk size, either one for every cell or a comma-separated list
//!   with one per cell, row-major. Defaults to 8.
//!
//! For instance `x=-3/4&y=1/10&mag=40&iters=500&numeric=decimal40`.

use num::{BigInt, BigRational, One, Zero};
use serde::de::{Deserialize, Deserializer};

use crate::{
    numeric::Complex,
    settings::{ExtraParams, RenderSettings},
    Error, Size,
};

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SettingsQuery {
    #[serde(default = "SettingsQuery::default_x", deserialize_with = "rational")]
    x: BigRational,
    #[serde(default = "SettingsQuery::default_y", deserialize_with = "rational")]
    y: BigRational,
    #[serde(
        default = "SettingsQuery::default_magnification",
        deserialize_with = "rational",
        alias = "mag"
    )]
    magnification: BigRational,
    #[serde(default = "SettingsQuery::default_iters")]
    iters: usize,
    #[serde(
        default = "RenderSettings::default_escape_radius",
        deserialize_with = "rational"
    )]
    radius: BigRational,
    #[serde(default = "SettingsQuery::default_algorithm")]
    algorithm: String,
    #[serde(default = "SettingsQuery::default_numeric")]
    numeric: String,
    #[serde(default = "SettingsQuery::default_julia_re", deserialize_with = "rational")]
    julia_re: BigRational,
    #[serde(default = "SettingsQuery::default_julia_im", deserialize_with = "rational")]
    julia_im: BigRational,
    #[serde(default = "rayon::current_num_threads")]
    threads: usize,
    #[serde(default = "SettingsQuery::is_true")]
    gradual: bool,
    #[serde(default = "SettingsQuery::default_cells_x")]
    cells_x: usize,
    #[serde(default = "SettingsQuery::default_cells_y")]
    cells_y: usize,
    #[serde(default)]
    chunks: Option<String>,
}

impl SettingsQuery {
    const fn is_true() -> bool {
        true
    }
    fn default_x() -> BigRational {
        RenderSettings::default_location().re
    }
    fn default_y() -> BigRational {
        RenderSettings::default_location().im
    }
    fn default_magnification() -> BigRational {
        BigRational::one()
    }
    fn default_iters() -> usize {
        RenderSettings::DEFAULT_MAX_ITERATIONS
    }
    fn default_algorithm() -> String {
        "mandelbrot".to_string()
    }
    fn default_numeric() -> String {
        "f64".to_string()
    }
    fn default_julia_re() -> BigRational {
        ExtraParams::default_julia().re
    }
    fn default_julia_im() -> BigRational {
        ExtraParams::default_julia().im
    }
    fn default_cells_x() -> usize {
        RenderSettings::DEFAULT_CELLS.width
    }
    fn default_cells_y() -> usize {
        RenderSettings::DEFAULT_CELLS.height
    }

    fn into_settings(self) -> Result<RenderSettings, Error> {
        let cells = Size {
            width: self.cells_x,
            height: self.cells_y,
        };
        let max_chunk_sizes = match self.chunks {
            None => RenderSettings::default_max_chunk_sizes(cells)?,
            Some(list) => parse_chunks(&list, RenderSettings::cell_count(cells)?)?,
        };
        let settings = RenderSettings {
            location: Complex::new(self.x, self.y),
            magnification: self.magnification,
            max_iterations: self.iters,
            escape_radius: self.radius,
            algorithm: self.algorithm,
            numeric: self.numeric,
            extra: ExtraParams {
                julia: Complex::new(self.julia_re, self.julia_im),
            },
            threads: self.threads,
            gradual: self.gradual,
            cells,
            max_chunk_sizes,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_chunks(list: &str, cell_count: usize) -> Result<Vec<usize>, Error> {
    let sizes = list
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| Error::Config(format!("invalid chunk size {:?}: {}", s, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match sizes.as_slice() {
        [one] => Ok(vec![*one; cell_count]),
        _ => Ok(sizes),
    }
}

/// Converter to parse BigRational via string.
fn rational<'de, D>(deserializer: D) -> Result<BigRational, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    parse_rational(&buf).map_err(serde::de::Error::custom)
}

/// Parses `p/q`, an integer, or a decimal like `-0.125`.
pub fn parse_rational(text: &str) -> Result<BigRational, Error> {
    let text = text.trim();
    let invalid = |why: String| Error::Config(format!("invalid number {:?}: {}", text, why));
    let integer = |s: &str| s.parse::<BigInt>().map_err(|e| invalid(e.to_string()));

    if let Some((numer, denom)) = text.split_once('/') {
        let (numer, denom) = (integer(numer)?, integer(denom)?);
        if denom.is_zero() {
            return Err(invalid("zero denominator".to_string()));
        }
        return Ok(BigRational::new(numer, denom));
    }
    if let Some((whole, fraction)) = text.split_once('.') {
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("fraction is not all digits".to_string()));
        }
        let digits = integer(&format!("{}{}", whole, fraction))?;
        let scale = num::pow(BigInt::from(10), fraction.len());
        return Ok(BigRational::new(digits, scale));
    }
    Ok(BigRational::from_integer(integer(text)?))
}

/// Builds validated settings from a query string.
pub fn parse_settings(query: &str) -> Result<RenderSettings, Error> {
    let parsed: SettingsQuery = serde_urlencoded::from_str(query)
        .map_err(|e| Error::Config(format!("invalid settings {:?}: {}", query, e)))?;
    parsed.into_settings()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("3/4").unwrap(), r(3, 4));
        assert_eq!(parse_rational("-6/8").unwrap(), r(-3, 4));
        assert_eq!(parse_rational("12").unwrap(), r(12, 1));
        assert_eq!(parse_rational(" -0.125 ").unwrap(), r(-1, 8));
        assert_eq!(parse_rational("-.5").unwrap(), r(-1, 2));
        assert_eq!(parse_rational("2.").unwrap(), r(2, 1));
        assert_eq!(
            parse_rational("0.0000000000000000000000000000001").unwrap(),
            BigRational::new(1.into(), num::pow(BigInt::from(10), 31))
        );
        for bad in ["", "1/0", "x", "1.-5", "1/2/3", "."] {
            assert!(
                matches!(parse_rational(bad), Err(Error::Config(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_defaults() {
        let s = parse_settings("").unwrap();
        let d = RenderSettings::default();
        assert_eq!(s.location, d.location);
        assert_eq!(s.magnification, d.magnification);
        assert_eq!(s.max_iterations, 100);
        assert_eq!(s.escape_radius, r(2, 1));
        assert_eq!(s.algorithm, "mandelbrot");
        assert_eq!(s.numeric, "f64");
        assert_eq!(s.extra, ExtraParams::default());
        assert!(s.gradual);
        assert_eq!(s.cells, RenderSettings::DEFAULT_CELLS);
        assert_eq!(s.max_chunk_sizes, vec![8; 12]);
    }

    #[test]
    fn test_full_query() {
        let s = parse_settings(
            "x=-3/4&y=0.1&mag=40&iters=500&radius=4&algorithm=julia&numeric=exact\
             &julia_re=-0.4&julia_im=3/5&threads=2&gradual=false&cells_x=2&cells_y=1&chunks=4,16",
        )
        .unwrap();
        assert_eq!(s.location, Complex::new(r(-3, 4), r(1, 10)));
        assert_eq!(s.magnification, r(40, 1));
        assert_eq!(s.max_iterations, 500);
        assert_eq!(s.escape_radius, r(4, 1));
        assert_eq!(s.algorithm, "julia");
        assert_eq!(s.numeric, "exact");
        assert_eq!(s.extra.julia, Complex::new(r(-2, 5), r(3, 5)));
        assert_eq!(s.threads, 2);
        assert!(!s.gradual);
        assert_eq!(
            s.cells,
            Size {
                width: 2,
                height: 1
            }
        );
        assert_eq!(s.max_chunk_sizes, vec![4, 16]);
    }

    #[test]
    fn test_broadcast_chunks() {
        let s = parse_settings("chunks=2").unwrap();
        assert_eq!(s.max_chunk_sizes, vec![2; 12]);
    }

    #[test]
    fn test_rejects_bad_queries() {
        for bad in [
            "mag=0",
            "mag=-1",
            "x=abc",
            "iters=many",
            "chunks=3",
            "chunks=8,8",
            "threads=0",
            "zoom=2",
            "cells_x=0",
            "cells_x=4294967296&cells_y=4294967296",
            "cells_x=100000&cells_y=100000",
            "cells_x=18446744073709551615&cells_y=2&chunks=8",
            "chunks=1048576",
        ] {
            assert!(
                matches!(parse_settings(bad), Err(Error::Config(_))),
                "{:?}",
                bad
            );
        }
    }
}
