//! Numeric backend registry.
//!
//! Each backend tag maps to a constructor monomorphized over its number type,
//! so the renderer works with a `dyn Engine` and never names a number type itself.

use num::BigRational;

use crate::{
    algorithm::{self, IterationAlgorithm, PixelResult, ALGORITHMS},
    decimal::Decimal,
    exact::Sum,
    mapper::{PointMapper, Rect},
    number::FractalNumber,
    settings::RenderSettings,
    Error, Size,
};

/// A point mapper and an algorithm over one numeric backend.
pub trait Engine: Send + Sync {
    /// Backend tag.
    fn numeric(&self) -> &'static str;

    /// Algorithm tag.
    fn algorithm(&self) -> &'static str;

    /// Moves the view. Takes effect for every later `evaluate` and `coordinate`.
    fn set_viewport(&mut self, viewport: &Rect<BigRational>) -> Result<(), Error>;

    /// Iterates the point under pixel (x, y).
    fn evaluate(&self, x: usize, y: usize) -> PixelResult;

    fn frame_start(&self);

    fn frame_end(&self);
}

pub struct EscapeEngine<N: FractalNumber> {
    numeric: &'static str,
    mapper: PointMapper<N>,
    algorithm: Box<dyn IterationAlgorithm<N>>,
}

impl<N: FractalNumber + 'static> EscapeEngine<N> {
    pub fn new(numeric: &'static str, settings: &RenderSettings, size: Size) -> Result<Self, Error> {
        let mapper = PointMapper::new(size, &settings.viewport(size)?)?;
        let algorithm = algorithm::build::<N>(settings)?;
        Ok(EscapeEngine {
            numeric,
            mapper,
            algorithm,
        })
    }
}

impl<N: FractalNumber + 'static> Engine for EscapeEngine<N> {
    fn numeric(&self) -> &'static str {
        self.numeric
    }

    fn algorithm(&self) -> &'static str {
        self.algorithm.name()
    }

    fn set_viewport(&mut self, viewport: &Rect<BigRational>) -> Result<(), Error> {
        self.mapper.set_output_space(viewport)
    }

    fn evaluate(&self, x: usize, y: usize) -> PixelResult {
        self.algorithm.run(self.mapper.map(x, y))
    }

    fn frame_start(&self) {
        self.algorithm.frame_start()
    }

    fn frame_end(&self) {
        self.algorithm.frame_end()
    }
}

/// Function pointer for building an engine.
type EngineFn = fn(&'static str, &RenderSettings, Size) -> Result<Box<dyn Engine>, Error>;

fn make<N: FractalNumber + 'static>(
    numeric: &'static str,
    settings: &RenderSettings,
    size: Size,
) -> Result<Box<dyn Engine>, Error> {
    Ok(Box::new(EscapeEngine::<N>::new(numeric, settings, size)?))
}

const NUMERICS: &[(&str, EngineFn)] = &[
    ("f32", make::<f32>),
    ("f64", make::<f64>),
    ("decimal40", make::<Decimal<40>>),
    ("exact", make::<Sum>),
];

/// List the numeric formats that are valid for rendering.
pub fn formats() -> impl Iterator<Item = &'static str> {
    NUMERICS.iter().map(|(name, _)| *name)
}

fn lookup(numeric: &str) -> Result<(&'static str, EngineFn), Error> {
    // Linear scan, we don't have that many options:
    NUMERICS
        .iter()
        .find(|(candidate, _)| *candidate == numeric)
        .copied()
        .ok_or_else(|| {
            Error::Config(format!(
                "unknown numeric format {:?}; expected one of {:?}",
                numeric,
                formats().collect::<Vec<_>>()
            ))
        })
}

/// Validates settings, including both tags, without building anything.
pub fn check(settings: &RenderSettings) -> Result<(), Error> {
    settings.validate()?;
    lookup(&settings.numeric)?;
    if !ALGORITHMS.contains(&settings.algorithm.as_str()) {
        return Err(Error::Config(format!(
            "unknown algorithm {:?}; expected one of {:?}",
            settings.algorithm, ALGORITHMS
        )));
    }
    Ok(())
}

/// Builds the engine `settings` selects for a frame of `size` pixels.
pub fn build(settings: &RenderSettings, size: Size) -> Result<Box<dyn Engine>, Error> {
    check(settings)?;
    let (numeric, make) = lookup(&settings.numeric)?;
    tracing::debug!(
        "building {} engine over {} for {}x{}",
        settings.algorithm,
        numeric,
        size.width,
        size.height
    );
    make(numeric, settings, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Complex;

    const SIZE: Size = Size {
        width: 4,
        height: 2,
    };

    fn settings(numeric: &str) -> RenderSettings {
        RenderSettings {
            numeric: numeric.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_every_format_builds() {
        for numeric in formats() {
            let engine = build(&settings(numeric), SIZE).unwrap();
            assert_eq!(engine.numeric(), numeric);
            assert_eq!(engine.algorithm(), "mandelbrot");
        }
    }

    #[test]
    fn test_unknown_tags() {
        assert!(matches!(
            build(&settings("f16"), SIZE),
            Err(Error::Config(_))
        ));
        let s = RenderSettings {
            algorithm: "newton".to_string(),
            ..Default::default()
        };
        assert!(matches!(check(&s), Err(Error::Config(_))));
    }

    #[test]
    fn test_evaluation_follows_viewport() {
        let s = settings("f64");
        let mut engine = build(&s, SIZE).unwrap();
        // Default view of a 4x2 frame: the corner is -9/2 - 2i, outside at once.
        let corner = engine.evaluate(0, 0);
        assert!(corner.escaped);
        assert_eq!(corner.iterations, 1);

        let moved = RenderSettings {
            location: Complex::new(
                BigRational::from_integer(0.into()),
                BigRational::from_integer(0.into()),
            ),
            magnification: BigRational::from_integer(1000.into()),
            ..s
        };
        engine.set_viewport(&moved.viewport(SIZE).unwrap()).unwrap();
        assert!(!engine.evaluate(0, 0).escaped);
    }

    #[test]
    fn test_backends_agree_on_coarse_frame() {
        // Exact iterates double in size every step, so keep the cap low.
        let capped = |numeric: &str| RenderSettings {
            max_iterations: 8,
            ..settings(numeric)
        };
        let reference = build(&capped("f64"), SIZE).unwrap();
        for numeric in ["decimal40", "exact"] {
            let engine = build(&capped(numeric), SIZE).unwrap();
            for y in 0..SIZE.height {
                for x in 0..SIZE.width {
                    assert_eq!(
                        engine.evaluate(x, y).iterations,
                        reference.evaluate(x, y).iterations,
                        "{} at ({}, {})",
                        numeric,
                        x,
                        y
                    );
                }
            }
        }
    }
}
