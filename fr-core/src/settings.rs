//! Render settings snapshots and how they differ.

use num::{BigRational, Signed, Zero};

use crate::{mapper::Rect, numeric::Complex, Error, Size};

/// Named parameters only some algorithms read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtraParams {
    /// The fixed `c` of the Julia iteration.
    pub julia: Complex<BigRational>,
}

impl ExtraParams {
    pub fn default_julia() -> Complex<BigRational> {
        // -0.8 + 0.156i
        Complex::new(
            BigRational::new((-4).into(), 5.into()),
            BigRational::new(39.into(), 250.into()),
        )
    }
}

impl Default for ExtraParams {
    fn default() -> Self {
        ExtraParams {
            julia: Self::default_julia(),
        }
    }
}

/// An immutable snapshot of everything a render depends on.
///
/// Snapshots are plain values: a clone shares nothing with the original.
/// Changes replace the whole snapshot, and [`RenderSettings::diff`] tells the
/// renderer how much of its state the replacement invalidates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderSettings {
    /// Center of the view.
    pub location: Complex<BigRational>,
    pub magnification: BigRational,
    pub max_iterations: usize,
    /// Bailout radius; a point escapes once `|z| > escape_radius`.
    pub escape_radius: BigRational,
    /// Algorithm tag, e.g. "mandelbrot".
    pub algorithm: String,
    /// Numeric backend tag, e.g. "f64".
    pub numeric: String,
    pub extra: ExtraParams,

    /// Worker threads evaluating a cell.
    pub threads: usize,
    /// Advance one cell per frame rather than every cell.
    pub gradual: bool,
    /// Cell grid the frame is split into.
    pub cells: Size,
    /// Largest chunk size of each cell, row-major. Powers of two.
    pub max_chunk_sizes: Vec<usize>,
}

impl RenderSettings {
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;
    pub const DEFAULT_CHUNK_SIZE: usize = 8;
    pub const DEFAULT_CELLS: Size = Size {
        width: 4,
        height: 3,
    };
    /// Upper bound on the number of cells in the grid.
    pub const MAX_CELLS: usize = 1 << 16;
    /// Upper bound on a cell's largest chunk size.
    pub const MAX_CHUNK_SIZE: usize = 1 << 16;

    pub fn default_location() -> Complex<BigRational> {
        Complex::new(BigRational::new((-1).into(), 2.into()), BigRational::zero())
    }

    pub fn default_escape_radius() -> BigRational {
        BigRational::from_integer(2.into())
    }

    pub fn default_max_chunk_sizes(cells: Size) -> Result<Vec<usize>, Error> {
        Ok(vec![Self::DEFAULT_CHUNK_SIZE; Self::cell_count(cells)?])
    }

    /// Number of cells in `grid`, if it is a grid the renderer accepts.
    pub fn cell_count(grid: Size) -> Result<usize, Error> {
        match grid.checked_area() {
            Some(count) if count > 0 && count <= Self::MAX_CELLS => Ok(count),
            _ => Err(Error::Config(format!(
                "cell grid {}x{} must have between 1 and {} cells",
                grid.width,
                grid.height,
                Self::MAX_CELLS
            ))),
        }
    }

    /// Checks everything that does not depend on a registry.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.magnification.is_positive() {
            return Err(Error::Config(format!(
                "magnification must be positive, got {}",
                self.magnification
            )));
        }
        if !self.escape_radius.is_positive() {
            return Err(Error::Config(format!(
                "escape radius must be positive, got {}",
                self.escape_radius
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max iterations must be at least 1".to_string()));
        }
        if self.threads == 0 {
            return Err(Error::Config("must provide >=1 thread".to_string()));
        }
        let cell_count = Self::cell_count(self.cells)?;
        if self.max_chunk_sizes.len() != cell_count {
            return Err(Error::Config(format!(
                "{} chunk sizes given for {} cells",
                self.max_chunk_sizes.len(),
                cell_count
            )));
        }
        if let Some(bad) = self
            .max_chunk_sizes
            .iter()
            .find(|s| !s.is_power_of_two() || **s > Self::MAX_CHUNK_SIZE)
        {
            return Err(Error::Config(format!(
                "chunk size {} is not a power of two up to {}",
                bad,
                Self::MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }

    /// The plane rectangle shown in a frame of `size` pixels.
    ///
    /// The aspect ratio is `2 * width / height`; the view spans `aspect / magnification`
    /// either side of the center along the real axis and `2 / magnification` along the
    /// imaginary axis.
    pub fn viewport(&self, size: Size) -> Result<Rect<BigRational>, Error> {
        if size.width == 0 || size.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "empty frame {}x{}",
                size.width, size.height
            )));
        }
        if !self.magnification.is_positive() {
            return Err(Error::Config(format!(
                "magnification must be positive, got {}",
                self.magnification
            )));
        }
        let aspect = BigRational::new((2 * size.width).into(), size.height.into());
        let half_x = aspect / &self.magnification;
        let half_y = BigRational::from_integer(2.into()) / &self.magnification;
        Ok(Rect {
            x_min: &self.location.re - &half_x,
            x_max: &self.location.re + &half_x,
            y_min: &self.location.im - &half_y,
            y_max: &self.location.im + &half_y,
        })
    }

    /// The exact plane coordinate of pixel (x, y) in a frame of `size` pixels.
    ///
    /// Computed in `BigRational` whatever the backend, so it can seed a new
    /// location without picking up rounding. Accepts `0..=width` and `0..=height`.
    pub fn pixel_coordinate(
        &self,
        size: Size,
        x: usize,
        y: usize,
    ) -> Result<Complex<BigRational>, Error> {
        if x > size.width || y > size.height {
            return Err(Error::InvalidArgument(format!(
                "pixel ({}, {}) is outside the {}x{} frame",
                x, y, size.width, size.height
            )));
        }
        let view = self.viewport(size)?;
        let along = |min: &BigRational, max: &BigRational, at: usize, len: usize| {
            min + (max - min) * BigRational::new(at.into(), len.into())
        };
        Ok(Complex::new(
            along(&view.x_min, &view.x_max, x, size.width),
            along(&view.y_min, &view.y_max, y, size.height),
        ))
    }

    /// Classifies what changed since `previous`.
    pub fn diff(&self, previous: &RenderSettings) -> SettingsDiff {
        SettingsDiff {
            rebuild: self.numeric != previous.numeric
                || self.algorithm != previous.algorithm
                || self.max_iterations != previous.max_iterations
                || self.escape_radius != previous.escape_radius
                || self.extra != previous.extra,
            viewport: self.location != previous.location
                || self.magnification != previous.magnification,
            layout: self.cells != previous.cells
                || self.max_chunk_sizes != previous.max_chunk_sizes,
            threads: self.threads != previous.threads,
            traversal: self.gradual != previous.gradual,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            location: Self::default_location(),
            magnification: BigRational::from_integer(1.into()),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius: Self::default_escape_radius(),
            algorithm: "mandelbrot".to_string(),
            numeric: "f64".to_string(),
            extra: ExtraParams::default(),
            threads: rayon::current_num_threads(),
            gradual: true,
            cells: Self::DEFAULT_CELLS,
            max_chunk_sizes: vec![Self::DEFAULT_CHUNK_SIZE; Self::DEFAULT_CELLS.area()],
        }
    }
}

/// What a settings replacement invalidates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsDiff {
    /// Backend, algorithm or its parameters: rebuild the engine.
    pub rebuild: bool,
    /// Location or magnification: recompute the mapper's output rectangle.
    pub viewport: bool,
    /// Cell grid or chunk maxima.
    pub layout: bool,
    /// Worker count: rebuild the pool.
    pub threads: bool,
    /// Gradual or full traversal.
    pub traversal: bool,
}

impl SettingsDiff {
    pub fn is_empty(&self) -> bool {
        *self == SettingsDiff::default()
    }

    /// Whether refinement has to start over from the coarsest chunks.
    pub fn resets_chunks(&self) -> bool {
        self.rebuild || self.viewport || self.layout
    }
}
