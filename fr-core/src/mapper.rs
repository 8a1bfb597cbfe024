//! Pixel space to complex plane.

use num::BigRational;

use crate::{number::FractalNumber, numeric::Complex, Error, Size};

/// Axis-aligned bounds on the complex plane.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rect<N> {
    pub x_min: N,
    pub x_max: N,
    pub y_min: N,
    pub y_max: N,
}

impl Rect<BigRational> {
    /// Converts each bound into a backend.
    pub fn convert<N: FractalNumber>(&self) -> Result<Rect<N>, Error> {
        Ok(Rect {
            x_min: N::from_bigrational(&self.x_min)?,
            x_max: N::from_bigrational(&self.x_max)?,
            y_min: N::from_bigrational(&self.y_min)?,
            y_max: N::from_bigrational(&self.y_max)?,
        })
    }
}

/// Affine map from the pixel rectangle `0..width x 0..height` onto an output rectangle.
///
/// The per-pixel step is computed once per output rectangle, in the backend itself,
/// so deep zooms keep whatever precision the backend has.
#[derive(Clone, Debug)]
pub struct PointMapper<N> {
    size: Size,
    output: Rect<N>,
    x_step: N,
    y_step: N,
}

impl<N: FractalNumber> PointMapper<N> {
    pub fn new(size: Size, output: &Rect<BigRational>) -> Result<Self, Error> {
        if size.width == 0 || size.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "empty pixel rectangle {}x{}",
                size.width, size.height
            )));
        }
        if i32::try_from(size.width).is_err() || i32::try_from(size.height).is_err() {
            return Err(Error::InvalidArgument(format!(
                "pixel rectangle {}x{} is too large",
                size.width, size.height
            )));
        }
        let output = output.convert::<N>()?;
        let (x_step, y_step) = Self::steps(size, &output)?;
        Ok(PointMapper {
            size,
            output,
            x_step,
            y_step,
        })
    }

    /// Replaces the output rectangle. Must run before any mapping that should see it.
    pub fn set_output_space(&mut self, output: &Rect<BigRational>) -> Result<(), Error> {
        let output = output.convert::<N>()?;
        let (x_step, y_step) = Self::steps(self.size, &output)?;
        self.output = output;
        self.x_step = x_step;
        self.y_step = y_step;
        Ok(())
    }

    fn steps(size: Size, output: &Rect<N>) -> Result<(N, N), Error> {
        // (outMax - outMin) / (inMax - inMin), with inMin = 0.
        let x_step = (output.x_max.clone() - output.x_min.clone())
            .checked_div(&N::from_i32(size.width as i32))?;
        let y_step = (output.y_max.clone() - output.y_min.clone())
            .checked_div(&N::from_i32(size.height as i32))?;
        Ok((x_step, y_step))
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn output(&self) -> &Rect<N> {
        &self.output
    }

    /// Maps a pixel column, `0..=width`, to a real coordinate.
    pub fn map_x(&self, px: usize) -> N {
        self.output.x_min.clone() + N::from_i32(px as i32) * self.x_step.clone()
    }

    /// Maps a pixel row, `0..=height`, to an imaginary coordinate. Row 0 is `y_min`.
    pub fn map_y(&self, py: usize) -> N {
        self.output.y_min.clone() + N::from_i32(py as i32) * self.y_step.clone()
    }

    pub fn map(&self, px: usize, py: usize) -> Complex<N> {
        Complex::new(self.map_x(px), self.map_y(py))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::Sum;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    fn rect() -> Rect<BigRational> {
        Rect {
            x_min: r(-5, 2),
            x_max: r(3, 2),
            y_min: r(-1, 1),
            y_max: r(4, 3),
        }
    }

    const SIZE: Size = Size {
        width: 640,
        height: 480,
    };

    #[test]
    fn test_corners_f64() {
        let m = PointMapper::<f64>::new(SIZE, &rect()).unwrap();
        let corners = [
            ((0, 0), (-2.5, -1.0)),
            ((640, 0), (1.5, -1.0)),
            ((0, 480), (-2.5, 4.0 / 3.0)),
            ((640, 480), (1.5, 4.0 / 3.0)),
        ];
        for ((px, py), (x, y)) in corners {
            let c = m.map(px, py);
            assert!((c.re - x).abs() < 1e-12, "{:?}", c);
            assert!((c.im - y).abs() < 1e-12, "{:?}", c);
        }
    }

    #[test]
    fn test_corners_exact() {
        let m = PointMapper::<Sum>::new(SIZE, &rect()).unwrap();
        let want = rect();
        assert_eq!(m.map_x(0).to_bigrational(), Some(want.x_min.clone()));
        assert_eq!(m.map_x(640).to_bigrational(), Some(want.x_max.clone()));
        assert_eq!(m.map_y(0).to_bigrational(), Some(want.y_min.clone()));
        assert_eq!(m.map_y(480).to_bigrational(), Some(want.y_max.clone()));
        assert_eq!(m.map_x(320).to_bigrational(), Some(r(-1, 2)));
    }

    #[test]
    fn test_set_output_space() {
        let mut m = PointMapper::<f64>::new(SIZE, &rect()).unwrap();
        let moved = Rect {
            x_min: r(0, 1),
            x_max: r(64, 1),
            y_min: r(0, 1),
            y_max: r(48, 1),
        };
        m.set_output_space(&moved).unwrap();
        assert_eq!(m.map(10, 10), Complex::new(1.0, 1.0));
        assert_eq!(m.output().x_max, 64.0);
    }

    #[test]
    fn test_empty_size() {
        let size = Size {
            width: 0,
            height: 3,
        };
        assert!(PointMapper::<f64>::new(size, &rect()).is_err());
    }
}
