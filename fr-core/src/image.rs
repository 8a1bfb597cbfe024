//! Colors for escape-time results.

use image::Rgb;

use crate::{algorithm::PixelResult, Error};

/// Maps escape data onto a palette with smooth (fractional) iteration counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Colorizer {
    palette: Vec<Rgb<u8>>,
    interior: Rgb<u8>,
}

impl Colorizer {
    /// The palette needs at least two colors. Points that never escape are black.
    pub fn new(palette: Vec<Rgb<u8>>) -> Result<Self, Error> {
        if palette.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "palette needs at least two colors, got {}",
                palette.len()
            )));
        }
        Ok(Colorizer {
            palette,
            interior: Rgb([0, 0, 0]),
        })
    }

    pub fn with_interior(self, interior: Rgb<u8>) -> Self {
        Colorizer { interior, ..self }
    }

    pub fn palette(&self) -> &[Rgb<u8>] {
        &self.palette
    }

    /// Continuous iteration count, `n + 1 - log2(ln(|z|^2) / 2 / ln 2)`.
    ///
    /// Scaled so the palette spans the distance out to radius 2 whatever the bailout.
    /// Falls back to the plain count where the logarithms are not finite.
    pub fn smooth_iterations(result: &PixelResult) -> f64 {
        let count = result.iterations as f64;
        let log_zn = result.magnitude_squared.ln() / 2.0;
        let nu = (log_zn / std::f64::consts::LN_2).log2();
        let smooth = count + 1.0 - nu;
        if smooth.is_finite() {
            smooth
        } else {
            count
        }
    }

    pub fn color(&self, result: &PixelResult) -> Rgb<u8> {
        if !result.escaped {
            return self.interior;
        }
        let smooth = Self::smooth_iterations(result);
        let whole = smooth.floor();
        let fraction = smooth - whole;
        // The last entry is left out of the cycle.
        let cycle = (self.palette.len() - 1) as i64;
        let index = whole as i64;
        let from = self.palette[index.rem_euclid(cycle) as usize];
        let to = self.palette[(index + 1).rem_euclid(cycle) as usize];
        lerp(from, to, fraction)
    }
}

fn lerp(from: Rgb<u8>, to: Rgb<u8>, t: f64) -> Rgb<u8> {
    let channel = |i: usize| {
        let (a, b) = (from.0[i] as f64, to.0[i] as f64);
        (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
    };
    Rgb([channel(0), channel(1), channel(2)])
}

/// An evenly spaced, fully saturated hue gradient of `len` colors.
pub fn hue_gradient(len: usize) -> Vec<Rgb<u8>> {
    (0..len)
        .map(|i| {
            let hue = (i * 360) as f64 / len as f64;
            let (r, g, b) = hsv::hsv_to_rgb(hue, 1.0, 1.0);
            Rgb([r, g, b])
        })
        .collect()
}
