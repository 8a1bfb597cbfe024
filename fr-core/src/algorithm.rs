//! Escape-time iteration formulas, parameterized on a numeric type.

use crate::{
    number::FractalNumber, numeric::Complex, settings::RenderSettings, Error,
};

/// What iterating one point produced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelResult {
    /// Steps taken before escaping, or the iteration cap if the point never escaped.
    pub iterations: usize,
    /// |z|^2 of the last iterate.
    pub magnitude_squared: f64,
    pub escaped: bool,
}

/// Parameters shared by every escape-time formula.
#[derive(Clone, Debug, PartialEq)]
pub struct EscapeParams<N> {
    pub max_iterations: usize,
    /// Square of the escape radius, so the loop can skip the square root.
    pub bailout_squared: N,
}

impl<N: FractalNumber> EscapeParams<N> {
    pub fn from_settings(settings: &RenderSettings) -> Result<Self, Error> {
        let r2 = &settings.escape_radius * &settings.escape_radius;
        Ok(EscapeParams {
            max_iterations: settings.max_iterations,
            bailout_squared: N::from_bigrational(&r2)?,
        })
    }
}

/// An escape-time formula.
///
/// Implementations provide the starting point and a single step; the loop is shared.
pub trait IterationAlgorithm<N: FractalNumber>: Send + Sync {
    fn name(&self) -> &'static str;

    fn params(&self) -> &EscapeParams<N>;

    /// The initial z and the c added at every step, for a point on the plane.
    fn start(&self, point: Complex<N>) -> (Complex<N>, Complex<N>);

    fn step(&self, z: &Complex<N>, c: &Complex<N>) -> Complex<N>;

    /// Iterates until |z|^2 exceeds the bailout, the cap is reached,
    /// or two successive iterates are equal (a fixed point, which never escapes).
    /// A starting z already outside the bailout escapes after 0 iterations.
    ///
    /// The fixed-point check only catches period-1 orbits; longer cycles run to the cap.
    fn run(&self, point: Complex<N>) -> PixelResult {
        let params = self.params();
        let (mut z, c) = self.start(point);
        let initial = z.norm_sqr();
        if initial > params.bailout_squared {
            return PixelResult {
                iterations: 0,
                magnitude_squared: initial.to_f64(),
                escaped: true,
            };
        }
        for i in 0..params.max_iterations {
            let next = self.step(&z, &c);
            let norm = next.norm_sqr();
            if norm > params.bailout_squared {
                return PixelResult {
                    iterations: i + 1,
                    magnitude_squared: norm.to_f64(),
                    escaped: true,
                };
            }
            if next == z {
                return PixelResult {
                    iterations: params.max_iterations,
                    magnitude_squared: norm.to_f64(),
                    escaped: false,
                };
            }
            z = next;
        }
        PixelResult {
            iterations: params.max_iterations,
            magnitude_squared: z.norm_sqr().to_f64(),
            escaped: false,
        }
    }

    /// Called once before each sweep over the frame.
    fn frame_start(&self) {}

    /// Called once after each sweep over the frame.
    fn frame_end(&self) {}
}

/// z <- z^2 + c, from z = 0.
#[derive(Clone, Debug)]
pub struct Mandelbrot<N> {
    params: EscapeParams<N>,
}

impl<N: FractalNumber> Mandelbrot<N> {
    pub fn new(params: EscapeParams<N>) -> Self {
        Mandelbrot { params }
    }
}

impl<N: FractalNumber> IterationAlgorithm<N> for Mandelbrot<N> {
    fn name(&self) -> &'static str {
        "mandelbrot"
    }

    fn params(&self) -> &EscapeParams<N> {
        &self.params
    }

    fn start(&self, point: Complex<N>) -> (Complex<N>, Complex<N>) {
        (Complex::zero(), point)
    }

    fn step(&self, z: &Complex<N>, c: &Complex<N>) -> Complex<N> {
        z.square() + c.clone()
    }
}

/// z <- (|Re z| - i Im z)^2 + c, from z = 0.
#[derive(Clone, Debug)]
pub struct Perpendicular<N> {
    params: EscapeParams<N>,
}

impl<N: FractalNumber> Perpendicular<N> {
    pub fn new(params: EscapeParams<N>) -> Self {
        Perpendicular { params }
    }
}

impl<N: FractalNumber> IterationAlgorithm<N> for Perpendicular<N> {
    fn name(&self) -> &'static str {
        "perpendicular"
    }

    fn params(&self) -> &EscapeParams<N> {
        &self.params
    }

    fn start(&self, point: Complex<N>) -> (Complex<N>, Complex<N>) {
        (Complex::zero(), point)
    }

    fn step(&self, z: &Complex<N>, c: &Complex<N>) -> Complex<N> {
        let w = Complex::new(z.re.abs(), -z.im.clone());
        w.square() + c.clone()
    }
}

/// z <- z^2 + k for a fixed k, starting from the point itself.
#[derive(Clone, Debug)]
pub struct Julia<N> {
    params: EscapeParams<N>,
    constant: Complex<N>,
}

impl<N: FractalNumber> Julia<N> {
    pub fn new(params: EscapeParams<N>, constant: Complex<N>) -> Self {
        Julia { params, constant }
    }
}

impl<N: FractalNumber> IterationAlgorithm<N> for Julia<N> {
    fn name(&self) -> &'static str {
        "julia"
    }

    fn params(&self) -> &EscapeParams<N> {
        &self.params
    }

    fn start(&self, point: Complex<N>) -> (Complex<N>, Complex<N>) {
        (point, self.constant.clone())
    }

    fn step(&self, z: &Complex<N>, c: &Complex<N>) -> Complex<N> {
        z.square() + c.clone()
    }
}

/// Algorithm tags, in the order they're listed to users.
pub const ALGORITHMS: &[&str] = &["mandelbrot", "perpendicular", "julia"];

/// Builds the algorithm `settings` selects, over the numeric type `N`.
pub fn build<N: FractalNumber + 'static>(
    settings: &RenderSettings,
) -> Result<Box<dyn IterationAlgorithm<N>>, Error> {
    let params = EscapeParams::<N>::from_settings(settings)?;
    Ok(match settings.algorithm.as_str() {
        "mandelbrot" => Box::new(Mandelbrot::new(params)),
        "perpendicular" => Box::new(Perpendicular::new(params)),
        "julia" => {
            let k = &settings.extra.julia;
            let constant = Complex::new(N::from_bigrational(&k.re)?, N::from_bigrational(&k.im)?);
            Box::new(Julia::new(params, constant))
        }
        other => {
            return Err(Error::Config(format!(
                "unknown algorithm {:?}; expected one of {:?}",
                other, ALGORITHMS
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decimal::Decimal, exact::Sum};
    use num::BigRational;

    fn params<N: FractalNumber>(max_iterations: usize, radius: i64) -> EscapeParams<N> {
        EscapeParams {
            max_iterations,
            bailout_squared: N::from_i32((radius * radius) as i32),
        }
    }

    #[test]
    fn test_escape_bound_outside_radius_two() {
        // With |z_n| >= |c| > 2, |z_{n+1}| >= |z_n| (|c| - 1), so |z_n| >= |c| (|c| - 1)^(n-1)
        // and the orbit passes R within floor(ln(R/|c|) / ln(|c| - 1)) + 2 steps.
        let radius = 10.0f64;
        let m = Mandelbrot::new(params::<f64>(10_000, radius as i64));
        for magnitude in [2.01, 2.1, 2.5, 3.0, 5.0, 12.0] {
            let bound = ((radius / magnitude).ln() / (magnitude - 1.0f64).ln()).floor() as i64 + 2;
            for k in 0..16 {
                let angle = k as f64 * std::f64::consts::PI / 8.0;
                let c = Complex::new(magnitude * angle.cos(), magnitude * angle.sin());
                let result = m.run(c);
                assert!(result.escaped, "{:?} did not escape", c);
                assert!(
                    result.iterations as i64 <= bound.max(1),
                    "{:?} took {} steps, bound {}",
                    c,
                    result.iterations,
                    bound
                );
            }
        }
    }

    #[test]
    fn test_radius_two_escapes_immediately() {
        let m = Mandelbrot::new(params::<f64>(100, 2));
        let r = m.run(Complex::new(2.5, 0.0));
        assert_eq!(r.iterations, 1);
        assert!(r.escaped);
        assert_eq!(r.magnitude_squared, 6.25);
    }

    #[test]
    fn test_origin_never_escapes() {
        for cap in [1, 10, 100_000] {
            let m = Mandelbrot::new(params::<f64>(cap, 2));
            let r = m.run(Complex::zero());
            assert!(!r.escaped);
            assert_eq!(r.iterations, cap);
        }
    }

    #[test]
    fn test_period_two_runs_to_cap() {
        // 0 -> -1 -> 0 -> ... is not a fixed point, so it takes the full cap.
        let m = Mandelbrot::new(params::<f64>(500, 2));
        let r = m.run(Complex::new(-1.0, 0.0));
        assert!(!r.escaped);
        assert_eq!(r.iterations, 500);
    }

    #[test]
    fn test_perpendicular_step() {
        let p = Perpendicular::new(params::<f64>(10, 2));
        let m = Mandelbrot::new(params::<f64>(10, 2));
        let z = Complex::new(1.0, 2.0);
        assert_eq!(p.step(&z, &Complex::zero()), Complex::new(-3.0, -4.0));
        assert_eq!(m.step(&z, &Complex::zero()), Complex::new(-3.0, 4.0));
        // On the real axis the two agree.
        for x in [-1.9, -0.75, 0.2, 0.3, 0.5] {
            assert_eq!(p.run(Complex::new(x, 0.0)), m.run(Complex::new(x, 0.0)));
        }
    }

    #[test]
    fn test_julia_starts_at_point() {
        let j = Julia::new(params::<f64>(50, 2), Complex::zero());
        // Squaring from 2 escapes at once; from 1 it is a fixed point.
        let r = j.run(Complex::new(2.0, 0.0));
        assert!(r.escaped);
        assert_eq!(r.iterations, 1);
        let r = j.run(Complex::new(1.0, 0.0));
        assert!(!r.escaped);
        assert_eq!(r.iterations, 50);
    }

    #[test]
    fn test_start_outside_bailout_takes_no_steps() {
        let j = Julia::new(params::<f64>(50, 2), Complex::zero());
        let r = j.run(Complex::new(3.0, 0.0));
        assert_eq!(
            r,
            PixelResult {
                iterations: 0,
                magnitude_squared: 9.0,
                escaped: true,
            }
        );
        // Exactly on the radius is not outside it.
        let r = j.run(Complex::new(0.0, 2.0));
        assert_eq!(r.iterations, 1);
        assert_eq!(r.magnitude_squared, 16.0);
    }

    fn run_dyadic<N: FractalNumber + 'static>() -> PixelResult {
        let settings = RenderSettings::default();
        let m = build::<N>(&settings).unwrap();
        let half = N::from_f64(0.5).unwrap();
        m.run(Complex::new(half.clone(), half))
    }

    #[test]
    fn test_backends_agree_on_dyadic_orbit() {
        // 1/2 + i/2 escapes on the fifth step, and every iterate is exact in binary.
        let f = run_dyadic::<f64>();
        assert_eq!(f.iterations, 5);
        assert!(f.escaped);
        assert_eq!(run_dyadic::<f32>(), f);
        assert_eq!(run_dyadic::<Decimal<40>>(), f);
        assert_eq!(run_dyadic::<Sum>(), f);
    }

    #[test]
    fn test_exact_fixed_point() {
        // -2 -> 2 -> 2: a fixed point right on the boundary.
        let m = Mandelbrot::new(params::<Sum>(1000, 2));
        let r = m.run(Complex::new(Sum::from_i32(-2), Sum::from_i32(0)));
        assert!(!r.escaped);
        assert_eq!(r.iterations, 1000);
        assert_eq!(r.magnitude_squared, 4.0);
    }

    #[test]
    fn test_build() {
        let settings = RenderSettings {
            algorithm: "julia".to_string(),
            ..Default::default()
        };
        let j = build::<f64>(&settings).unwrap();
        assert_eq!(j.name(), "julia");
        let (z, c) = j.start(Complex::new(0.25, 0.0));
        assert_eq!(z, Complex::new(0.25, 0.0));
        assert_eq!(c, Complex::new(-0.8, 0.156));

        for name in ALGORITHMS {
            let s = RenderSettings {
                algorithm: name.to_string(),
                ..Default::default()
            };
            assert_eq!(build::<f64>(&s).unwrap().name(), *name);
        }

        let bad = RenderSettings {
            algorithm: "burning-ship".to_string(),
            ..Default::default()
        };
        assert!(matches!(build::<f64>(&bad), Err(Error::Config(_))));
    }

    #[test]
    fn test_params_from_settings() {
        let settings = RenderSettings {
            escape_radius: BigRational::new(3.into(), 2.into()),
            max_iterations: 7,
            ..Default::default()
        };
        let p = EscapeParams::<f64>::from_settings(&settings).unwrap();
        assert_eq!(p.bailout_squared, 2.25);
        assert_eq!(p.max_iterations, 7);
    }
}
