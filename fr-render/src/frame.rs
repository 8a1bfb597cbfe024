use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use fr_core::Size;
use image::{Rgb, RgbImage};

/// A frame buffer that workers can fill concurrently.
///
/// Pixels are packed RGB in relaxed atomics, so disjoint blocks can be written
/// from several threads through a shared reference.
#[derive(Debug)]
pub struct Frame {
    size: Size,
    pixels: Vec<AtomicU32>,
}

fn pack(c: Rgb<u8>) -> u32 {
    let [r, g, b] = c.0;
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn unpack(v: u32) -> Rgb<u8> {
    Rgb([(v >> 16) as u8, (v >> 8) as u8, v as u8])
}

impl Frame {
    /// A black frame.
    pub fn new(size: Size) -> Self {
        let pixels = (0..size.area()).map(|_| AtomicU32::new(0)).collect();
        Frame { size, pixels }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Paints the rectangle `x` by `y`, clipped to the frame.
    pub fn fill(&self, x: Range<usize>, y: Range<usize>, color: Rgb<u8>) {
        let packed = pack(color);
        let x_end = std::cmp::min(x.end, self.size.width);
        let y_end = std::cmp::min(y.end, self.size.height);
        if x.start >= x_end {
            return;
        }
        for j in y.start..y_end {
            let row = j * self.size.width;
            for pixel in &self.pixels[row + x.start..row + x_end] {
                pixel.store(packed, Ordering::Relaxed);
            }
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb<u8> {
        unpack(self.pixels[y * self.size.width + x].load(Ordering::Relaxed))
    }

    /// Copies the frame out as an image.
    pub fn snapshot(&self) -> RgbImage {
        RgbImage::from_fn(self.size.width as u32, self.size.height as u32, |x, y| {
            self.get(x as usize, y as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_clips() {
        let f = Frame::new(Size {
            width: 5,
            height: 3,
        });
        let c = Rgb([10, 20, 30]);
        f.fill(4..8, 2..6, c);
        assert_eq!(f.get(4, 2), c);
        assert_eq!(f.get(3, 2), Rgb([0, 0, 0]));
        assert_eq!(f.get(4, 1), Rgb([0, 0, 0]));
        f.fill(6..8, 0..3, Rgb([9, 9, 9]));

        f.fill(0..2, 0..2, Rgb([1, 2, 3]));
        let img = f.snapshot();
        assert_eq!(img.dimensions(), (5, 3));
        assert_eq!(*img.get_pixel(1, 1), Rgb([1, 2, 3]));
        assert_eq!(*img.get_pixel(2, 1), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(4, 2), c);
    }
}
