use crate::core::color::to_rgba8;
use image::RgbaImage;
use nalgebra::Vector4;
use std::cell::UnsafeCell;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

const LOCK_STRIPES: usize = 1024;

/// An offscreen color + depth target with a supersampled sample grid.
///
/// Each pixel owns `samples x samples` sub-samples. The rasterizer writes to
/// sub-samples from several threads at once: depth is an atomic f32 bit
/// pattern, color writes are serialized by striped locks.
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    /// Sub-samples per axis.
    pub samples: usize,
    pub buffer_width: usize,
    pub buffer_height: usize,

    color: UnsafeCell<Vec<Vector4<f32>>>,
    depth: Vec<AtomicU32>,
    locks: Vec<Mutex<()>>,
}

// Color access is guarded by `locks`; depth is atomic.
unsafe impl Sync for FrameBuffer {}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, samples: usize) -> Self {
        let samples = samples.max(1);
        let buffer_width = width * samples;
        let buffer_height = height * samples;
        let size = buffer_width * buffer_height;

        Self {
            width,
            height,
            samples,
            buffer_width,
            buffer_height,
            color: UnsafeCell::new(vec![Vector4::zeros(); size]),
            depth: (0..size).map(|_| AtomicU32::new(1.0f32.to_bits())).collect(),
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.buffer_width && y < self.buffer_height).then(|| y * self.buffer_width + x)
    }

    /// Resets every sample. Needs exclusive access, so no draw can be in flight.
    pub fn clear(&mut self, color: Vector4<f32>, depth: f32) {
        self.color.get_mut().fill(color);
        let bits = depth.to_bits();
        for d in &self.depth {
            d.store(bits, Ordering::Relaxed);
        }
    }

    /// Atomically replaces the stored depth if `depth` is closer (strictly less).
    #[inline]
    pub fn depth_test_and_update(&self, x: usize, y: usize, depth: f32) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        let slot = &self.depth[idx];
        let mut current = slot.load(Ordering::Relaxed);
        loop {
            if depth >= f32::from_bits(current) {
                return false;
            }
            match slot.compare_exchange_weak(current, depth.to_bits(), Ordering::Acquire, Ordering::Relaxed) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Writes a sample color. With depth testing on, call only after a passing
    /// [`depth_test_and_update`](Self::depth_test_and_update).
    #[inline]
    pub fn write_color(&self, x: usize, y: usize, color: Vector4<f32>) {
        if let Some(idx) = self.index(x, y) {
            let _guard = self.locks[idx % self.locks.len()]
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // SAFETY: the stripe lock for `idx` is held.
            unsafe {
                let buffer = &mut *self.color.get();
                buffer[idx] = color;
            }
        }
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        self.index(x, y)
            .map(|idx| f32::from_bits(self.depth[idx].load(Ordering::Relaxed)))
    }

    /// Final color of pixel `(x, y)`.
    ///
    /// With `multisample` the sub-samples are averaged; without it the first
    /// sub-sample stands for the whole pixel.
    pub fn resolve(&self, x: usize, y: usize, multisample: bool) -> Option<Vector4<f32>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        // Reads happen between draws, never concurrently with writes.
        let color = unsafe { &*self.color.get() };
        let (sx, sy) = (x * self.samples, y * self.samples);

        if !multisample || self.samples == 1 {
            return Some(color[sy * self.buffer_width + sx]);
        }

        let mut sum = Vector4::zeros();
        for dy in 0..self.samples {
            for dx in 0..self.samples {
                sum += color[(sy + dy) * self.buffer_width + sx + dx];
            }
        }
        Some(sum / (self.samples * self.samples) as f32)
    }

    /// Resolves the whole target into an 8-bit sRGB image.
    pub fn to_image(&self, multisample: bool) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let color = self
                .resolve(x as usize, y as usize, multisample)
                .unwrap_or_else(Vector4::zeros);
            image::Rgba(to_rgba8(&color))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_test_keeps_closest() {
        let fb = FrameBuffer::new(2, 2, 1);
        assert!(fb.depth_test_and_update(0, 0, 0.5));
        assert!(!fb.depth_test_and_update(0, 0, 0.7));
        assert!(fb.depth_test_and_update(0, 0, 0.2));
        assert_eq!(fb.depth_at(0, 0), Some(0.2));
        assert!(!fb.depth_test_and_update(5, 5, 0.1));
    }

    #[test]
    fn test_clear_resets_color_and_depth() {
        let mut fb = FrameBuffer::new(2, 1, 2);
        fb.write_color(1, 1, Vector4::new(1.0, 0.0, 0.0, 1.0));
        fb.depth_test_and_update(1, 1, 0.1);

        fb.clear(Vector4::new(0.0, 0.0, 1.0, 1.0), 1.0);
        assert_eq!(fb.depth_at(1, 1), Some(1.0));
        assert_eq!(fb.resolve(0, 0, true), Some(Vector4::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_resolve_averages_sub_samples() {
        let fb = FrameBuffer::new(1, 1, 2);
        fb.write_color(0, 0, Vector4::new(1.0, 1.0, 1.0, 1.0));
        fb.write_color(1, 1, Vector4::new(1.0, 1.0, 1.0, 1.0));

        let averaged = fb.resolve(0, 0, true).unwrap();
        assert!((averaged - Vector4::new(0.5, 0.5, 0.5, 0.5)).norm() < 1e-6);
        assert_eq!(fb.resolve(0, 0, false), Some(Vector4::new(1.0, 1.0, 1.0, 1.0)));
        assert_eq!(fb.resolve(1, 0, true), None);
    }

    #[test]
    fn test_concurrent_writes_land_in_their_own_cells() {
        use rayon::prelude::*;

        let fb = FrameBuffer::new(16, 16, 1);
        (0..16usize).into_par_iter().for_each(|y| {
            for x in 0..16 {
                fb.write_color(x, y, Vector4::new(x as f32, y as f32, 0.0, 1.0));
            }
        });
        fb.write_color(16, 0, Vector4::new(9.0, 9.0, 9.0, 9.0));

        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(
                    fb.resolve(x, y, false),
                    Some(Vector4::new(x as f32, y as f32, 0.0, 1.0))
                );
            }
        }
    }

    #[test]
    fn test_to_image_dimensions() {
        let fb = FrameBuffer::new(3, 2, 2);
        let img = fb.to_image(true);
        assert_eq!(img.dimensions(), (3, 2));
    }
}
