//! Pixel storage shared between the render thread and the display loop.
//!
//! [`ProgressiveBuffer`] and [`RadianceBuffer`] are written one pixel at a time
//! by the producer while the display reads them wholesale. Each cell is a
//! single atomic, so a reader never sees a torn pixel, but a frame snapshot
//! may mix pixels from different passes. No lock is taken on either side.

use crate::raytracer::color::{DisplayColor, Radiance};
use crate::raytracer::error::{Error, Result};
use crate::raytracer::exporter::ToneMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

pub trait FramebufferView {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn get_pixel(&self, row: usize, col: usize) -> DisplayColor;
}

const WRITTEN_BIT: u64 = 1 << 32;

pub struct ProgressiveBuffer {
    // Low 32 bits: packed DisplayColor. Bit 32: cell has been written.
    cells: Vec<AtomicU64>,
    width: usize,
    height: usize,
    frozen: AtomicBool,
    in_flight: AtomicUsize,
}

impl ProgressiveBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let blank = DisplayColor::default().pack() as u64;
        Self {
            cells: (0..width * height).map(|_| AtomicU64::new(blank)).collect(),
            width,
            height,
            frozen: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stores one pixel. Returns `false` when the write was dropped because
    /// the buffer is frozen or the coordinate is out of bounds.
    pub fn set_pixel(&self, row: usize, col: usize, color: DisplayColor) -> bool {
        if row >= self.height || col >= self.width {
            return false;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.frozen.load(Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        self.cells[row * self.width + col].store(color.pack() as u64 | WRITTEN_BIT, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Release);
        true
    }

    pub fn get_pixel(&self, row: usize, col: usize) -> DisplayColor {
        let cell = self.cells[row * self.width + col].load(Ordering::Relaxed);
        DisplayColor::unpack(cell as u32)
    }

    pub fn is_written(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.width + col].load(Ordering::Relaxed) & WRITTEN_BIT != 0
    }

    pub fn written_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.load(Ordering::Relaxed) & WRITTEN_BIT != 0)
            .count()
    }

    /// Row-major copy of the current contents. Not consistent across pixels.
    pub fn snapshot(&self) -> Vec<DisplayColor> {
        self.cells
            .iter()
            .map(|cell| DisplayColor::unpack(cell.load(Ordering::Relaxed) as u32))
            .collect()
    }

    /// Rejects all further writes. Once this returns, every store that was
    /// already past the frozen check has landed and no other store will.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            std::hint::spin_loop();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }
}

impl FramebufferView for ProgressiveBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn get_pixel(&self, row: usize, col: usize) -> DisplayColor {
        ProgressiveBuffer::get_pixel(self, row, col)
    }
}

/// The producer's full-precision working image for the preview pass.
/// Channels are stored as `f64` bits; unwritten pixels read as zero.
pub struct RadianceBuffer {
    cells: Vec<[AtomicU64; 3]>,
    width: usize,
    height: usize,
}

impl RadianceBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: (0..width * height).map(|_| Default::default()).collect(),
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn set_pixel(&self, row: usize, col: usize, color: Radiance) {
        let cell = &self.cells[row * self.width + col];
        cell[0].store(color.x.to_bits(), Ordering::Relaxed);
        cell[1].store(color.y.to_bits(), Ordering::Relaxed);
        cell[2].store(color.z.to_bits(), Ordering::Relaxed);
    }

    pub fn to_vec(&self) -> Vec<Radiance> {
        self.cells.iter().map(Self::load).collect()
    }

    fn load(cell: &[AtomicU64; 3]) -> Radiance {
        Radiance::new(
            f64::from_bits(cell[0].load(Ordering::Relaxed)),
            f64::from_bits(cell[1].load(Ordering::Relaxed)),
            f64::from_bits(cell[2].load(Ordering::Relaxed)),
        )
    }
}

/// The completed image. Built once per session and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalResult {
    height: usize,
    width: usize,
    samples_per_pixel: u32,
    pixels: Vec<Radiance>,
}

impl FinalResult {
    pub fn new(
        height: usize,
        width: usize,
        samples_per_pixel: u32,
        pixels: Vec<Radiance>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let expected = width * height;
        if pixels.len() != expected {
            return Err(Error::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            height,
            width,
            samples_per_pixel,
            pixels,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    pub fn pixels(&self) -> &[Radiance] {
        &self.pixels
    }

    pub fn pixel(&self, row: usize, col: usize) -> Radiance {
        self.pixels[row * self.width + col]
    }

    pub fn tonemapped(&self, tonemap: ToneMap, exposure: f32) -> ToneMapped<'_> {
        ToneMapped {
            result: self,
            tonemap,
            exposure,
        }
    }
}

/// Display view of a [`FinalResult`] through a tone-mapping operator.
pub struct ToneMapped<'a> {
    result: &'a FinalResult,
    tonemap: ToneMap,
    exposure: f32,
}

impl FramebufferView for ToneMapped<'_> {
    fn width(&self) -> usize {
        self.result.width
    }

    fn height(&self) -> usize {
        self.result.height
    }

    fn get_pixel(&self, row: usize, col: usize) -> DisplayColor {
        DisplayColor::from_radiance(self.result.pixel(row, col), self.tonemap, self.exposure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fresh_buffer_reads_opaque_black() {
        let buffer = ProgressiveBuffer::new(3, 2);
        assert!(buffer.snapshot().iter().all(|&c| c == DisplayColor::BLACK));
        assert_eq!(buffer.written_count(), 0);
    }

    #[test]
    fn writes_are_tracked_per_cell() {
        let buffer = ProgressiveBuffer::new(2, 2);
        let color = DisplayColor::new(10, 10, 10, 255);
        assert!(buffer.set_pixel(1, 0, color));
        assert!(!buffer.set_pixel(2, 0, color));

        assert_eq!(buffer.get_pixel(1, 0), color);
        assert!(buffer.is_written(1, 0));
        assert!(!buffer.is_written(0, 0));
        assert_eq!(buffer.written_count(), 1);
    }

    #[test]
    fn frozen_buffer_rejects_writes() {
        let buffer = ProgressiveBuffer::new(2, 2);
        buffer.set_pixel(0, 0, DisplayColor::new(1, 2, 3, 255));
        buffer.freeze();

        assert!(!buffer.set_pixel(0, 0, DisplayColor::new(9, 9, 9, 255)));
        assert!(!buffer.set_pixel(1, 1, DisplayColor::new(9, 9, 9, 255)));
        assert_eq!(buffer.get_pixel(0, 0), DisplayColor::new(1, 2, 3, 255));
        assert_eq!(buffer.written_count(), 1);
    }

    #[test]
    fn freeze_waits_for_concurrent_writers() {
        let buffer = Arc::new(ProgressiveBuffer::new(64, 64));
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut round = 0u8;
                while !buffer.is_frozen() {
                    for row in 0..64 {
                        for col in 0..64 {
                            buffer.set_pixel(row, col, DisplayColor::new(round, 0, 0, 255));
                        }
                    }
                    round = round.wrapping_add(1);
                }
            })
        };

        thread::sleep(std::time::Duration::from_millis(5));
        buffer.freeze();
        let frozen = buffer.snapshot();
        writer.join().unwrap();
        assert_eq!(buffer.snapshot(), frozen);
    }

    #[test]
    fn radiance_buffer_defaults_to_zero() {
        let buffer = RadianceBuffer::new(2, 2);
        buffer.set_pixel(0, 1, Radiance::new(0.25, 1.5, 1e9));
        let pixels = buffer.to_vec();
        assert_eq!(pixels[1], Radiance::new(0.25, 1.5, 1e9));
        assert_eq!(pixels[0], Radiance::ZERO);
        assert_eq!(pixels[3], Radiance::ZERO);
    }

    #[test]
    fn final_result_checks_length() {
        let err = FinalResult::new(2, 2, 4, vec![Radiance::ZERO; 3]).unwrap_err();
        assert!(matches!(err, Error::PixelCountMismatch { expected: 4, actual: 3 }));
        assert!(FinalResult::new(0, 2, 4, Vec::new()).is_err());

        let result = FinalResult::new(1, 2, 4, vec![Radiance::ZERO, Radiance::ONE]).unwrap();
        assert_eq!(result.pixel(0, 1), Radiance::ONE);
    }
}
