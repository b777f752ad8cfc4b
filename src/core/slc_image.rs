//! Acquisition timing of a single-look complex image.
//!
//! Lines and pixels are 1-based: line 1 is acquired at `azimuth_time1`,
//! pixel 1 at two-way range time `range_time1`. Both mappings are linear.

use crate::core::{Ellipsoid, Point};
use crate::types::{Geodetic, SarError, SarResult, SOL};
use serde::{Deserialize, Serialize};

/// Processed extent of the image (inclusive, 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageWindow {
    pub linelo: usize,
    pub linehi: usize,
    pub pixlo: usize,
    pub pixhi: usize,
}

impl ImageWindow {
    pub fn new(linelo: usize, linehi: usize, pixlo: usize, pixhi: usize) -> Self {
        Self { linelo, linehi, pixlo, pixhi }
    }

    pub fn lines(&self) -> usize {
        self.linehi + 1 - self.linelo
    }

    pub fn pixels(&self) -> usize {
        self.pixhi + 1 - self.pixlo
    }
}

/// Timing model of an SLC acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlcImage {
    /// Two-way slant range time of the first pixel (s)
    pub range_time1: f64,
    /// Range sampling rate (Hz)
    pub range_sampling_rate: f64,
    /// Azimuth time of the first line, relative to the orbit epoch (s)
    pub azimuth_time1: f64,
    /// Pulse repetition frequency, i.e. lines per second (Hz)
    pub prf: f64,
    /// Radar wavelength (m)
    pub wavelength: f64,
    /// Processed azimuth bandwidth (Hz)
    pub azimuth_bandwidth: f64,
    /// Multilook factor in azimuth
    pub azimuth_looks: u32,
    pub window: ImageWindow,
    /// Approximate geodetic position of the scene centre, used as the
    /// starting point of the geocoding iterations
    pub scene_centre: Geodetic,
}

impl SlcImage {
    /// Check that the timing parameters describe a usable image
    pub fn validate(&self) -> SarResult<()> {
        let positive = [
            ("range_time1", self.range_time1),
            ("range_sampling_rate", self.range_sampling_rate),
            ("prf", self.prf),
            ("wavelength", self.wavelength),
            ("azimuth_bandwidth", self.azimuth_bandwidth),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SarError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.azimuth_time1.is_finite() {
            return Err(SarError::InvalidInput("azimuth_time1 is not finite".to_string()));
        }
        if self.azimuth_looks == 0 {
            return Err(SarError::InvalidInput("azimuth_looks must be at least 1".to_string()));
        }
        let w = &self.window;
        if w.linelo == 0 || w.pixlo == 0 || w.linehi <= w.linelo || w.pixhi <= w.pixlo {
            return Err(SarError::InvalidInput(format!("invalid image window {:?}", w)));
        }
        let c = &self.scene_centre;
        if !(c.phi.is_finite() && c.lambda.is_finite() && c.height.is_finite()) {
            return Err(SarError::InvalidInput("scene centre is not finite".to_string()));
        }
        Ok(())
    }

    /// Azimuth time of a (fractional) line
    pub fn line2ta(&self, line: f64) -> f64 {
        self.azimuth_time1 + (line - 1.0) / self.prf
    }

    /// Line of an azimuth time
    pub fn ta2line(&self, azimuth_time: f64) -> f64 {
        1.0 + self.prf * (azimuth_time - self.azimuth_time1)
    }

    /// Two-way range time of a (fractional) pixel
    pub fn pix2tr(&self, pixel: f64) -> f64 {
        self.range_time1 + (pixel - 1.0) / self.range_sampling_rate
    }

    /// Pixel of a two-way range time
    pub fn tr2pix(&self, range_time: f64) -> f64 {
        1.0 + self.range_sampling_rate * (range_time - self.range_time1)
    }

    /// One-way slant range of a pixel (m)
    pub fn pix2range(&self, pixel: f64) -> f64 {
        SOL * self.pix2tr(pixel) / 2.0
    }

    /// Slant range sample spacing (m)
    pub fn range_pixel_spacing(&self) -> f64 {
        SOL / (2.0 * self.range_sampling_rate)
    }

    /// Radar coordinates of the window centre (`x` = pixel, `y` = line)
    pub fn approx_radar_centre(&self) -> Point {
        Point::new_2d(
            0.5 * (self.window.pixlo + self.window.pixhi) as f64,
            0.5 * (self.window.linelo + self.window.linehi) as f64,
        )
    }

    /// ECEF position of the scene centre
    pub fn approx_xyz_centre(&self, ellipsoid: &Ellipsoid) -> Point {
        ellipsoid.ell2xyz(&self.scene_centre)
    }
}
