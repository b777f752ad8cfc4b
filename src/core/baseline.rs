//! Interferometric baseline between a master and a slave acquisition.
//!
//! The baseline is computed exactly on a grid of (line, pixel, height)
//! samples across the master image and modelled per quantity by a quadratic
//! polynomial in normalized coordinates:
//!
//! `B(l,p,h) = a000 + a100 l + a010 p + a001 h + a110 lp + a101 lh + a011 ph
//!             + a200 l^2 + a020 p^2 + a002 h^2`
//!
//! with `l`, `p`, `h` mapped onto `[-2, 2]` over the modelled extent.
//! Evaluation outside that extent extrapolates the polynomial.

use crate::core::poly::{least_squares, normalize2};
use crate::core::{Orbit, Point, SlcImage};
use crate::types::{SarError, SarResult};
use nalgebra::DMatrix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Number of terms of the (line, pixel, height) quadratic
const NUM_COEFFS: usize = 10;

/// Max Bperp model error at the samples (m) above which the model is reported as poor
const MAX_BPERP_RESIDUAL: f64 = 2.0;

/// Sampling of the baseline model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Samples in azimuth, spread over the full line extent
    pub azimuth_points: usize,
    /// Samples in range, spread over the full pixel extent
    pub range_points: usize,
    /// Height levels from `min_height` to `max_height`
    pub height_levels: usize,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            azimuth_points: 10, // roughly every 10 km in azimuth
            range_points: 10,
            height_levels: 4,
            min_height: 0.0,
            max_height: 5000.0,
        }
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> SarResult<()> {
        // a quadratic needs three distinct values per axis
        if self.azimuth_points < 3 || self.range_points < 3 || self.height_levels < 3 {
            return Err(SarError::InvalidInput(format!(
                "baseline grid {}x{}x{} too coarse for a quadratic model",
                self.azimuth_points, self.range_points, self.height_levels
            )));
        }
        let finite = self.min_height.is_finite() && self.max_height.is_finite();
        if !finite || self.max_height <= self.min_height {
            return Err(SarError::InvalidInput(format!(
                "invalid baseline height range [{}, {}]",
                self.min_height, self.max_height
            )));
        }
        Ok(())
    }
}

/// Quantities provided by a baseline model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineQuantity {
    Perpendicular,
    Parallel,
    /// Look angle at the master satellite
    Theta,
    /// Incidence angle at the ground point
    ThetaInc,
    Total,
    /// Orientation angle of the baseline
    Alpha,
    Horizontal,
    Vertical,
    HeightAmbiguity,
}

/// Baseline parameters at one (line, pixel, height)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineComponents {
    /// Total baseline (m)
    pub b: f64,
    /// Parallel baseline `|M-P| - |S-P|` (m)
    pub bpar: f64,
    /// Perpendicular baseline (m), positive when the slave looks from a smaller angle
    pub bperp: f64,
    /// Look angle (rad)
    pub theta: f64,
    /// Incidence angle (rad)
    pub theta_inc: f64,
    /// Baseline orientation (rad); NaN when Bpar and Bperp are both zero
    pub alpha: f64,
    pub bhor: f64,
    pub bvert: f64,
    /// Height of ambiguity (m); infinite when Bperp is zero
    pub hamb: f64,
}

impl BaselineComponents {
    fn derive(
        bpar: f64,
        bperp: f64,
        theta: f64,
        theta_inc: f64,
        wavelength: f64,
        range: f64,
    ) -> Self {
        let b = bpar.hypot(bperp);
        let alpha = if bpar == 0.0 && bperp == 0.0 {
            f64::NAN
        } else {
            theta - bpar.atan2(bperp)
        };
        let hamb = if bperp == 0.0 {
            f64::INFINITY
        } else {
            -wavelength * range * theta_inc.sin() / (2.0 * bperp)
        };
        Self {
            b,
            bpar,
            bperp,
            theta,
            theta_inc,
            alpha,
            bhor: b * alpha.cos(),
            bvert: b * alpha.sin(),
            hamb,
        }
    }

    pub fn get(&self, quantity: BaselineQuantity) -> f64 {
        match quantity {
            BaselineQuantity::Perpendicular => self.bperp,
            BaselineQuantity::Parallel => self.bpar,
            BaselineQuantity::Theta => self.theta,
            BaselineQuantity::ThetaInc => self.theta_inc,
            BaselineQuantity::Total => self.b,
            BaselineQuantity::Alpha => self.alpha,
            BaselineQuantity::Horizontal => self.bhor,
            BaselineQuantity::Vertical => self.bvert,
            BaselineQuantity::HeightAmbiguity => self.hamb,
        }
    }
}

/// One acquisition: its timing and its orbit
#[derive(Debug, Clone)]
struct Acquisition {
    image: SlcImage,
    orbit: Orbit,
}

/// Exact geometry at one sample
#[derive(Debug, Clone, Copy)]
struct Sample {
    line: f64,
    pixel: f64,
    height: f64,
    bpar: f64,
    bperp: f64,
    theta: f64,
    theta_inc: f64,
    /// |M - P|
    range: f64,
    /// Angle between master and slave velocity (rad)
    orbit_convergence: f64,
}

impl Sample {
    fn compute(
        master: &Acquisition,
        slave: &Acquisition,
        line: f64,
        pixel: f64,
        height: f64,
    ) -> SarResult<Self> {
        let ground = master
            .orbit
            .lph2xyz(line, pixel, height, &master.image)?
            .into_result()?;

        let master_time = master.image.line2ta(line);
        let master_pos = master.orbit.get_xyz(master_time);
        let slave_time = slave.orbit.xyz2t(&ground, &slave.image)?.into_result()?.azimuth_time;
        let slave_pos = slave.orbit.get_xyz(slave_time);

        let orbit_convergence = master
            .orbit
            .get_xyz_dot(master_time)
            .angle(&slave.orbit.get_xyz_dot(slave_time))?;

        let b = master_pos.distance(&slave_pos);
        let master_look = master_pos.subtract(&ground);
        let slave_look = slave_pos.subtract(&ground);
        let range = master_look.norm();
        let bpar = range - slave_look.norm();

        let theta = master_pos.angle(&master_look)?;
        let bperp2 = b * b - bpar * bpar;
        let bperp = if bperp2 < 0.0 {
            0.0
        } else if theta > master_pos.angle(&slave_look)? {
            bperp2.sqrt()
        } else {
            -bperp2.sqrt()
        };
        let theta_inc = ground.angle(&master_look)?;

        log::trace!(
            "sample ({}, {}, {}): B {:.3}, Bpar {:.3}, Bperp {:.3}, theta {:.4}°, conv {:.6}°",
            line,
            pixel,
            height,
            b,
            bpar,
            bperp,
            theta.to_degrees(),
            orbit_convergence.to_degrees()
        );

        Ok(Self { line, pixel, height, bpar, bperp, theta, theta_inc, range, orbit_convergence })
    }
}

/// Normalization of (line, pixel, height) onto [-2, 2]
#[derive(Debug, Clone, Copy)]
struct ModelDomain {
    line_min: f64,
    line_max: f64,
    pixel_min: f64,
    pixel_max: f64,
    height_min: f64,
    height_max: f64,
}

impl ModelDomain {
    fn terms(&self, line: f64, pixel: f64, height: f64) -> [f64; NUM_COEFFS] {
        let l = normalize2(line, self.line_min, self.line_max);
        let p = normalize2(pixel, self.pixel_min, self.pixel_max);
        let h = normalize2(height, self.height_min, self.height_max);
        [1.0, l, p, h, l * p, l * h, p * h, l * l, p * p, h * h]
    }
}

fn polyval(coeffs: &[f64; NUM_COEFFS], terms: &[f64; NUM_COEFFS]) -> f64 {
    coeffs.iter().zip(terms.iter()).map(|(c, t)| c * t).sum()
}

/// Fitted baseline model of a master/slave pair
#[derive(Debug, Clone)]
pub struct Baseline {
    master: Acquisition,
    slave: Acquisition,
    config: BaselineConfig,
    domain: ModelDomain,
    wavelength: f64,
    /// range(p) = near_range + drange_dp * p
    near_range: f64,
    drange_dp: f64,
    orbit_convergence: f64,
    max_bperp_residual: f64,
    bperp_coeffs: [f64; NUM_COEFFS],
    bpar_coeffs: [f64; NUM_COEFFS],
    theta_coeffs: [f64; NUM_COEFFS],
    theta_inc_coeffs: [f64; NUM_COEFFS],
}

impl Baseline {
    /// Model the baseline with the default sampling
    pub fn model(
        master: &SlcImage,
        slave: &SlcImage,
        master_orbit: &Orbit,
        slave_orbit: &Orbit,
    ) -> SarResult<Self> {
        Self::model_with_config(master, slave, master_orbit, slave_orbit, BaselineConfig::default())
    }

    pub fn model_with_config(
        master: &SlcImage,
        slave: &SlcImage,
        master_orbit: &Orbit,
        slave_orbit: &Orbit,
        config: BaselineConfig,
    ) -> SarResult<Self> {
        config.validate()?;
        master.validate()?;
        slave.validate()?;

        log::info!(
            "Modelling baseline on {}x{}x{} samples",
            config.azimuth_points,
            config.range_points,
            config.height_levels
        );

        let master = Acquisition { image: master.clone(), orbit: master_orbit.clone() };
        let slave = Acquisition { image: slave.clone(), orbit: slave_orbit.clone() };

        let window = master.image.window;
        let domain = ModelDomain {
            line_min: window.linelo as f64,
            line_max: window.linehi as f64,
            pixel_min: window.pixlo as f64,
            pixel_max: window.pixhi as f64,
            height_min: config.min_height,
            height_max: config.max_height,
        };

        let nodes = grid_nodes(&domain, &config);
        let samples = sample_grid_parallel(&master, &slave, &nodes)?;

        let design = DMatrix::from_fn(samples.len(), NUM_COEFFS, |i, k| {
            domain.terms(samples[i].line, samples[i].pixel, samples[i].height)[k]
        });
        let observations = DMatrix::from_fn(samples.len(), 4, |i, j| match j {
            0 => samples[i].bperp,
            1 => samples[i].bpar,
            2 => samples[i].theta,
            _ => samples[i].theta_inc,
        });
        let solution = least_squares(&design, &observations)?;

        let column = |j: usize| -> [f64; NUM_COEFFS] {
            let mut coeffs = [0.0; NUM_COEFFS];
            for (k, c) in coeffs.iter_mut().enumerate() {
                *c = solution[(k, j)];
            }
            coeffs
        };
        let bperp_coeffs = column(0);

        let residuals = &observations - &design * &solution;
        let max_bperp_residual = residuals.column(0).amax();

        log::debug!("Result of modelling: Bperp(l,p,h) = a000 + a100*l + a010*p + a001*h +");
        log::debug!("  a110*l*p + a101*l*h + a011*p*h + a200*l^2 + a020*p^2 + a002*h^2");
        log::debug!("l,p,h in normalized coordinates [-2:2]");
        log::debug!("Bperp coefficients: {:?}", bperp_coeffs);

        if max_bperp_residual > MAX_BPERP_RESIDUAL {
            log::warn!("Max. error bperp modelling at 3D datapoints: {:.3} m", max_bperp_residual);
        } else {
            log::info!("Max. error bperp modelling at 3D datapoints: {:.3e} m", max_bperp_residual);
        }

        let orbit_convergence =
            samples.iter().map(|s| s.orbit_convergence).sum::<f64>() / samples.len() as f64;
        log::debug!(
            "Angle between master and slave orbits: {:.6} deg",
            orbit_convergence.to_degrees()
        );

        // p starts at 1
        let drange_dp = master.image.pix2range(2.0) - master.image.pix2range(1.0);
        let near_range = master.image.pix2range(1.0) - drange_dp;
        log::debug!("range = {} + {}*p", near_range, drange_dp);

        Ok(Self {
            wavelength: master.image.wavelength,
            master,
            slave,
            config,
            domain,
            near_range,
            drange_dp,
            orbit_convergence,
            max_bperp_residual,
            bperp_coeffs,
            bpar_coeffs: column(1),
            theta_coeffs: column(2),
            theta_inc_coeffs: column(3),
        })
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Largest Bperp model error at the samples (m)
    pub fn max_bperp_residual(&self) -> f64 {
        self.max_bperp_residual
    }

    /// Mean angle between master and slave velocity over the samples (rad)
    pub fn orbit_convergence(&self) -> f64 {
        self.orbit_convergence
    }

    pub fn bperp_coeffs(&self) -> &[f64] {
        &self.bperp_coeffs
    }

    /// Slant range of a master pixel
    pub fn get_range(&self, pixel: f64) -> f64 {
        self.near_range + self.drange_dp * pixel
    }

    /// All modelled and derived quantities at (line, pixel, height)
    pub fn evaluate(&self, line: f64, pixel: f64, height: f64) -> BaselineComponents {
        let terms = self.domain.terms(line, pixel, height);
        BaselineComponents::derive(
            polyval(&self.bpar_coeffs, &terms),
            polyval(&self.bperp_coeffs, &terms),
            polyval(&self.theta_coeffs, &terms),
            polyval(&self.theta_inc_coeffs, &terms),
            self.wavelength,
            self.get_range(pixel),
        )
    }

    pub fn get_bperp(&self, line: f64, pixel: f64) -> f64 {
        self.get_bperp_3d(line, pixel, 0.0)
    }

    pub fn get_bperp_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        polyval(&self.bperp_coeffs, &self.domain.terms(line, pixel, height))
    }

    /// `p.y` is the line, `p.x` the pixel and `p.z` the height
    pub fn get_bperp_point(&self, p: &Point) -> f64 {
        self.get_bperp_3d(p.y, p.x, p.z)
    }

    pub fn get_bpar(&self, line: f64, pixel: f64) -> f64 {
        self.get_bpar_3d(line, pixel, 0.0)
    }

    pub fn get_bpar_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        polyval(&self.bpar_coeffs, &self.domain.terms(line, pixel, height))
    }

    pub fn get_bpar_point(&self, p: &Point) -> f64 {
        self.get_bpar_3d(p.y, p.x, p.z)
    }

    pub fn get_theta(&self, line: f64, pixel: f64) -> f64 {
        self.get_theta_3d(line, pixel, 0.0)
    }

    pub fn get_theta_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        polyval(&self.theta_coeffs, &self.domain.terms(line, pixel, height))
    }

    pub fn get_theta_point(&self, p: &Point) -> f64 {
        self.get_theta_3d(p.y, p.x, p.z)
    }

    pub fn get_theta_inc(&self, line: f64, pixel: f64) -> f64 {
        self.get_theta_inc_3d(line, pixel, 0.0)
    }

    pub fn get_theta_inc_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        polyval(&self.theta_inc_coeffs, &self.domain.terms(line, pixel, height))
    }

    pub fn get_theta_inc_point(&self, p: &Point) -> f64 {
        self.get_theta_inc_3d(p.y, p.x, p.z)
    }

    pub fn get_b(&self, line: f64, pixel: f64) -> f64 {
        self.evaluate(line, pixel, 0.0).b
    }

    pub fn get_b_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        self.evaluate(line, pixel, height).b
    }

    pub fn get_b_point(&self, p: &Point) -> f64 {
        self.get_b_3d(p.y, p.x, p.z)
    }

    /// NaN where both modelled Bpar and Bperp are exactly zero; check
    /// `is_finite()` before use. `exact` reports that case as an error.
    pub fn get_alpha(&self, line: f64, pixel: f64) -> f64 {
        self.evaluate(line, pixel, 0.0).alpha
    }

    pub fn get_alpha_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        self.evaluate(line, pixel, height).alpha
    }

    pub fn get_alpha_point(&self, p: &Point) -> f64 {
        self.get_alpha_3d(p.y, p.x, p.z)
    }

    pub fn get_bhor(&self, line: f64, pixel: f64) -> f64 {
        self.evaluate(line, pixel, 0.0).bhor
    }

    pub fn get_bhor_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        self.evaluate(line, pixel, height).bhor
    }

    pub fn get_bhor_point(&self, p: &Point) -> f64 {
        self.get_bhor_3d(p.y, p.x, p.z)
    }

    pub fn get_bvert(&self, line: f64, pixel: f64) -> f64 {
        self.evaluate(line, pixel, 0.0).bvert
    }

    pub fn get_bvert_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        self.evaluate(line, pixel, height).bvert
    }

    pub fn get_bvert_point(&self, p: &Point) -> f64 {
        self.get_bvert_3d(p.y, p.x, p.z)
    }

    /// Height of ambiguity; `f64::INFINITY` where the modelled Bperp is
    /// exactly zero, so check `is_finite()` before use. `exact` reports that
    /// case as `DegenerateGeometry`.
    pub fn get_hamb(&self, line: f64, pixel: f64) -> f64 {
        self.evaluate(line, pixel, 0.0).hamb
    }

    pub fn get_hamb_3d(&self, line: f64, pixel: f64, height: f64) -> f64 {
        self.evaluate(line, pixel, height).hamb
    }

    pub fn get_hamb_point(&self, p: &Point) -> f64 {
        self.get_hamb_3d(p.y, p.x, p.z)
    }

    /// Evaluate one quantity at height 0 on the grid `lines x pixels`
    pub fn evaluate_grid(
        &self,
        quantity: BaselineQuantity,
        lines: &[f64],
        pixels: &[f64],
    ) -> Array2<f64> {
        Array2::from_shape_fn((lines.len(), pixels.len()), |(i, j)| {
            self.evaluate(lines[i], pixels[j], 0.0).get(quantity)
        })
    }

    /// Baseline computed directly from the orbits, without the model
    pub fn exact(&self, line: f64, pixel: f64, height: f64) -> SarResult<BaselineComponents> {
        let sample = Sample::compute(&self.master, &self.slave, line, pixel, height)?;
        if sample.bperp == 0.0 {
            return Err(SarError::DegenerateGeometry(format!(
                "zero perpendicular baseline at line {}, pixel {}: height of ambiguity undefined",
                line, pixel
            )));
        }
        Ok(BaselineComponents::derive(
            sample.bpar,
            sample.bperp,
            sample.theta,
            sample.theta_inc,
            self.wavelength,
            sample.range,
        ))
    }

    /// Log the baseline parameters at (line, pixel, height)
    pub fn dump(&self, line: f64, pixel: f64, height: f64) -> BaselineComponents {
        let c = self.evaluate(line, pixel, height);

        log::info!("The baseline parameters for (l,p,h) = {}, {}, {}", line, pixel, height);
        log::info!("\tBpar, Bperp:      \t{} \t{}", c.bpar, c.bperp);
        log::debug!("\tB, alpha (deg):   \t{} \t{}", c.b, c.alpha.to_degrees());
        log::debug!("\tBh, Bv:           \t{} \t{}", c.bhor, c.bvert);
        log::info!("\tHeight ambiguity: \t{}", c.hamb);
        log::info!("\tLook angle (deg): \t{}", c.theta.to_degrees());
        log::debug!("\tIncidence angle (deg): \t{}", c.theta_inc.to_degrees());

        c
    }
}

/// Sample positions, evenly spread over the inclusive model extent
fn grid_nodes(domain: &ModelDomain, config: &BaselineConfig) -> Vec<(f64, f64, f64)> {
    let spread =
        |min: f64, max: f64, n: usize, i: usize| min + i as f64 * (max - min) / (n - 1) as f64;

    let count = config.height_levels * config.azimuth_points * config.range_points;
    let mut nodes = Vec::with_capacity(count);
    for k in 0..config.height_levels {
        let height = spread(domain.height_min, domain.height_max, config.height_levels, k);
        for i in 0..config.azimuth_points {
            let line = spread(domain.line_min, domain.line_max, config.azimuth_points, i);
            for j in 0..config.range_points {
                let pixel = spread(domain.pixel_min, domain.pixel_max, config.range_points, j);
                nodes.push((line, pixel, height));
            }
        }
    }
    nodes
}

#[cfg_attr(feature = "parallel", allow(dead_code))]
fn sample_grid(
    master: &Acquisition,
    slave: &Acquisition,
    nodes: &[(f64, f64, f64)],
) -> SarResult<Vec<Sample>> {
    nodes
        .iter()
        .map(|&(line, pixel, height)| Sample::compute(master, slave, line, pixel, height))
        .collect()
}

#[cfg(feature = "parallel")]
fn sample_grid_parallel(
    master: &Acquisition,
    slave: &Acquisition,
    nodes: &[(f64, f64, f64)],
) -> SarResult<Vec<Sample>> {
    use rayon::prelude::*;

    log::debug!("Sampling {} baseline nodes in parallel", nodes.len());

    nodes
        .par_iter()
        .map(|&(line, pixel, height)| Sample::compute(master, slave, line, pixel, height))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn sample_grid_parallel(
    master: &Acquisition,
    slave: &Acquisition,
    nodes: &[(f64, f64, f64)],
) -> SarResult<Vec<Sample>> {
    sample_grid(master, slave, nodes)
}
