//! Polynomial orbit model and the range-Doppler geometry solvers built on it.
//!
//! An [`OrbitBuilder`] collects state vectors; fitting it produces an
//! [`Orbit`], which is immutable apart from a wholesale refit and can be
//! shared read-only between threads.

use crate::core::poly::{normalize_time, polyfit_series, polyval1d, polyval1d_derivative};
use crate::core::{Ellipsoid, Point, SlcImage};
use crate::types::{Geodetic, OrbitData, RadarTime, SarError, SarResult, Solved, StateVector, SOL};
use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Maximum Newton iterations of the geometry solvers
pub const MAX_ITERATIONS: usize = 10;

/// Convergence criterion on the position update of `lph2xyz` (m)
pub const CRITERION_POSITION: f64 = 1e-6;

/// Convergence criterion on the azimuth time update of `xyz2t` (s)
pub const CRITERION_TIME: f64 = 1e-10;

/// Largest allowed deviation of state vector spacing from the first interval (s)
const SPACING_TOLERANCE: f64 = 0.001;

/// Upper bound on the number of epochs written by `dump_orbit`
const MAX_DUMP_ROWS: usize = 1_000_000;

/// Iteration limits and input bounds of the geometry solvers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Stop `lph2xyz` once every component of the update is below this (m)
    pub position_tolerance: f64,
    /// Stop `xyz2t` once the azimuth time update is below this (s)
    pub time_tolerance: f64,
    /// Lowest accepted target height (m)
    pub min_height: f64,
    /// Highest accepted target height (m)
    pub max_height: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            position_tolerance: CRITERION_POSITION,
            time_tolerance: CRITERION_TIME,
            min_height: -12_000.0, // below the deepest ocean trench
            max_height: 100_000.0,
        }
    }
}

/// Collects state vectors before the polynomial fit
#[derive(Debug, Clone, Default)]
pub struct OrbitBuilder {
    state_vectors: Vec<StateVector>,
    ellipsoid: Ellipsoid,
    config: SolverConfig,
}

impl OrbitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a state vector; times must be finite and strictly increasing
    pub fn push(&mut self, state_vector: StateVector) -> SarResult<&mut Self> {
        if !state_vector.time.is_finite() || !state_vector.position.is_finite() {
            return Err(SarError::InvalidInput(format!(
                "non-finite state vector at t = {}",
                state_vector.time
            )));
        }
        if let Some(last) = self.state_vectors.last() {
            if state_vector.time <= last.time {
                return Err(SarError::InvalidInput(format!(
                    "state vector time {} does not follow {}",
                    state_vector.time, last.time
                )));
            }
        }
        self.state_vectors.push(state_vector);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.state_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_vectors.is_empty()
    }

    /// Fit the orbit polynomial of the given degree
    pub fn build(self, degree: usize) -> SarResult<Orbit> {
        let fit = OrbitFit::compute(&self.state_vectors, degree)?;
        Ok(Orbit {
            state_vectors: self.state_vectors,
            fit,
            ellipsoid: self.ellipsoid,
            config: self.config,
        })
    }
}

/// Polynomial coefficients per axis in normalized time
#[derive(Debug, Clone)]
struct OrbitFit {
    degree: usize,
    /// Time of the middle state vector, origin of the normalized time axis
    reference_time: f64,
    coeff_x: Vec<f64>,
    coeff_y: Vec<f64>,
    coeff_z: Vec<f64>,
}

impl OrbitFit {
    fn compute(state_vectors: &[StateVector], degree: usize) -> SarResult<Self> {
        log::info!("Computing coefficients for orbit polyfit degree: {}", degree);

        let num = state_vectors.len();
        if num < degree + 1 {
            return Err(SarError::InsufficientData { required: degree + 1, available: num });
        }

        let times: Vec<f64> = state_vectors.iter().map(|sv| sv.time).collect();
        if let Some(pair) = times.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(SarError::InvalidInput(format!(
                "state vector times not strictly increasing: {} followed by {}",
                pair[0], pair[1]
            )));
        }
        if num > 1 {
            let dt0 = times[1] - times[0];
            if times.windows(2).any(|pair| ((pair[1] - pair[0]) - dt0).abs() > SPACING_TOLERANCE) {
                log::warn!("Orbit: state vectors do not have equidistant time interval");
            }
        }

        let reference_time = times[num / 2];
        let normalized: Vec<f64> =
            times.iter().map(|&t| normalize_time(t, reference_time)).collect();
        let xs: Vec<f64> = state_vectors.iter().map(|sv| sv.position.x).collect();
        let ys: Vec<f64> = state_vectors.iter().map(|sv| sv.position.y).collect();
        let zs: Vec<f64> = state_vectors.iter().map(|sv| sv.position.z).collect();

        let mut coeffs = polyfit_series(&normalized, &[&xs, &ys, &zs], degree)?.into_iter();
        let (coeff_x, coeff_y, coeff_z) = match (coeffs.next(), coeffs.next(), coeffs.next()) {
            (Some(x), Some(y), Some(z)) => (x, y, z),
            _ => return Err(SarError::DegenerateFit("missing axis in orbit fit".to_string())),
        };

        log::debug!("Estimated coefficients x(t): {:?}", coeff_x);
        log::debug!("Estimated coefficients y(t): {:?}", coeff_y);
        log::debug!("Estimated coefficients z(t): {:?}", coeff_z);

        Ok(Self { degree, reference_time, coeff_x, coeff_y, coeff_z })
    }

    fn evaluate(&self, azimuth_time: f64, order: usize) -> Point {
        let t = normalize_time(azimuth_time, self.reference_time);
        let scale = 10f64.powi(order as i32);
        let axis = |coeffs: &[f64]| {
            if order == 0 {
                polyval1d(t, coeffs)
            } else {
                polyval1d_derivative(t, coeffs, order) / scale
            }
        };
        Point::new(axis(&self.coeff_x), axis(&self.coeff_y), axis(&self.coeff_z))
    }
}

/// Satellite orbit interpolated by a polynomial per ECEF axis
#[derive(Debug, Clone)]
pub struct Orbit {
    state_vectors: Vec<StateVector>,
    fit: OrbitFit,
    ellipsoid: Ellipsoid,
    config: SolverConfig,
}

impl Orbit {
    /// Fit an orbit through the given state vectors (WGS-84, default solver settings)
    pub fn new(state_vectors: Vec<StateVector>, degree: usize) -> SarResult<Self> {
        let mut builder = OrbitBuilder::new();
        for sv in state_vectors {
            builder.push(sv)?;
        }
        builder.build(degree)
    }

    /// Fit an orbit through annotation/orbit-file records, times relative to
    /// `data.reference_time`
    pub fn from_orbit_data(data: &OrbitData, degree: usize) -> SarResult<Self> {
        data.validate()?;
        Self::new(data.to_state_vectors()?, degree)
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Refit with a new degree. On failure the previous fit is kept.
    pub fn compute_coefficients(&mut self, degree: usize) -> SarResult<()> {
        self.fit = OrbitFit::compute(&self.state_vectors, degree)?;
        Ok(())
    }

    pub fn state_vectors(&self) -> &[StateVector] {
        &self.state_vectors
    }

    pub fn num_state_vectors(&self) -> usize {
        self.state_vectors.len()
    }

    pub fn degree(&self) -> usize {
        self.fit.degree
    }

    /// Origin of the normalized time axis of the coefficients
    pub fn reference_time(&self) -> f64 {
        self.fit.reference_time
    }

    /// Coefficients for x in normalized time `(t - reference_time) / 10`,
    /// constant term first
    pub fn coeff_x(&self) -> &[f64] {
        &self.fit.coeff_x
    }

    pub fn coeff_y(&self) -> &[f64] {
        &self.fit.coeff_y
    }

    pub fn coeff_z(&self) -> &[f64] {
        &self.fit.coeff_z
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.config
    }

    /// First and last state vector time
    pub fn time_span(&self) -> (f64, f64) {
        let first = self.state_vectors.first().map_or(f64::NAN, |sv| sv.time);
        let last = self.state_vectors.last().map_or(f64::NAN, |sv| sv.time);
        (first, last)
    }

    /// Satellite position at azimuth time `t`
    pub fn get_xyz(&self, t: f64) -> Point {
        self.fit.evaluate(t, 0)
    }

    /// Satellite velocity at azimuth time `t`
    pub fn get_xyz_dot(&self, t: f64) -> Point {
        self.fit.evaluate(t, 1)
    }

    /// Satellite acceleration at azimuth time `t`
    pub fn get_xyz_dot_dot(&self, t: f64) -> Point {
        self.fit.evaluate(t, 2)
    }

    /// Doppler equation, zero when the target is perpendicular to the velocity
    pub fn eq1_doppler(&self, velocity: &Point, sat_to_point: &Point) -> f64 {
        velocity.dot(sat_to_point)
    }

    /// Time derivative of the Doppler equation
    pub fn eq1_doppler_dt(
        &self,
        sat_to_point: &Point,
        velocity: &Point,
        acceleration: &Point,
    ) -> f64 {
        acceleration.dot(sat_to_point) - velocity.dot(velocity)
    }

    /// Range equation for a two-way range time
    pub fn eq2_range(&self, sat_to_point: &Point, range_time: f64) -> f64 {
        sat_to_point.dot(sat_to_point) - (SOL * range_time / 2.0).powi(2)
    }

    /// Ellipsoid equation for a surface `height` above the reference ellipsoid
    pub fn eq3_ellipsoid(&self, point: &Point, height: f64) -> f64 {
        self.ellipsoid.residual(point, height)
    }

    /// Range and azimuth time of a ground point, starting the Doppler
    /// iteration at the scene centre line of `image`
    pub fn xyz2t(&self, point: &Point, image: &SlcImage) -> SarResult<Solved<RadarTime>> {
        let initial = image.line2ta(image.approx_radar_centre().y);
        self.xyz2t_from(point, initial)
    }

    /// Range and azimuth time of a ground point, Newton iteration on the
    /// Doppler equation from `initial_azimuth_time`
    pub fn xyz2t_from(
        &self,
        point: &Point,
        initial_azimuth_time: f64,
    ) -> SarResult<Solved<RadarTime>> {
        if !point.is_finite() || !initial_azimuth_time.is_finite() {
            return Err(SarError::InvalidInput(format!(
                "xyz2t: non-finite input {} at t = {}",
                point, initial_azimuth_time
            )));
        }

        let mut azimuth_time = initial_azimuth_time;
        let mut step = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let position = self.get_xyz(azimuth_time);
            let velocity = self.get_xyz_dot(azimuth_time);
            let acceleration = self.get_xyz_dot_dot(azimuth_time);
            let delta = point.subtract(&position);
            if delta.norm2() == 0.0 {
                return Err(SarError::DegenerateGeometry(format!(
                    "target {} coincides with satellite position",
                    point
                )));
            }

            let derivative = self.eq1_doppler_dt(&delta, &velocity, &acceleration);
            if derivative == 0.0 || !derivative.is_finite() {
                return Err(SarError::DegenerateGeometry(format!(
                    "Doppler derivative vanishes at t = {}",
                    azimuth_time
                )));
            }

            step = -self.eq1_doppler(&velocity, &delta) / derivative;
            azimuth_time += step;

            if step.abs() < self.config.time_tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "x,y,z -> line, pix: max iterations ({}) reached, criterion {:e} s, dta {:e} s",
                self.config.max_iterations,
                self.config.time_tolerance,
                step
            );
        }

        let range = point.distance(&self.get_xyz(azimuth_time));
        Ok(Solved {
            value: RadarTime { range_time: 2.0 * range / SOL, azimuth_time },
            iterations,
            converged,
            residual: step.abs(),
        })
    }

    /// Radar coordinates (`x` = pixel, `y` = line) of a ground point
    pub fn xyz2lp(&self, point: &Point, image: &SlcImage) -> SarResult<Solved<Point>> {
        Ok(self
            .xyz2t(point, image)?
            .map(|t| Point::new_2d(image.tr2pix(t.range_time), image.ta2line(t.azimuth_time))))
    }

    /// Satellite position from which a ground point is imaged
    pub fn xyz2orb(&self, point: &Point, image: &SlcImage) -> SarResult<Solved<Point>> {
        Ok(self.xyz2t(point, image)?.map(|t| self.get_xyz(t.azimuth_time)))
    }

    /// Radar coordinates of a geodetic position
    pub fn ell2lp(&self, geo: &Geodetic, image: &SlcImage) -> SarResult<Solved<Point>> {
        self.xyz2lp(&self.ellipsoid.ell2xyz(geo), image)
    }

    /// Ground position of a line/pixel on the reference ellipsoid
    pub fn lp2xyz(&self, line: f64, pixel: f64, image: &SlcImage) -> SarResult<Solved<Point>> {
        self.lph2xyz(line, pixel, 0.0, image)
    }

    /// Ground position of a line/pixel at `height` above the reference ellipsoid
    pub fn lph2xyz(
        &self,
        line: f64,
        pixel: f64,
        height: f64,
        image: &SlcImage,
    ) -> SarResult<Solved<Point>> {
        if !line.is_finite() || !pixel.is_finite() {
            return Err(SarError::InvalidInput(format!(
                "lph2xyz: non-finite radar coordinates ({}, {})",
                line, pixel
            )));
        }
        self.lph2xyz_time(
            image.line2ta(line),
            image.pix2tr(pixel),
            height,
            &image.approx_xyz_centre(&self.ellipsoid),
        )
    }

    /// Ground position for an azimuth time and two-way range time.
    ///
    /// Newton iteration over x, y, z on the Doppler, range and ellipsoid
    /// equations, starting from `initial`.
    pub fn lph2xyz_time(
        &self,
        azimuth_time: f64,
        range_time: f64,
        height: f64,
        initial: &Point,
    ) -> SarResult<Solved<Point>> {
        if !azimuth_time.is_finite() || !range_time.is_finite() || !initial.is_finite() {
            return Err(SarError::InvalidInput("lph2xyz: non-finite input".to_string()));
        }
        let bounds = self.config.min_height..=self.config.max_height;
        if !height.is_finite() || !bounds.contains(&height) {
            return Err(SarError::InvalidInput(format!(
                "height {} outside [{}, {}] m",
                height, self.config.min_height, self.config.max_height
            )));
        }

        let satellite = self.get_xyz(azimuth_time);
        let velocity = self.get_xyz_dot(azimuth_time);

        let a2 = (self.ellipsoid.a + height).powi(2);
        let b2 = (self.ellipsoid.b + height).powi(2);

        let mut position = *initial;
        let mut residual = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let delta = position.subtract(&satellite);
            let equations = Vector3::new(
                -self.eq1_doppler(&velocity, &delta),
                -self.eq2_range(&delta, range_time),
                -self.eq3_ellipsoid(&position, height),
            );
            #[rustfmt::skip]
            let partials = Matrix3::new(
                velocity.x, velocity.y, velocity.z,
                2.0 * delta.x, 2.0 * delta.y, 2.0 * delta.z,
                2.0 * position.x / a2, 2.0 * position.y / a2, 2.0 * position.z / b2,
            );

            let update = partials.lu().solve(&equations).ok_or_else(|| {
                SarError::DegenerateGeometry(format!(
                    "singular range-Doppler system at {}",
                    position
                ))
            })?;

            position += Point::new(update[0], update[1], update[2]);
            residual = update.amax();

            if !position.is_finite() {
                return Err(SarError::DegenerateGeometry(
                    "range-Doppler iteration diverged".to_string(),
                ));
            }
            if residual < self.config.position_tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            log::trace!("ellipsoid position (converged): {}", position);
        } else {
            log::warn!(
                "line, pix -> x,y,z: max iterations ({}) reached, criterion {:e} m, update {:e} m",
                self.config.max_iterations,
                self.config.position_tolerance,
                residual
            );
        }

        Ok(Solved { value: position, iterations, converged, residual })
    }

    /// Geodetic position of a line/pixel on the reference ellipsoid
    pub fn lp2ell(&self, line: f64, pixel: f64, image: &SlcImage) -> SarResult<Solved<Geodetic>> {
        self.lph2ell(line, pixel, 0.0, image)
    }

    /// Geodetic position of a line/pixel at `height`
    pub fn lph2ell(
        &self,
        line: f64,
        pixel: f64,
        height: f64,
        image: &SlcImage,
    ) -> SarResult<Solved<Geodetic>> {
        Ok(self
            .lph2xyz(line, pixel, height, image)?
            .map(|xyz| self.ellipsoid.xyz2ell(&xyz)))
    }

    /// Satellite position imaging the ground point of a line/pixel
    pub fn lp2orb(&self, line: f64, pixel: f64, image: &SlcImage) -> SarResult<Solved<Point>> {
        self.lp2xyz(line, pixel, image)?
            .and_then(|xyz| self.xyz2orb(&xyz, image))
    }

    /// Geocentric radius of the ground point of a line/pixel
    pub fn compute_earth_radius(&self, line: f64, pixel: f64, image: &SlcImage) -> SarResult<f64> {
        Ok(self.lp2xyz(line, pixel, image)?.into_result()?.norm())
    }

    /// Geocentric radius of the satellite at the time of `line`
    pub fn compute_orbit_radius(&self, line: f64, image: &SlcImage) -> f64 {
        self.get_xyz(image.line2ta(line)).norm()
    }

    /// Distance flown by the satellite over one (multilooked) line
    pub fn compute_azimuth_delta(&self, line: f64, image: &SlcImage) -> SarResult<f64> {
        let here = self.get_xyz(image.line2ta(line));
        let next = self.get_xyz(image.line2ta(line + 1.0));
        let delta = f64::from(image.azimuth_looks) * here.distance(&next);
        if delta == 0.0 || !delta.is_finite() {
            return Err(SarError::DegenerateGeometry(format!(
                "satellite does not move between lines {} and {}",
                line,
                line + 1.0
            )));
        }
        Ok(delta)
    }

    /// Azimuth resolution at `line`: PRF / bandwidth times the single-look line spacing
    pub fn compute_azimuth_resolution(&self, line: f64, image: &SlcImage) -> SarResult<f64> {
        if image.azimuth_bandwidth <= 0.0 || image.azimuth_looks == 0 {
            return Err(SarError::DegenerateGeometry(format!(
                "azimuth bandwidth {} Hz, {} looks",
                image.azimuth_bandwidth, image.azimuth_looks
            )));
        }
        let delta = self.compute_azimuth_delta(line, image)?;
        Ok((image.prf / image.azimuth_bandwidth) * (delta / f64::from(image.azimuth_looks)))
    }

    /// Sample the orbit every `dt` seconds over the state vector span.
    ///
    /// Columns: t, x, y, z, vx, vy, vz, ax, ay, az.
    pub fn dump_orbit(&self, dt: f64) -> SarResult<Array2<f64>> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SarError::InvalidInput(format!(
                "dump interval must be positive, got {}",
                dt
            )));
        }

        log::info!(
            "dumporbits: MAXITER: {}; CRITERPOS: {:e} m; CRITERTIM: {:e} s",
            self.config.max_iterations,
            self.config.position_tolerance,
            self.config.time_tolerance
        );

        let (first, last) = self.time_span();
        let steps = (last - first) / dt;
        if steps.is_nan() || steps >= MAX_DUMP_ROWS as f64 {
            return Err(SarError::InvalidInput(format!(
                "dump interval {} s gives at least {} epochs over {} s",
                dt,
                MAX_DUMP_ROWS,
                last - first
            )));
        }
        let rows = 1 + steps as usize;
        let mut dump = Array2::zeros((rows, 10));

        for i in 0..rows {
            let t = first + i as f64 * dt;
            let values = [self.get_xyz(t), self.get_xyz_dot(t), self.get_xyz_dot_dot(t)];
            dump[[i, 0]] = t;
            for (k, p) in values.iter().enumerate() {
                dump[[i, 1 + 3 * k]] = p.x;
                dump[[i, 2 + 3 * k]] = p.y;
                dump[[i, 3 + 3 * k]] = p.z;
            }
        }

        Ok(dump)
    }
}
