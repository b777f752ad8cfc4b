use crate::core::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speed of light in vacuum (m/s)
pub const SOL: f64 = 299_792_458.0;

/// Orbit record as delivered by an orbit/annotation reader (absolute UTC time)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitRecord {
    pub time: DateTime<Utc>,
    pub position: [f64; 3],  // [x, y, z] in meters
    pub velocity: [f64; 3],  // [vx, vy, vz] in m/s
}

/// Orbit information for one acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitData {
    pub records: Vec<OrbitRecord>,
    /// Epoch that relative state vector times are counted from
    pub reference_time: DateTime<Utc>,
}

/// Orbit state vector: time in seconds relative to a reference epoch and ECEF position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub time: f64,
    pub position: Point,
}

impl StateVector {
    pub fn new(time: f64, position: Point) -> Self {
        Self { time, position }
    }

    /// Build from a `[t, x, y, z]` row as found in orbit tables
    pub fn from_row(row: [f64; 4]) -> Self {
        Self::new(row[0], Point::new(row[1], row[2], row[3]))
    }
}

impl OrbitData {
    /// Convert the absolute records into state vectors relative to `reference_time`
    pub fn to_state_vectors(&self) -> SarResult<Vec<StateVector>> {
        self.records
            .iter()
            .map(|record| {
                let nanos = record
                    .time
                    .signed_duration_since(self.reference_time)
                    .num_nanoseconds()
                    .ok_or_else(|| {
                        SarError::InvalidInput(format!(
                            "state vector time {} too far from reference epoch {}",
                            record.time, self.reference_time
                        ))
                    })?;
                Ok(StateVector::new(
                    nanos as f64 / 1e9,
                    Point::from_array(record.position),
                ))
            })
            .collect()
    }

    /// Sanity check of orbit records: ordering plus plausible radius and speed
    pub fn validate(&self) -> SarResult<()> {
        if self.records.is_empty() {
            return Err(SarError::InsufficientData { required: 1, available: 0 });
        }

        for pair in self.records.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(SarError::InvalidInput(format!(
                    "orbit records not strictly increasing in time at {}",
                    pair[1].time
                )));
            }
        }

        for record in &self.records {
            let speed = Point::from_array(record.velocity).norm();
            if !(6_000.0..=9_000.0).contains(&speed) {
                log::warn!("Unusual orbital velocity: {:.1} m/s at {}", speed, record.time);
            }

            let radius = Point::from_array(record.position).norm();
            if !(6_500_000.0..=8_500_000.0).contains(&radius) {
                log::warn!("Unusual orbital radius: {:.1} km at {}", radius / 1000.0, record.time);
            }
        }

        log::debug!("Orbit data validation completed successfully");
        Ok(())
    }
}

/// Geodetic coordinates: latitude and longitude in radians, height in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub phi: f64,
    pub lambda: f64,
    pub height: f64,
}

impl Geodetic {
    pub fn new(phi: f64, lambda: f64, height: f64) -> Self {
        Self { phi, lambda, height }
    }

    pub fn from_degrees(lat: f64, lon: f64, height: f64) -> Self {
        Self::new(lat.to_radians(), lon.to_radians(), height)
    }

    pub fn to_degrees(&self) -> (f64, f64, f64) {
        (self.phi.to_degrees(), self.lambda.to_degrees(), self.height)
    }
}

/// Two-way slant range time and azimuth time of a target (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarTime {
    pub range_time: f64,
    pub azimuth_time: f64,
}

/// Outcome of an iterative solver.
///
/// A solver that runs out of iterations still hands back its best estimate;
/// `converged` tells whether the tolerance was met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solved<T> {
    pub value: T,
    pub iterations: usize,
    pub converged: bool,
    /// Magnitude of the last update step
    pub residual: f64,
}

impl<T> Solved<T> {
    /// Best estimate, whether or not the iteration converged
    pub fn value(self) -> T {
        self.value
    }

    /// Value if converged, `NonConvergence` otherwise
    pub fn into_result(self) -> SarResult<T> {
        if self.converged {
            Ok(self.value)
        } else {
            Err(SarError::NonConvergence {
                iterations: self.iterations,
                residual: self.residual,
            })
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Solved<U> {
        Solved {
            value: f(self.value),
            iterations: self.iterations,
            converged: self.converged,
            residual: self.residual,
        }
    }

    /// Feed the estimate into a second solver; the result converged only if
    /// both stages did
    pub fn and_then<U, F>(self, f: F) -> SarResult<Solved<U>>
    where
        F: FnOnce(T) -> SarResult<Solved<U>>,
    {
        let (iterations, converged, residual) = (self.iterations, self.converged, self.residual);
        let next = f(self.value)?;
        Ok(Solved {
            value: next.value,
            iterations: iterations + next.iterations,
            converged: converged && next.converged,
            residual: residual.max(next.residual),
        })
    }
}

/// Error types for orbit and geometry computations
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("Insufficient data: {required} samples required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("No convergence after {iterations} iterations (last update {residual:e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),
}

/// Result type for orbit and geometry operations
pub type SarResult<T> = Result<T, SarError>;
