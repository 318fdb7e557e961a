//! Run configuration.
//!
//! Every field has a default, so a JSON config file only needs to name the
//! values it changes:
//!
//! ```json
//! { "patients": 500, "capacities": { "x_ray": 3 } }
//! ```

use std::fs;
use std::path::Path;

use edsim_core::{Chance, PoissonArrivals, Triangular, TriangularParams, WeightedChoice};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Units available per resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    pub registration: usize,
    pub ward_a: usize,
    pub ward_b: usize,
    pub x_ray: usize,
    pub plaster: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            registration: 1,
            ward_a: 2,
            ward_b: 2,
            x_ray: 2,
            plaster: 1,
        }
    }
}

/// Triangular service times per station, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceTimes {
    pub registration: TriangularParams,
    pub ward_a: TriangularParams,
    pub ward_b: TriangularParams,
    pub x_ray: TriangularParams,
    pub plaster: TriangularParams,
}

const fn tri(min: f64, mode: f64, max: f64) -> TriangularParams {
    TriangularParams { min, mode, max }
}

impl Default for ServiceTimes {
    fn default() -> Self {
        Self {
            registration: tri(0.2, 0.5, 1.0),
            ward_a: tri(1.5, 3.2, 5.0),
            ward_b: tri(2.8, 4.1, 6.3),
            x_ray: tri(2.0, 2.8, 4.1),
            plaster: tri(3.0, 3.8, 4.7),
        }
    }
}

/// Configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdConfig {
    /// Patients generated before the arrival process stops.
    pub patients: usize,
    /// Seed of the random source; a fresh one is drawn when absent.
    pub seed: Option<u64>,
    /// Time at which the casualty ward staff comes on duty.
    pub staff_arrival: f64,
    /// Mean gap between two arrivals.
    pub mean_interarrival: f64,
    /// Relative frequency of patient types 1 to 4.
    pub type_weights: [f64; 4],
    /// Probability that a patient is assigned to ward A.
    pub ward_a_probability: f64,
    pub capacities: Capacities,
    pub service_times: ServiceTimes,
}

impl Default for EdConfig {
    fn default() -> Self {
        Self {
            patients: 250,
            seed: None,
            staff_arrival: 30.0,
            mean_interarrival: 0.3,
            type_weights: [35.0, 20.0, 5.0, 40.0],
            ward_a_probability: 0.6,
            capacities: Capacities::default(),
            service_times: ServiceTimes::default(),
        }
    }
}

impl EdConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EdConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter before anything is scheduled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_non_negative("staff_arrival", self.staff_arrival)?;
        validate_positive("mean_interarrival", self.mean_interarrival)?;
        PoissonArrivals::from_mean_interarrival(self.mean_interarrival)
            .map_err(|e| invalid("mean_interarrival", e))?;
        Chance::new(self.ward_a_probability).map_err(|e| invalid("ward_a_probability", e))?;
        WeightedChoice::new(vec![1, 2, 3, 4], &self.type_weights)
            .map_err(|e| invalid("type_weights", e))?;

        let caps = &self.capacities;
        for (field, value) in [
            ("capacities.registration", caps.registration),
            ("capacities.ward_a", caps.ward_a),
            ("capacities.ward_b", caps.ward_b),
            ("capacities.x_ray", caps.x_ray),
            ("capacities.plaster", caps.plaster),
        ] {
            validate_positive(field, value)?;
        }

        let times = &self.service_times;
        for (field, params) in [
            ("service_times.registration", times.registration),
            ("service_times.ward_a", times.ward_a),
            ("service_times.ward_b", times.ward_b),
            ("service_times.x_ray", times.x_ray),
            ("service_times.plaster", times.plaster),
        ] {
            Triangular::try_from(params).map_err(|e| invalid(field, e))?;
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_positive<T: PartialOrd + Default + std::fmt::Display>(
    field: &str,
    value: T,
) -> Result<(), ConfigError> {
    if value > T::default() {
        Ok(())
    } else {
        Err(ConfigError::ConstraintViolation {
            field: field.to_string(),
            constraint: "positive".to_string(),
        })
    }
}

fn validate_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ConstraintViolation {
            field: field.to_string(),
            constraint: "finite and non-negative".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EdConfig::default();
        config.validate().unwrap();
        assert_eq!(config.patients, 250);
        assert_eq!(config.capacities.ward_b, 2);
        assert_eq!(config.service_times.ward_b, tri(2.8, 4.1, 6.3));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EdConfig =
            serde_json::from_str(r#"{ "patients": 10, "capacities": { "x_ray": 3 } }"#).unwrap();
        assert_eq!(config.patients, 10);
        assert_eq!(config.capacities.x_ray, 3);
        assert_eq!(config.capacities.plaster, 1);
        assert_eq!(config.type_weights, [35.0, 20.0, 5.0, 40.0]);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_rejects_bad_triangle() {
        let mut config = EdConfig::default();
        config.service_times.plaster = tri(3.0, 5.0, 4.7);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service_times.plaster"));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = EdConfig::default();
        config.capacities.registration = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConstraintViolation { field, .. }) if field == "capacities.registration"
        ));
    }

    #[test]
    fn test_rejects_bad_weights_and_probability() {
        let mut config = EdConfig::default();
        config.type_weights = [0.0; 4];
        assert!(config.validate().is_err());

        let mut config = EdConfig::default();
        config.ward_a_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = EdConfig::default();
        config.mean_interarrival = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = EdConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
