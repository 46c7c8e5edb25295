//! Affine scaling of the numeric features.
//!
//! Applies the fit-time standardization to the four numeric fields:
//! ```text
//! scaled[i] = (raw[i] - center[i]) / scale[i]
//! ```

use serde::{Deserialize, Serialize};

/// Number of numeric features: temperature, luminosity, radius, absolute magnitude.
pub const NUMERIC_FEATURES: usize = 4;

/// Errors building scaling parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalingError {
    #[error("center[{index}] is not finite: {value}")]
    NonFiniteCenter { index: usize, value: f64 },
    #[error("scale[{index}] must be finite and non-zero, got {value}")]
    InvalidScale { index: usize, value: f64 },
}

/// On-disk layout; `mean` is accepted for scalers exported as mean/std.
#[derive(Serialize, Deserialize)]
struct ScalingFile {
    #[serde(alias = "mean")]
    center: [f64; NUMERIC_FEATURES],
    scale: [f64; NUMERIC_FEATURES],
}

/// Per-feature center and scale, fixed at artifact load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalingFile", into = "ScalingFile")]
pub struct ScalingParameters {
    center: [f64; NUMERIC_FEATURES],
    scale: [f64; NUMERIC_FEATURES],
}

impl ScalingParameters {
    pub fn new(
        center: [f64; NUMERIC_FEATURES],
        scale: [f64; NUMERIC_FEATURES],
    ) -> Result<Self, ScalingError> {
        for (index, &value) in center.iter().enumerate() {
            if !value.is_finite() {
                return Err(ScalingError::NonFiniteCenter { index, value });
            }
        }
        for (index, &value) in scale.iter().enumerate() {
            if !value.is_finite() || value == 0.0 {
                return Err(ScalingError::InvalidScale { index, value });
            }
        }
        Ok(Self { center, scale })
    }

    pub fn center(&self) -> &[f64; NUMERIC_FEATURES] {
        &self.center
    }

    pub fn scale(&self) -> &[f64; NUMERIC_FEATURES] {
        &self.scale
    }

    /// Scale a single feature value.
    pub fn transform_feature(&self, index: usize, value: f64) -> f64 {
        (value - self.center[index]) / self.scale[index]
    }

    /// Scale all four numeric features.
    pub fn transform(&self, values: [f64; NUMERIC_FEATURES]) -> [f64; NUMERIC_FEATURES] {
        std::array::from_fn(|i| self.transform_feature(i, values[i]))
    }
}

impl TryFrom<ScalingFile> for ScalingParameters {
    type Error = ScalingError;

    fn try_from(file: ScalingFile) -> Result<Self, Self::Error> {
        Self::new(file.center, file.scale)
    }
}

impl From<ScalingParameters> for ScalingFile {
    fn from(params: ScalingParameters) -> Self {
        Self {
            center: params.center,
            scale: params.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform() {
        let params =
            ScalingParameters::new([10000.0, 100.0, 200.0, 4.0], [5000.0, 50.0, 100.0, 2.0])
                .unwrap();
        let scaled = params.transform([15000.0, 0.0, 200.0, -2.0]);
        assert_relative_eq!(scaled[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[1], -2.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[3], -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_matches_per_feature() {
        let params =
            ScalingParameters::new([10497.5, 107188.4, 237.2, 4.38], [9532.5, 179058.6, 516.6, 10.5])
                .unwrap();
        let raw = [5778.0, 1.0, 1.0, 4.83];
        let scaled = params.transform(raw);
        for i in 0..NUMERIC_FEATURES {
            assert_relative_eq!(scaled[i], params.transform_feature(i, raw[i]), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_unit_parameters_leave_values_unchanged() {
        let params = ScalingParameters::new([0.0; 4], [1.0; 4]).unwrap();
        assert_eq!(params.transform([1.0, 2.0, 3.0, -4.0]), [1.0, 2.0, 3.0, -4.0]);
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        assert_eq!(
            ScalingParameters::new([0.0; 4], [1.0, 0.0, 1.0, 1.0]),
            Err(ScalingError::InvalidScale {
                index: 1,
                value: 0.0
            })
        );
        assert!(matches!(
            ScalingParameters::new([0.0, 0.0, f64::NAN, 0.0], [1.0; 4]),
            Err(ScalingError::NonFiniteCenter { index: 2, .. })
        ));
        assert!(ScalingParameters::new([0.0; 4], [1.0, 1.0, 1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_json_accepts_mean_alias() {
        let params: ScalingParameters =
            serde_json::from_str(r#"{"mean": [1, 2, 3, 4], "scale": [1, 1, 1, 2]}"#).unwrap();
        assert_eq!(params.center(), &[1.0, 2.0, 3.0, 4.0]);

        let zero_scale: Result<ScalingParameters, _> =
            serde_json::from_str(r#"{"center": [0, 0, 0, 0], "scale": [1, 1, 0, 1]}"#);
        assert!(zero_scale.is_err());
    }
}
