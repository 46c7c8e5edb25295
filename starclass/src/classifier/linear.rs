//! Multinomial linear classifier: one weight row and intercept per class,
//! prediction is the arg-max of `w_k · x + b_k`.

use super::{argmax, ClassifierError, FeatureVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    coefficients: Vec<FeatureVector>,
    intercepts: Vec<f64>,
}

impl LinearClassifier {
    pub fn new(coefficients: Vec<FeatureVector>, intercepts: Vec<f64>) -> Self {
        Self {
            coefficients,
            intercepts,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.coefficients.len()
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.coefficients.len() < 2 {
            return Err(ClassifierError::InvalidLinear(format!(
                "need at least 2 classes, got {}",
                self.coefficients.len()
            )));
        }
        if self.coefficients.len() != self.intercepts.len() {
            return Err(ClassifierError::InvalidLinear(format!(
                "{} coefficient rows but {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ClassifierError::InvalidLinear(
                "coefficients and intercepts must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Per-class decision scores.
    pub fn decision_function(&self, features: &FeatureVector) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    pub fn predict(&self, features: &FeatureVector) -> usize {
        argmax(&self.decision_function(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decision_function() {
        let model = LinearClassifier::new(
            vec![[1.0, 2.0, 0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0, 1.0, -1.0]],
            vec![0.5, -0.5],
        );
        model.validate().unwrap();

        let scores = model.decision_function(&[1.0, 1.0, 9.0, 9.0, 3.0, 1.0]);
        assert_relative_eq!(scores[0], 3.5, epsilon = 1e-12);
        assert_relative_eq!(scores[1], 1.5, epsilon = 1e-12);
        assert_eq!(model.predict(&[1.0, 1.0, 9.0, 9.0, 3.0, 1.0]), 0);
        assert_eq!(model.predict(&[-1.0, -1.0, 0.0, 0.0, 3.0, 0.0]), 1);
    }

    #[test]
    fn test_validate() {
        let one_class = LinearClassifier::new(vec![[0.0; 6]], vec![0.0]);
        assert!(one_class.validate().is_err());

        let mismatched = LinearClassifier::new(vec![[0.0; 6], [0.0; 6]], vec![0.0]);
        assert!(mismatched.validate().is_err());

        let nan = LinearClassifier::new(vec![[0.0; 6], [0.0; 6]], vec![0.0, f64::NAN]);
        assert!(nan.validate().is_err());
    }
}
