//! The prediction pipeline.
//!
//! Turns validated [`StarRecord`]s into [`StarType`]s using a shared, read-only
//! [`Artifacts`] set. The steps always run in this order:
//!
//! 1. Normalize categories (trim; color capitalized, spectral class upper case)
//! 2. Resolve out-of-vocabulary categories per the [`OovPolicy`]
//! 3. Encode categories to their integer codes
//! 4. Scale the four numeric fields
//! 5. Assemble `[T, L, R, A_M, color_code, spectral_code]`
//! 6. Run the classifier
//! 7. Map the class index to a [`StarType`]
//!
//! The pipeline holds no mutable state, so one instance can serve any number
//! of concurrent callers.

use crate::artifacts::Artifacts;
use crate::classifier::{Classifier, FeatureVector};
use crate::encoding::{Encoded, EncodingTable, OovPolicy};
use crate::error::PredictionError;
use crate::record::{normalize_color, normalize_spectral_class, Field, StarRecord};
use crate::star_type::StarType;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A categorical value replaced by the encoder's default category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFallback {
    pub field: Field,
    /// Value after normalization
    pub observed: String,
    /// Category whose code was used instead
    pub substituted: String,
}

/// Feature vector for one record plus any fallbacks applied while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFeatures {
    pub features: FeatureVector,
    pub fallbacks: Vec<CategoryFallback>,
}

/// Successful prediction for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub star_type: StarType,
    /// Non-empty when the prediction used a substituted category
    pub fallbacks: Vec<CategoryFallback>,
}

impl Prediction {
    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Prediction pipeline over a shared artifact set.
///
/// Cloning is cheap; clones share the same artifacts.
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    artifacts: Arc<Artifacts>,
    policy: OovPolicy,
}

impl PredictionPipeline {
    pub fn new(artifacts: Arc<Artifacts>, policy: OovPolicy) -> Self {
        Self { artifacts, policy }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn policy(&self) -> OovPolicy {
        self.policy
    }

    /// Steps 1-5: validate, normalize, encode, scale and assemble.
    pub fn features(&self, record: &StarRecord) -> Result<PreparedFeatures, PredictionError> {
        record.validate()?;

        let mut fallbacks = Vec::new();
        let color_code = self.encode(
            Field::Color,
            self.artifacts.color_encoder(),
            normalize_color(&record.color),
            &mut fallbacks,
        )?;
        let spectral_code = self.encode(
            Field::SpectralClass,
            self.artifacts.spectral_encoder(),
            normalize_spectral_class(&record.spectral_class),
            &mut fallbacks,
        )?;

        let [temperature, luminosity, radius, absolute_magnitude] =
            self.artifacts.scaler().transform(record.numeric());

        Ok(PreparedFeatures {
            features: [
                temperature,
                luminosity,
                radius,
                absolute_magnitude,
                color_code as f64,
                spectral_code as f64,
            ],
            fallbacks,
        })
    }

    fn encode(
        &self,
        field: Field,
        table: &EncodingTable,
        normalized: String,
        fallbacks: &mut Vec<CategoryFallback>,
    ) -> Result<usize, PredictionError> {
        match table.encode(&normalized, self.policy) {
            Some(Encoded::Known(code)) => Ok(code),
            Some(Encoded::Fallback { code, substituted }) => {
                debug!(
                    "Unknown {} {:?}, substituting {:?}",
                    field, normalized, substituted
                );
                fallbacks.push(CategoryFallback {
                    field,
                    observed: normalized,
                    substituted,
                });
                Ok(code)
            }
            None => Err(PredictionError::UnknownCategory {
                field,
                value: normalized,
            }),
        }
    }

    /// Steps 6-7 on an assembled feature vector.
    fn classify(&self, features: &FeatureVector) -> Result<StarType, PredictionError> {
        let code = self.artifacts.classifier().predict(features);
        StarType::from_code(code).ok_or(PredictionError::UnmappedLabel(code))
    }

    /// Predict the star type of one record.
    pub fn predict_one(&self, record: &StarRecord) -> Result<Prediction, PredictionError> {
        let prepared = self.features(record)?;
        let star_type = self.classify(&prepared.features)?;
        Ok(Prediction {
            star_type,
            fallbacks: prepared.fallbacks,
        })
    }

    /// Predict every record independently.
    ///
    /// The output has one entry per input record, in input order; a failing
    /// record never affects the others.
    pub fn predict(&self, records: &[StarRecord]) -> Vec<Result<Prediction, PredictionError>> {
        records.iter().map(|r| self.predict_one(r)).collect()
    }
}
