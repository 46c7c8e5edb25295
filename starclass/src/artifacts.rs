//! Loading and saving the four pre-trained artifacts.
//!
//! All artifacts are JSON files, by default side by side in one directory:
//!
//! ```text
//! artifacts/
//! ├── star_classifier_model.json   # ClassifierModel
//! ├── scaler.json                  # ScalingParameters
//! ├── color_encoder.json           # EncodingTable
//! └── spectral_encoder.json        # EncodingTable
//! ```
//!
//! Any failure here is a startup failure: the caller must not serve requests
//! without a complete, validated [`Artifacts`] set.

use crate::classifier::{Classifier, ClassifierError, ClassifierModel};
use crate::encoding::EncodingTable;
use crate::record::{normalize_color, normalize_spectral_class};
use crate::scaling::ScalingParameters;
use crate::star_type::STAR_TYPE_COUNT;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CLASSIFIER_FILE: &str = "star_classifier_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const COLOR_ENCODER_FILE: &str = "color_encoder.json";
pub const SPECTRAL_ENCODER_FILE: &str = "spectral_encoder.json";

/// Which artifact an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    ColorEncoder,
    SpectralEncoder,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::ColorEncoder => "color encoder",
            ArtifactKind::SpectralEncoder => "spectral class encoder",
        })
    }
}

/// Fatal problems loading or saving an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {}", path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to access {kind} artifact at {}: {source}", path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {kind} artifact at {}: {source}", path.display())]
    Parse {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} artifact at {}: {source}", path.display())]
    Invalid {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: ClassifierError,
    },
}

/// Locations of the four artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub color_encoder: PathBuf,
    pub spectral_encoder: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            classifier: dir.join(CLASSIFIER_FILE),
            scaler: dir.join(SCALER_FILE),
            color_encoder: dir.join(COLOR_ENCODER_FILE),
            spectral_encoder: dir.join(SPECTRAL_ENCODER_FILE),
        }
    }
}

/// The complete, validated artifact set. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    classifier: ClassifierModel,
    scaler: ScalingParameters,
    color_encoder: EncodingTable,
    spectral_encoder: EncodingTable,
}

impl Artifacts {
    /// Assemble an artifact set from in-memory parts, validating the classifier.
    pub fn new(
        classifier: ClassifierModel,
        scaler: ScalingParameters,
        color_encoder: EncodingTable,
        spectral_encoder: EncodingTable,
    ) -> Result<Self, ClassifierError> {
        classifier.validate()?;
        if classifier.num_classes() != STAR_TYPE_COUNT {
            return Err(ClassifierError::ClassCount {
                expected: STAR_TYPE_COUNT,
                found: classifier.num_classes(),
            });
        }
        Ok(Self {
            classifier,
            scaler,
            color_encoder,
            spectral_encoder,
        })
    }

    /// Load and validate all four artifacts.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let classifier: ClassifierModel =
            load_json(ArtifactKind::Classifier, &paths.classifier)?;
        let scaler: ScalingParameters = load_json(ArtifactKind::Scaler, &paths.scaler)?;
        let color_encoder: EncodingTable =
            load_json(ArtifactKind::ColorEncoder, &paths.color_encoder)?;
        let spectral_encoder: EncodingTable =
            load_json(ArtifactKind::SpectralEncoder, &paths.spectral_encoder)?;

        let artifacts = Self::new(classifier, scaler, color_encoder, spectral_encoder).map_err(
            |source| ArtifactError::Invalid {
                kind: ArtifactKind::Classifier,
                path: paths.classifier.clone(),
                source,
            },
        )?;

        info!("Loaded classifier: {}", artifacts.classifier.describe());
        info!(
            "Loaded vocabularies: {} colors, {} spectral classes",
            artifacts.color_encoder.len(),
            artifacts.spectral_encoder.len()
        );
        artifacts.warn_unreachable_classes();

        Ok(artifacts)
    }

    /// Write all four artifacts, creating parent directories as needed.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        save_json(ArtifactKind::Classifier, &paths.classifier, &self.classifier)?;
        save_json(ArtifactKind::Scaler, &paths.scaler, &self.scaler)?;
        save_json(
            ArtifactKind::ColorEncoder,
            &paths.color_encoder,
            &self.color_encoder,
        )?;
        save_json(
            ArtifactKind::SpectralEncoder,
            &paths.spectral_encoder,
            &self.spectral_encoder,
        )
    }

    pub fn classifier(&self) -> &ClassifierModel {
        &self.classifier
    }

    pub fn scaler(&self) -> &ScalingParameters {
        &self.scaler
    }

    pub fn color_encoder(&self) -> &EncodingTable {
        &self.color_encoder
    }

    pub fn spectral_encoder(&self) -> &EncodingTable {
        &self.spectral_encoder
    }

    /// Vocabulary entries that normalized input can never match.
    fn warn_unreachable_classes(&self) {
        for class in self.color_encoder.unreachable_classes(normalize_color) {
            warn!(
                "Color class {:?} is not in normalized form and will never match input",
                class
            );
        }
        for class in self
            .spectral_encoder
            .unreachable_classes(normalize_spectral_class)
        {
            warn!(
                "Spectral class {:?} is not in normalized form and will never match input",
                class
            );
        }
    }
}

fn load_json<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }

    let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&json).map_err(|source| ArtifactError::Parse {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn save_json<T: Serialize>(kind: ArtifactKind, path: &Path, value: &T) -> Result<(), ArtifactError> {
    let io_error = |source| ArtifactError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    // Serializing these types cannot fail: no maps with non-string keys
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Parse {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_error)
}
