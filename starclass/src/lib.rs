//! Star type classification from physical measurements.
//!
//! Given a star's temperature, luminosity, radius, absolute magnitude, color
//! and spectral class, predict which of six star types it is, using a frozen
//! classifier together with the scaler and categorical encoders it was
//! trained with.
//!
//! # Overview
//!
//! - [`artifacts`]: load the four pre-trained artifacts once at startup
//! - [`pipeline`]: normalize, encode, scale, classify and label one record
//! - [`batch`]: run the pipeline over a CSV table in one pass
//! - [`star_type`]: the authoritative code-to-name mapping
//!
//! # Example
//!
//! ```rust
//! use starclass::encoding::OovPolicy;
//! use starclass::record::StarRecord;
//! use starclass::star_type::StarType;
//! use starclass::test_util::reference_pipeline;
//!
//! let pipeline = reference_pipeline(OovPolicy::Fallback).unwrap();
//! let prediction = pipeline.predict_one(&StarRecord::sun()).unwrap();
//! assert_eq!(prediction.star_type, StarType::MainSequence);
//! ```

pub mod artifacts;
pub mod batch;
pub mod classifier;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod scaling;
pub mod star_type;
pub mod test_util;

pub use artifacts::{ArtifactError, ArtifactPaths, Artifacts};
pub use batch::{run_batch, BatchReport};
pub use encoding::OovPolicy;
pub use error::{BatchError, MalformedRecord, PredictionError, SchemaMismatch};
pub use pipeline::{Prediction, PredictionPipeline};
pub use record::{RawStarRecord, StarRecord};
pub use star_type::StarType;
