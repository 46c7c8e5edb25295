//! Outer surfaces of the star type predictor: an HTTP service and a command
//! line front end, both driving [`starclass::PredictionPipeline`].

pub mod args;
pub mod server;

pub use args::{ArtifactArgs, ServerArgs};
pub use server::{build_router, run_server, AppState};
