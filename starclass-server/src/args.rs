//! Command line arguments shared by the binaries.

use anyhow::{Context, Result};
use clap::Args;
use starclass::artifacts::{ArtifactPaths, Artifacts};
use starclass::encoding::OovPolicy;
use starclass::pipeline::PredictionPipeline;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Where the pre-trained artifacts live and how unknown categories are handled.
#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    #[arg(
        long,
        default_value = ".",
        help = "Directory holding the classifier, scaler and encoder artifacts"
    )]
    pub artifact_dir: PathBuf,

    #[arg(long, help = "Classifier artifact path (overrides --artifact-dir)")]
    pub classifier: Option<PathBuf>,

    #[arg(long, help = "Scaler artifact path (overrides --artifact-dir)")]
    pub scaler: Option<PathBuf>,

    #[arg(long, help = "Color encoder artifact path (overrides --artifact-dir)")]
    pub color_encoder: Option<PathBuf>,

    #[arg(long, help = "Spectral class encoder artifact path (overrides --artifact-dir)")]
    pub spectral_encoder: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = OovPolicy::Fallback,
        help = "Unknown color or spectral class handling: 'fallback' substitutes the first known category, 'reject' fails the record"
    )]
    pub oov_policy: OovPolicy,
}

impl ArtifactArgs {
    /// Resolve the four artifact paths, applying per-file overrides.
    pub fn paths(&self) -> ArtifactPaths {
        let defaults = ArtifactPaths::in_dir(&self.artifact_dir);
        ArtifactPaths {
            classifier: self.classifier.clone().unwrap_or(defaults.classifier),
            scaler: self.scaler.clone().unwrap_or(defaults.scaler),
            color_encoder: self.color_encoder.clone().unwrap_or(defaults.color_encoder),
            spectral_encoder: self
                .spectral_encoder
                .clone()
                .unwrap_or(defaults.spectral_encoder),
        }
    }

    /// Load the artifacts and build the pipeline. Any failure here is fatal.
    pub fn load_pipeline(&self) -> Result<PredictionPipeline> {
        let paths = self.paths();
        let artifacts = Artifacts::load(&paths).with_context(|| {
            format!(
                "Failed to load prediction artifacts from {}",
                self.artifact_dir.display()
            )
        })?;
        info!(
            "Loaded {} (unknown categories: {})",
            artifacts.classifier().describe(),
            self.oov_policy
        );
        Ok(PredictionPipeline::new(Arc::new(artifacts), self.oov_policy))
    }
}

/// HTTP listener configuration.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(long, default_value = "0.0.0.0", help = "Address to bind")]
    pub bind_address: IpAddr,

    #[arg(short, long, default_value = "8080", help = "Port to listen on")]
    pub port: u16,

    #[arg(
        long,
        default_value = "16777216",
        help = "Maximum accepted request body in bytes (batch uploads)"
    )]
    pub max_upload_bytes: usize,
}

impl ServerArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use starclass::artifacts::{CLASSIFIER_FILE, SCALER_FILE};

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        #[command(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.artifacts.oov_policy, OovPolicy::Fallback);
        assert_eq!(cli.artifacts.paths(), ArtifactPaths::in_dir("."));
        assert_eq!(cli.server.socket_addr().port(), 8080);
    }

    #[test]
    fn test_per_file_override() {
        let cli = TestCli::parse_from([
            "test",
            "--artifact-dir",
            "/models",
            "--scaler",
            "/elsewhere/std.json",
            "--oov-policy",
            "reject",
        ]);
        let paths = cli.artifacts.paths();
        assert_eq!(paths.classifier, PathBuf::from("/models").join(CLASSIFIER_FILE));
        assert_eq!(paths.scaler, PathBuf::from("/elsewhere/std.json"));
        assert_ne!(paths.scaler, PathBuf::from("/models").join(SCALER_FILE));
        assert_eq!(cli.artifacts.oov_policy, OovPolicy::Reject);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = TestCli::try_parse_from(["test", "--oov-policy", "guess"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_artifacts_fail_to_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = TestCli::parse_from(["test", "--artifact-dir", dir.path().to_str().unwrap()]);
        let err = cli.artifacts.load_pipeline().unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }
}
