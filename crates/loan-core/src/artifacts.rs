use crate::classifier::ProbabilityModel;
use crate::error::LoanError;
use crate::model::{ModelArchitecture, StackingClassifier};
use crate::scaler::{FeatureScaler, StandardScaler};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Locations of the exported model and scaler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("models/stack_model.json", "models/scaler.json")
    }
}

/// Read-only model and scaler handles, loaded once per process.
#[derive(Clone)]
pub struct LoadedArtifacts {
    pub model: Arc<dyn ProbabilityModel>,
    pub scaler: Arc<dyn FeatureScaler>,
    pub model_fingerprint: String,
    pub scaler_fingerprint: String,
    pub architecture: ModelArchitecture,
}

impl fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("model_fingerprint", &self.model_fingerprint)
            .field("scaler_fingerprint", &self.scaler_fingerprint)
            .field("architecture", &self.architecture)
            .finish()
    }
}

impl LoadedArtifacts {
    /// Loads and validates both artifacts. Any failure is a configuration error.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, LoanError> {
        let (model, model_fingerprint) = read_artifact::<StackingClassifier>(&paths.model)?;
        model.validate().map_err(|err| context(&paths.model, err))?;

        let (scaler, scaler_fingerprint) = read_artifact::<StandardScaler>(&paths.scaler)?;
        scaler.validate().map_err(|err| context(&paths.scaler, err))?;

        info!(
            model = %paths.model.display(),
            model_fingerprint = %model_fingerprint,
            scaler = %paths.scaler.display(),
            scaler_fingerprint = %scaler_fingerprint,
            "loaded decision artifacts"
        );

        Self::from_parts(model, scaler, model_fingerprint, scaler_fingerprint)
    }

    /// Wraps already-parsed artifacts. Both are validated here as well, so
    /// handles built without [`LoadedArtifacts::load`] are held to the same checks.
    pub fn from_parts(
        model: StackingClassifier,
        scaler: StandardScaler,
        model_fingerprint: impl Into<String>,
        scaler_fingerprint: impl Into<String>,
    ) -> Result<Self, LoanError> {
        model.validate()?;
        scaler.validate()?;
        let architecture = model.architecture();
        Ok(Self {
            model: Arc::new(model),
            scaler: Arc::new(scaler),
            model_fingerprint: model_fingerprint.into(),
            scaler_fingerprint: scaler_fingerprint.into(),
            architecture,
        })
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<(T, String), LoanError> {
    let bytes = fs::read(path).map_err(|err| {
        LoanError::Configuration(format!(
            "failed to read artifact '{}': {}",
            path.display(),
            err
        ))
    })?;
    let fingerprint = blake3::hash(&bytes).to_hex().to_string();
    let value = serde_json::from_slice(&bytes).map_err(|err| {
        LoanError::Configuration(format!(
            "failed to parse artifact '{}': {}",
            path.display(),
            err
        ))
    })?;
    Ok((value, fingerprint))
}

fn context(path: &Path, err: LoanError) -> LoanError {
    LoanError::Configuration(format!("artifact '{}' is invalid: {}", path.display(), err))
}
