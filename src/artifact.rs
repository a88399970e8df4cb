//! Model artifact bundle and its on-disk layout.
//!
//! An artifact is written as three JSON files that must agree with each
//! other: the classifier with its metadata, the fitted scaler and the fitted
//! label encoders. Every file repeats the artifact id and feature schema so
//! a mixed or half-written bundle is detected on load.

use crate::error::{FraudError, Result};
use crate::features::schema::FEATURE_SCHEMA_VERSION;
use crate::features::{EncoderState, FeatureSchema, FeatureTransform, ScalerState};
use crate::model::RandomForest;
use crate::training::TrainingReport;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MODEL_FILE: &str = "fraud_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const REPORT_FILE: &str = "training_report.json";

const REQUIRED_FILES: [&str; 3] = [MODEL_FILE, SCALER_FILE, ENCODERS_FILE];

/// Identity and provenance of a trained artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub artifact_id: Uuid,
    pub schema: FeatureSchema,
    pub trained_at: DateTime<Utc>,
    /// Held-out AUC-ROC at training time
    pub auc_roc: f64,
    pub n_train_rows: usize,
}

/// Immutable bundle of everything needed to score a feature row
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    metadata: ArtifactMetadata,
    transform: FeatureTransform,
    classifier: RandomForest,
}

#[derive(Serialize, Deserialize)]
struct ModelPart<M, C> {
    #[serde(flatten)]
    metadata: M,
    classifier: C,
}

#[derive(Serialize, Deserialize)]
struct ScalerPart<S> {
    artifact_id: Uuid,
    schema: FeatureSchema,
    scaler: S,
}

#[derive(Serialize, Deserialize)]
struct EncodersPart<E> {
    artifact_id: Uuid,
    schema: FeatureSchema,
    encoders: E,
}

/// Fields every part carries, read before the full parse
#[derive(Deserialize)]
struct PartHeader {
    artifact_id: Uuid,
    schema: SchemaHeader,
}

#[derive(Deserialize)]
struct SchemaHeader {
    version: u32,
}

impl ModelArtifact {
    /// Bundle a fitted transform and classifier under a fresh artifact id
    pub fn new(
        transform: FeatureTransform,
        classifier: RandomForest,
        auc_roc: f64,
        n_train_rows: usize,
    ) -> Result<Self> {
        if classifier.n_features() != transform.schema().len() {
            return Err(FraudError::SchemaMismatch(format!(
                "classifier expects {} features, schema has {}",
                classifier.n_features(),
                transform.schema().len()
            )));
        }

        Ok(Self {
            metadata: ArtifactMetadata {
                artifact_id: Uuid::new_v4(),
                schema: transform.schema().clone(),
                trained_at: Utc::now(),
                auc_roc,
                n_train_rows,
            },
            transform,
            classifier,
        })
    }

    pub fn id(&self) -> Uuid {
        self.metadata.artifact_id
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.metadata.schema
    }

    pub fn transform(&self) -> &FeatureTransform {
        &self.transform
    }

    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    /// Whether `dir` holds anything that looks like an artifact
    pub fn exists<P: AsRef<Path>>(dir: P) -> bool {
        let dir = dir.as_ref();
        REQUIRED_FILES.iter().any(|f| dir.join(f).is_file())
    }

    /// Persist the bundle into `dir`.
    ///
    /// Files are written to a staging directory beside `dir` which then
    /// replaces `dir`. If anything fails the previous contents of `dir` stay
    /// in place.
    pub fn save<P: AsRef<Path>>(&self, dir: P, report: Option<&TrainingReport>) -> Result<()> {
        let dir = dir.as_ref();
        let parent = match dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "models".to_string());
        let staging = parent.join(format!(".{name}.staging-{}", self.id()));
        let backup = parent.join(format!(".{name}.previous-{}", self.id()));

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        if let Err(e) = self.write_parts(&staging, report) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        swap_into_place(&staging, dir, &backup)?;

        info!(
            artifact_id = %self.id(),
            dir = %dir.display(),
            "Model artifact saved"
        );
        Ok(())
    }

    fn write_parts(&self, dir: &Path, report: Option<&TrainingReport>) -> Result<()> {
        write_json(
            &dir.join(MODEL_FILE),
            &ModelPart {
                metadata: &self.metadata,
                classifier: &self.classifier,
            },
        )?;
        write_json(
            &dir.join(SCALER_FILE),
            &ScalerPart {
                artifact_id: self.id(),
                schema: self.schema().clone(),
                scaler: self.transform.scaler(),
            },
        )?;
        write_json(
            &dir.join(ENCODERS_FILE),
            &EncodersPart {
                artifact_id: self.id(),
                schema: self.schema().clone(),
                encoders: self.transform.encoders(),
            },
        )?;
        if let Some(report) = report {
            write_json(&dir.join(REPORT_FILE), report)?;
        }
        Ok(())
    }

    /// Load and cross-check the bundle in `dir`.
    ///
    /// No files at all is `ArtifactNotFound`; a partial or mismatched set is
    /// `ArtifactCorrupt`; a bundle from another feature schema version is
    /// `SchemaMismatch`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let missing: Vec<&str> = REQUIRED_FILES
            .iter()
            .copied()
            .filter(|f| !dir.join(f).is_file())
            .collect();
        if missing.len() == REQUIRED_FILES.len() {
            return Err(FraudError::ArtifactNotFound {
                path: dir.to_path_buf(),
            });
        }
        if !missing.is_empty() {
            return Err(corrupt(dir, format!("missing {}", missing.join(", "))));
        }

        let (model_id, model): (Uuid, ModelPart<ArtifactMetadata, RandomForest>) =
            read_part(dir, MODEL_FILE)?;
        let (scaler_id, scaler): (Uuid, ScalerPart<ScalerState>) = read_part(dir, SCALER_FILE)?;
        let (encoders_id, encoders): (Uuid, EncodersPart<EncoderState>) =
            read_part(dir, ENCODERS_FILE)?;

        if scaler_id != model_id || encoders_id != model_id {
            return Err(corrupt(
                dir,
                format!(
                    "artifact ids disagree: {MODEL_FILE}={model_id}, \
                     {SCALER_FILE}={scaler_id}, {ENCODERS_FILE}={encoders_id}"
                ),
            ));
        }
        let schema = model.metadata.schema.clone();
        if scaler.schema != schema || encoders.schema != schema {
            return Err(corrupt(dir, "feature schemas disagree between files".to_string()));
        }

        let transform = FeatureTransform::from_parts(schema, encoders.encoders, scaler.scaler)
            .map_err(|e| corrupt(dir, e.to_string()))?;
        let classifier = model.classifier;
        classifier.validate().map_err(|reason| corrupt(dir, reason))?;
        if classifier.n_features() != transform.schema().len() {
            return Err(corrupt(
                dir,
                format!(
                    "classifier expects {} features, schema has {}",
                    classifier.n_features(),
                    transform.schema().len()
                ),
            ));
        }

        debug!(
            artifact_id = %model_id,
            trees = classifier.n_trees(),
            "Model artifact loaded"
        );

        Ok(Self {
            metadata: model.metadata,
            transform,
            classifier,
        })
    }

    /// Read the training report saved next to the artifact, if any
    pub fn load_report<P: AsRef<Path>>(dir: P) -> Result<Option<TrainingReport>> {
        let path = dir.as_ref().join(REPORT_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Parse one part, checking the schema version before the full parse
fn read_part<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<(Uuid, T)> {
    let text = fs::read_to_string(dir.join(file))?;

    let header: PartHeader =
        serde_json::from_str(&text).map_err(|e| corrupt(dir, format!("{file}: {e}")))?;
    if header.schema.version != FEATURE_SCHEMA_VERSION {
        return Err(FraudError::SchemaMismatch(format!(
            "{file} was written for feature schema v{}, current is v{}",
            header.schema.version, FEATURE_SCHEMA_VERSION
        )));
    }

    let part = serde_json::from_str(&text).map_err(|e| corrupt(dir, format!("{file}: {e}")))?;
    Ok((header.artifact_id, part))
}

fn corrupt(dir: &Path, reason: String) -> FraudError {
    FraudError::ArtifactCorrupt {
        path: dir.to_path_buf(),
        reason,
    }
}

/// Move `staging` to `dir`, parking the current `dir` at `backup` meanwhile.
///
/// On failure the staging directory is removed and `dir` keeps its previous
/// contents. Once the new bundle is in place a leftover backup is only
/// logged.
fn swap_into_place(staging: &Path, dir: &Path, backup: &Path) -> Result<()> {
    let had_previous = dir.exists();
    if had_previous {
        if let Err(e) = fs::rename(dir, backup) {
            let _ = fs::remove_dir_all(staging);
            return Err(e.into());
        }
    }
    if let Err(e) = fs::rename(staging, dir) {
        if had_previous {
            let _ = fs::rename(backup, dir);
        }
        let _ = fs::remove_dir_all(staging);
        return Err(e.into());
    }
    if had_previous {
        if let Err(e) = fs::remove_dir_all(backup) {
            warn!(
                backup = %backup.display(),
                error = %e,
                "Previous artifact could not be removed"
            );
        }
    }
    Ok(())
}
