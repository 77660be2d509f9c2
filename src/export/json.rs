//! JSON run report for the external reporter

use crate::cleaning::CleaningReport;
use crate::error::{HitlabError, Result};
use crate::evaluation::auc_mann_whitney;
use crate::model::{CvOutcome, FoldScore, ForestParams, GridScore};
use crate::pipeline::{Analysis, ModelOutcome};
use crate::scaling::FeatureStats;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize)]
pub struct HitlabJson {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ExportMetadata,
    pub dataset: DatasetJson,
    pub models: Vec<ModelJson>,
}

/// Export metadata
#[derive(Debug, Serialize)]
pub struct ExportMetadata {
    /// hitlab version that generated this file
    pub generator_version: String,
    pub exported_at: String,
    pub input: String,
    pub seed: u64,
    pub folds: usize,
}

#[derive(Debug, Serialize)]
pub struct DatasetJson {
    pub cleaning: CleaningReport,
    /// Population statistics used for scaling
    pub scaling: Vec<FeatureStats>,
    /// Constant features, scaled to 0.0
    pub degenerate_features: Vec<String>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ModelJson {
    pub name: String,
    /// "trained" or "failed"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Trapezoidal AUC of the out-of-fold curve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auc: Option<f64>,
    /// Rank-based AUC over the same predictions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auc_rank: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_fold_auc: Option<f64>,
    pub folds: Vec<FoldScore>,
    pub degenerate_folds: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<ForestParams>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grid: Vec<GridScore>,
}

impl ModelJson {
    fn failed(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "failed".to_string(),
            failure: Some(reason.to_string()),
            auc: None,
            auc_rank: None,
            mean_fold_auc: None,
            folds: Vec::new(),
            degenerate_folds: Vec::new(),
            selected: None,
            grid: Vec::new(),
        }
    }
}

fn model_json<T>(
    name: &str,
    outcome: &ModelOutcome<T>,
    labels: &[bool],
    cv: impl Fn(&T) -> &CvOutcome,
) -> ModelJson {
    match outcome {
        ModelOutcome::Failed { reason } => ModelJson::failed(name, reason),
        ModelOutcome::Trained { report, roc } => {
            let cv = cv(report);
            ModelJson {
                name: name.to_string(),
                status: "trained".to_string(),
                failure: None,
                auc: Some(roc.auc),
                auc_rank: auc_mann_whitney(labels, &cv.predictions).ok(),
                mean_fold_auc: cv.mean_auc,
                folds: cv.folds.clone(),
                degenerate_folds: cv.degenerate_folds(),
                selected: None,
                grid: Vec::new(),
            }
        }
    }
}

/// Build the report document for `analysis`
pub fn build_report(analysis: &Analysis, input: &Path, seed: u64, folds: usize) -> HitlabJson {
    let data = &analysis.data;
    let labels = data.dataset.labels();

    let logistic = model_json("logistic", &analysis.logistic, labels, |r| &r.cv);
    let mut forest = model_json("random_forest", &analysis.forest, labels, |r| &r.cv);
    if let Some(report) = analysis.forest.report() {
        forest.selected = Some(report.params);
        forest.grid = report.grid.clone();
    }

    HitlabJson {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            input: input.display().to_string(),
            seed,
            folds,
        },
        dataset: DatasetJson {
            cleaning: data.cleaning.clone(),
            scaling: data.scaler.stats().to_vec(),
            degenerate_features: data
                .scaler
                .degenerate()
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            first_year: data.years.first().map(|y| y.year),
            last_year: data.years.last().map(|y| y.year),
        },
        models: vec![logistic, forest],
    }
}

/// Write the report to a JSON file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_report(report: &HitlabJson, output_path: &Path) -> Result<()> {
    // Same directory keeps the rename on one filesystem
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| HitlabError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        HitlabError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        HitlabError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote report for {} models to {}", report.models.len(), output_path.display());

    Ok(())
}
