//! Output tables and the JSON report
//!
//! Everything lands in one output directory, created if missing. Files for
//! a failed model are not written; its failure is recorded in `report.json`.

pub mod json;
pub mod tables;

pub use json::{build_report, write_report, HitlabJson};

use crate::config::Settings;
use crate::error::{HitlabError, Result};
use crate::pipeline::Analysis;
use tracing::info;

/// Write every output of `analysis` into `settings.output`
pub fn write_all(analysis: &Analysis, settings: &Settings) -> Result<()> {
    let dir = &settings.output;
    std::fs::create_dir_all(dir).map_err(|e| HitlabError::output_io(dir, e))?;

    let data = &analysis.data;
    tables::write_cleaned_songs(&dir.join("cleaned_songs.csv"), &data.songs)?;
    tables::write_yearly_summary(&dir.join("yearly_summary.csv"), &data.years)?;

    let mut predictions: Vec<(&str, &[f64])> = Vec::new();

    if let (Some(report), Some(roc)) = (analysis.logistic.report(), analysis.logistic.roc()) {
        predictions.push(("logistic", report.cv.predictions.as_slice()));
        tables::write_roc(&dir.join("roc_logistic.csv"), roc)?;
        tables::write_coefficients(
            &dir.join("logistic_coefficients.csv"),
            &report.model.coefficient_table(),
        )?;
    }

    if let (Some(report), Some(roc)) = (analysis.forest.report(), analysis.forest.roc()) {
        predictions.push(("random_forest", report.cv.predictions.as_slice()));
        tables::write_roc(&dir.join("roc_random_forest.csv"), roc)?;
        tables::write_importance(&dir.join("feature_importance.csv"), &report.importance)?;
    }

    tables::write_predictions(&dir.join("predictions.csv"), &data.songs, &predictions)?;

    let report = build_report(analysis, &settings.input, settings.seed, settings.folds);
    write_report(&report, &dir.join("report.json"))?;

    info!("Outputs written to {}", dir.display());
    Ok(())
}
