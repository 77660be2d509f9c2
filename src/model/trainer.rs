//! Model training entry points used by the pipeline
//!
//! Both models are cross-validated on the same `FoldPlan`. The forest is
//! additionally swept over a fixed grid; the configuration with the best
//! mean fold AUC is kept and refitted on every row for importance.

use crate::error::{HitlabError, Result};
use crate::model::{
    cross_validate, permutation_importance, CvOutcome, Dataset, FeatureImportance, FoldPlan,
    ForestParams, LogisticModel, LogisticRegression, RandomForest,
};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::info;

/// Cross-validated logistic baseline plus the full-data fit
#[derive(Debug, Clone)]
pub struct LogisticReport {
    pub cv: CvOutcome,
    /// Fit on every row, for the coefficient table
    pub model: LogisticModel,
}

/// Cross-validated score of one forest configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridScore {
    pub params: ForestParams,
    pub mean_auc: Option<f64>,
    pub degenerate_folds: usize,
}

/// Best forest configuration with its importance ranking
#[derive(Debug, Clone)]
pub struct ForestReport {
    pub params: ForestParams,
    /// Cross-validation outcome of `params`
    pub cv: CvOutcome,
    /// Every configuration tried, in sweep order
    pub grid: Vec<GridScore>,
    pub importance: Vec<FeatureImportance>,
}

/// Cross-validate the logistic baseline and fit it on all rows
pub fn train_logistic(data: &Dataset, plan: &FoldPlan, progress: Option<&ProgressBar>) -> Result<LogisticReport> {
    let classifier = LogisticRegression::default();
    let cv = cross_validate(&classifier, data, plan, progress)?;
    let all_rows: Vec<usize> = (0..data.len()).collect();
    let model = classifier.fit_rows(data, &all_rows)?;

    info!(
        "logistic: mean fold AUC {}",
        cv.mean_auc.map_or("undefined".to_string(), |a| format!("{:.4}", a))
    );
    Ok(LogisticReport { cv, model })
}

/// Sweep `grid`, keep the best configuration, refit it on all rows
pub fn train_forest(
    data: &Dataset,
    plan: &FoldPlan,
    grid: &[ForestParams],
    seed: u64,
    progress: Option<&ProgressBar>,
) -> Result<ForestReport> {
    if grid.is_empty() {
        return Err(HitlabError::ConfigError("random forest grid is empty".into()));
    }

    let mut scores = Vec::with_capacity(grid.len());
    let mut best: Option<(usize, f64, CvOutcome)> = None;

    for (i, &params) in grid.iter().enumerate() {
        let cv = cross_validate(&RandomForest::new(params, seed), data, plan, progress)?;
        info!(
            "random_forest ({}): mean fold AUC {}",
            params,
            cv.mean_auc.map_or("undefined".to_string(), |a| format!("{:.4}", a))
        );

        scores.push(GridScore {
            params,
            mean_auc: cv.mean_auc,
            degenerate_folds: cv.degenerate_folds().len(),
        });

        if let Some(auc) = cv.mean_auc {
            // Strictly better only: ties keep the earlier configuration
            if best.as_ref().map_or(true, |(_, b, _)| auc > *b) {
                best = Some((i, auc, cv));
            }
        }
    }

    let Some((best_idx, best_auc, cv)) = best else {
        return Err(HitlabError::InsufficientData {
            context: "random_forest".into(),
            reason: "no grid configuration produced a defined cross-validated AUC".into(),
        });
    };
    let params = grid[best_idx];
    info!("random_forest: selected {} (mean fold AUC {:.4})", params, best_auc);

    let all_rows: Vec<usize> = (0..data.len()).collect();
    let model = RandomForest::new(params, seed).fit_rows(data, &all_rows)?;
    let importance = permutation_importance(&model, data, seed);

    Ok(ForestReport {
        params,
        cv,
        grid: scores,
        importance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Dataset {
        let n = 80;
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / n as f64, ((i * 11) % 9) as f64 / 9.0])
            .collect();
        let labels = (0..n).map(|i| i % 10 < 3).collect::<Vec<_>>();
        let rows = rows
            .into_iter()
            .zip(labels.iter())
            .map(|(mut r, &hit)| {
                r[0] = if hit { r[0] * 0.5 } else { 0.3 + r[0] * 0.7 };
                r
            })
            .collect();
        Dataset::new(vec!["signal".into(), "noise".into()], rows, labels).unwrap()
    }

    #[test]
    fn test_logistic_report() {
        let data = data();
        let plan = FoldPlan::new(data.len(), 5, 4).unwrap();
        let report = train_logistic(&data, &plan, None).unwrap();
        assert_eq!(report.cv.predictions.len(), data.len());
        assert!(report.cv.mean_auc.unwrap() > 0.9);
        assert!(report.model.coefficients[0] < 0.0);
    }

    #[test]
    fn test_forest_grid_sweep() {
        let data = data();
        let plan = FoldPlan::new(data.len(), 5, 4).unwrap();
        let grid = [
            ForestParams {
                n_trees: 5,
                mtry: 1,
                ..ForestParams::default()
            },
            ForestParams {
                n_trees: 15,
                mtry: 2,
                ..ForestParams::default()
            },
        ];
        let report = train_forest(&data, &plan, &grid, 7, None).unwrap();
        assert_eq!(report.grid.len(), 2);
        assert!(grid.contains(&report.params));
        let best = report.grid.iter().filter_map(|g| g.mean_auc).fold(f64::MIN, f64::max);
        assert_eq!(report.cv.mean_auc, Some(best));
        assert_eq!(report.importance.len(), 2);
        assert_eq!(report.importance[0].feature, "signal");
    }

    #[test]
    fn test_speechiness_alone_separates_hits() {
        use crate::evaluation::roc_curve;
        use crate::scaling::FeatureScaler;
        use crate::types::{AudioFeature, AudioFeatures, CleanedSong, Label};

        let songs: Vec<CleanedSong> = (1..=100u32)
            .map(|rank| {
                let mut values = [0.5; crate::types::FEATURE_COUNT];
                values[AudioFeature::Speechiness.index()] = rank as f64 / 100.0;
                values[AudioFeature::Tempo.index()] = 120.0;
                CleanedSong {
                    song: format!("song {}", rank),
                    artist: "artist".into(),
                    rank,
                    year: 2000,
                    lyrics: String::new(),
                    features: AudioFeatures::new(values),
                    duration_ms: None,
                    occurrences: 1,
                    label: Label::from_rank(rank),
                }
            })
            .collect();
        let scaled = FeatureScaler::fit(&songs).transform(&songs);
        let data = Dataset::from_scaled(&scaled).select(&["speechiness"]).unwrap();
        assert_eq!(data.n_features(), 1);

        let plan = FoldPlan::new(data.len(), 10, 42).unwrap();
        let report = train_logistic(&data, &plan, None).unwrap();
        let pooled = roc_curve(data.labels(), &report.cv.predictions).unwrap();
        assert!(pooled.auc > 0.95, "auc {}", pooled.auc);
        assert!(report.model.coefficients[0] < 0.0);
    }

    #[test]
    fn test_empty_grid_rejected() {
        let data = data();
        let plan = FoldPlan::new(data.len(), 5, 4).unwrap();
        assert!(train_forest(&data, &plan, &[], 1, None).is_err());
    }
}
