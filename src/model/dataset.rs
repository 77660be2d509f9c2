//! Feature matrix and labels handed to the classifiers

use crate::error::{HitlabError, Result};
use crate::types::{AudioFeature, ScaledSong};

/// Row-major feature matrix with boolean Hit labels
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    labels: Vec<bool>,
}

impl Dataset {
    /// Build a dataset, checking shape and finiteness
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>, labels: Vec<bool>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(HitlabError::InsufficientData {
                context: "dataset".into(),
                reason: format!("{} rows but {} labels", rows.len(), labels.len()),
            });
        }
        if feature_names.is_empty() {
            return Err(HitlabError::InsufficientData {
                context: "dataset".into(),
                reason: "no features".into(),
            });
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(HitlabError::InsufficientData {
                    context: "dataset".into(),
                    reason: format!(
                        "row {} has {} values, expected {}",
                        i,
                        row.len(),
                        feature_names.len()
                    ),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(HitlabError::InsufficientData {
                    context: "dataset".into(),
                    reason: format!("row {} has a non-finite value", i),
                });
            }
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    /// All nine scaled audio features, rows aligned with the cleaned table
    pub fn from_scaled(songs: &[ScaledSong]) -> Self {
        Self {
            feature_names: AudioFeature::ALL.iter().map(|f| f.name().to_string()).collect(),
            rows: songs.iter().map(|s| s.features.as_array().to_vec()).collect(),
            labels: songs.iter().map(|s| s.label.is_hit()).collect(),
        }
    }

    /// Keep only the named features, in the order given
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .feature_names
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| HitlabError::ConfigError(format!("unknown feature '{}'", name)))?;
            columns.push(idx);
        }

        Self::new(
            names.iter().map(|s| s.to_string()).collect(),
            self.rows
                .iter()
                .map(|row| columns.iter().map(|&c| row[c]).collect())
                .collect(),
            self.labels.clone(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn label(&self, i: usize) -> bool {
        self.labels[i]
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    /// (Hit, NoHit) counts over `rows`
    pub fn class_counts(&self, rows: &[usize]) -> (usize, usize) {
        let hits = rows.iter().filter(|&&i| self.labels[i]).count();
        (hits, rows.len() - hits)
    }
}
