//! Feature standardisation (z-scores over the cleaned population)
//!
//! Statistics are fitted once over every cleaned song, before any
//! cross-validation split, and reused unchanged for all folds.

use crate::types::{AudioFeature, AudioFeatures, CleanedSong, ScaledSong, FEATURE_COUNT};
use serde::Serialize;
use tracing::{debug, warn};

/// Standard deviations at or below this are treated as zero
pub const MIN_STD_DEV: f64 = 1e-12;

/// Population statistics for one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStats {
    pub feature: AudioFeature,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 when degenerate
    pub std_dev: f64,
}

impl FeatureStats {
    /// Constant column (or fewer than two rows): scaling undefined
    pub fn is_degenerate(&self) -> bool {
        self.std_dev <= MIN_STD_DEV
    }

    /// (value - mean) / std, or 0.0 for a degenerate feature
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.mean) / self.std_dev
        }
    }

    /// z * std + mean; a degenerate feature maps back to its mean
    pub fn unscale(&self, z: f64) -> f64 {
        if self.is_degenerate() {
            self.mean
        } else {
            z * self.std_dev + self.mean
        }
    }
}

/// Fitted per-feature standardiser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScaler {
    stats: [FeatureStats; FEATURE_COUNT],
}

impl FeatureScaler {
    /// Compute mean and sample standard deviation of every feature
    pub fn fit(songs: &[CleanedSong]) -> Self {
        let n = songs.len();
        let stats = AudioFeature::ALL.map(|feature| {
            let values = songs.iter().map(|s| s.features[feature]);
            let (mean, std_dev) = mean_and_std(values, n);
            FeatureStats {
                feature,
                mean,
                std_dev,
            }
        });

        let scaler = Self { stats };
        for s in scaler.stats.iter() {
            debug!("{}: mean={:.4}, sd={:.4}", s.feature, s.mean, s.std_dev);
        }
        for feature in scaler.degenerate() {
            warn!(
                "Feature '{}' has zero variance over {} songs; its scaled values are set to 0",
                feature, n
            );
        }
        scaler
    }

    pub fn stats(&self) -> &[FeatureStats; FEATURE_COUNT] {
        &self.stats
    }

    pub fn get(&self, feature: AudioFeature) -> &FeatureStats {
        &self.stats[feature.index()]
    }

    /// Features whose scaled values fell back to 0.0
    pub fn degenerate(&self) -> Vec<AudioFeature> {
        self.stats
            .iter()
            .filter(|s| s.is_degenerate())
            .map(|s| s.feature)
            .collect()
    }

    /// Scale one feature vector
    pub fn scale(&self, features: &AudioFeatures) -> AudioFeatures {
        let mut out = *features;
        for s in &self.stats {
            out[s.feature] = s.scale(features[s.feature]);
        }
        out
    }

    /// Invert `scale`
    pub fn unscale(&self, scaled: &AudioFeatures) -> AudioFeatures {
        let mut out = *scaled;
        for s in &self.stats {
            out[s.feature] = s.unscale(scaled[s.feature]);
        }
        out
    }

    /// Produce a fresh scaled table aligned to `songs`
    pub fn transform(&self, songs: &[CleanedSong]) -> Vec<ScaledSong> {
        songs
            .iter()
            .enumerate()
            .map(|(row, song)| ScaledSong {
                row,
                label: song.label,
                features: self.scale(&song.features),
            })
            .collect()
    }
}

fn mean_and_std(values: impl Iterator<Item = f64> + Clone, n: usize) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
    let std_dev = (ss / (n - 1) as f64).sqrt();
    (mean, if std_dev <= MIN_STD_DEV { 0.0 } else { std_dev })
}
