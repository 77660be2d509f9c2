//! Per-year aggregates of the cleaned table, for time-series plots

use crate::types::{AudioFeature, AudioFeatures, CleanedSong, FEATURE_COUNT};
use serde::Serialize;
use std::collections::BTreeMap;

/// Songs first charting in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub songs: usize,
    pub hits: usize,
    /// Hits / songs
    pub hit_share: f64,
    /// Mean raw value of each audio feature
    pub mean_features: AudioFeatures,
}

/// Summarise cleaned songs by earliest chart year, ascending
pub fn yearly_summary(songs: &[CleanedSong]) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<i32, (usize, usize, [f64; FEATURE_COUNT])> = BTreeMap::new();

    for song in songs {
        let entry = by_year.entry(song.year).or_insert((0, 0, [0.0; FEATURE_COUNT]));
        entry.0 += 1;
        if song.label.is_hit() {
            entry.1 += 1;
        }
        for feature in AudioFeature::ALL {
            entry.2[feature.index()] += song.features[feature];
        }
    }

    by_year
        .into_iter()
        .map(|(year, (count, hits, sums))| {
            let n = count as f64;
            YearSummary {
                year,
                songs: count,
                hits,
                hit_share: hits as f64 / n,
                mean_features: AudioFeatures::new(sums.map(|s| s / n)),
            }
        })
        .collect()
}
