//! Core data types for hitlab
//!
//! These types represent the domain model and flow through the pipeline:
//! `RawRecord` (load) → `CleanedSong` (clean) → `ScaledSong` (scale).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of audio features carried per song
pub const FEATURE_COUNT: usize = 9;

/// Best chart position at or below which a song counts as a Hit
pub const HIT_RANK_THRESHOLD: u32 = 10;

// =============================================================================
// Audio features
// =============================================================================

/// The nine numeric musical descriptors measured per song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFeature {
    Danceability,
    Energy,
    Loudness,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
    Tempo,
}

impl AudioFeature {
    /// All features in canonical column order
    pub const ALL: [AudioFeature; FEATURE_COUNT] = [
        AudioFeature::Danceability,
        AudioFeature::Energy,
        AudioFeature::Loudness,
        AudioFeature::Speechiness,
        AudioFeature::Acousticness,
        AudioFeature::Instrumentalness,
        AudioFeature::Liveness,
        AudioFeature::Valence,
        AudioFeature::Tempo,
    ];

    /// Position in the canonical order
    pub fn index(self) -> usize {
        match self {
            AudioFeature::Danceability => 0,
            AudioFeature::Energy => 1,
            AudioFeature::Loudness => 2,
            AudioFeature::Speechiness => 3,
            AudioFeature::Acousticness => 4,
            AudioFeature::Instrumentalness => 5,
            AudioFeature::Liveness => 6,
            AudioFeature::Valence => 7,
            AudioFeature::Tempo => 8,
        }
    }

    /// Column / report name
    pub fn name(self) -> &'static str {
        match self {
            AudioFeature::Danceability => "danceability",
            AudioFeature::Energy => "energy",
            AudioFeature::Loudness => "loudness",
            AudioFeature::Speechiness => "speechiness",
            AudioFeature::Acousticness => "acousticness",
            AudioFeature::Instrumentalness => "instrumentalness",
            AudioFeature::Liveness => "liveness",
            AudioFeature::Valence => "valence",
            AudioFeature::Tempo => "tempo",
        }
    }

    /// Whether `value` is plausible for this feature after aggregation.
    ///
    /// Only tempo, danceability and energy are gated; the remaining features
    /// accept any finite value.
    pub fn is_plausible(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            AudioFeature::Tempo => value > 0.0,
            AudioFeature::Danceability | AudioFeature::Energy => (0.0..=1.0).contains(&value),
            _ => true,
        }
    }
}

impl fmt::Display for AudioFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete set of audio feature values, indexed by `AudioFeature`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures([f64; FEATURE_COUNT]);

impl AudioFeatures {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build from optional values; `None` if any feature is missing
    pub fn from_options(values: &[Option<f64>; FEATURE_COUNT]) -> Option<Self> {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(values.iter()) {
            *slot = (*value)?;
        }
        Some(Self(out))
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Every feature lies within its plausibility domain
    pub fn is_plausible(&self) -> bool {
        AudioFeature::ALL
            .iter()
            .all(|f| f.is_plausible(self[*f]))
    }

    /// Features that fail the plausibility gate
    pub fn implausible(&self) -> Vec<AudioFeature> {
        AudioFeature::ALL
            .into_iter()
            .filter(|f| !f.is_plausible(self[*f]))
            .collect()
    }
}

impl Index<AudioFeature> for AudioFeatures {
    type Output = f64;

    fn index(&self, feature: AudioFeature) -> &f64 {
        &self.0[feature.index()]
    }
}

impl IndexMut<AudioFeature> for AudioFeatures {
    fn index_mut(&mut self, feature: AudioFeature) -> &mut f64 {
        &mut self.0[feature.index()]
    }
}

// =============================================================================
// Label
// =============================================================================

/// Binary chart-success label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Hit,
    NoHit,
}

impl Label {
    /// Hit iff the best rank reached the top `HIT_RANK_THRESHOLD`
    pub fn from_rank(rank: u32) -> Self {
        if rank <= HIT_RANK_THRESHOLD {
            Label::Hit
        } else {
            Label::NoHit
        }
    }

    pub fn is_hit(self) -> bool {
        self == Label::Hit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Hit => "Hit",
            Label::NoHit => "NoHit",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stage records
// =============================================================================

/// One source row: a song's appearance in one chart week
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub song: String,
    pub artist: String,
    /// Chart position, 1 = best
    pub rank: u32,
    pub year: i32,
    pub lyrics: String,
    /// Audio features in canonical order; `None` where the source was missing
    pub features: [Option<f64>; FEATURE_COUNT],
    pub duration_ms: Option<f64>,
}

/// One row per unique (song, artist) after aggregation and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedSong {
    pub song: String,
    pub artist: String,
    /// Best (minimum) rank ever achieved
    pub rank: u32,
    /// Earliest chart year
    pub year: i32,
    /// Lyrics of the first record encountered in source order
    pub lyrics: String,
    /// Mean of each feature across chart weeks
    pub features: AudioFeatures,
    /// Mean duration over the weeks that reported one
    pub duration_ms: Option<f64>,
    /// Number of chart-week records collapsed into this row
    pub occurrences: usize,
    pub label: Label,
}

impl From<&CleanedSong> for RawRecord {
    fn from(song: &CleanedSong) -> Self {
        let mut features = [None; FEATURE_COUNT];
        for (slot, value) in features.iter_mut().zip(song.features.as_array()) {
            *slot = Some(*value);
        }
        RawRecord {
            song: song.song.clone(),
            artist: song.artist.clone(),
            rank: song.rank,
            year: song.year,
            lyrics: song.lyrics.clone(),
            features,
            duration_ms: song.duration_ms,
        }
    }
}

/// A cleaned song with each feature replaced by its population z-score
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSong {
    /// Row index into the cleaned table
    pub row: usize,
    pub label: Label,
    pub features: AudioFeatures,
}
