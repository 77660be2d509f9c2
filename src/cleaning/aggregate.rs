//! Collapse chart-week records into one `CleanedSong` per (song, artist)
//!
//! Order of operations:
//! 1. drop records missing any audio feature
//! 2. group by exact (song, artist), keeping first-appearance order
//! 3. min rank, min year, first lyrics, mean of each feature
//! 4. drop groups failing the plausibility gate
//! 5. derive the label from the best rank

use crate::types::{AudioFeatures, CleanedSong, Label, RawRecord, FEATURE_COUNT};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Counts describing what the cleaner kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Records handed to the cleaner
    pub input_records: usize,
    /// Records dropped for a missing audio feature
    pub incomplete_dropped: usize,
    /// Distinct (song, artist) groups before the plausibility gate
    pub unique_songs: usize,
    /// Groups dropped by the plausibility gate
    pub implausible_dropped: usize,
    /// Songs in the final table
    pub retained: usize,
    /// Retained songs labelled Hit
    pub hits: usize,
}

/// Cleaned table plus diagnostics
#[derive(Debug, Clone)]
pub struct CleaningOutput {
    pub songs: Vec<CleanedSong>,
    pub report: CleaningReport,
}

/// Running aggregate for one (song, artist) group
struct SongAccumulator {
    song: String,
    artist: String,
    rank: u32,
    year: i32,
    lyrics: String,
    sums: [f64; FEATURE_COUNT],
    duration_sum: f64,
    duration_count: usize,
    count: usize,
}

impl SongAccumulator {
    fn start(record: &RawRecord, features: &AudioFeatures) -> Self {
        let mut acc = Self {
            song: record.song.clone(),
            artist: record.artist.clone(),
            rank: record.rank,
            year: record.year,
            lyrics: record.lyrics.clone(),
            sums: [0.0; FEATURE_COUNT],
            duration_sum: 0.0,
            duration_count: 0,
            count: 0,
        };
        acc.add(record, features);
        acc
    }

    fn add(&mut self, record: &RawRecord, features: &AudioFeatures) {
        self.rank = self.rank.min(record.rank);
        self.year = self.year.min(record.year);
        for (sum, value) in self.sums.iter_mut().zip(features.as_array()) {
            *sum += value;
        }
        if let Some(d) = record.duration_ms {
            self.duration_sum += d;
            self.duration_count += 1;
        }
        self.count += 1;
    }

    fn finish(self) -> CleanedSong {
        let n = self.count as f64;
        let features = AudioFeatures::new(self.sums.map(|s| s / n));
        let duration_ms = (self.duration_count > 0).then(|| self.duration_sum / self.duration_count as f64);

        CleanedSong {
            label: Label::from_rank(self.rank),
            song: self.song,
            artist: self.artist,
            rank: self.rank,
            year: self.year,
            lyrics: self.lyrics,
            features,
            duration_ms,
            occurrences: self.count,
        }
    }
}

/// Clean raw chart-week records into one row per unique song.
///
/// Deterministic given input order: the output follows the order in which
/// each (song, artist) first appears, and lyrics come from that first record.
pub fn clean(records: &[RawRecord]) -> CleaningOutput {
    let mut report = CleaningReport {
        input_records: records.len(),
        ..CleaningReport::default()
    };

    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<SongAccumulator> = Vec::new();

    for record in records {
        let Some(features) = AudioFeatures::from_options(&record.features) else {
            report.incomplete_dropped += 1;
            continue;
        };

        match index.get(&(record.song.as_str(), record.artist.as_str())) {
            Some(&slot) => groups[slot].add(record, &features),
            None => {
                index.insert((record.song.as_str(), record.artist.as_str()), groups.len());
                groups.push(SongAccumulator::start(record, &features));
            }
        }
    }

    report.unique_songs = groups.len();

    let mut songs = Vec::with_capacity(groups.len());
    for group in groups {
        let song = group.finish();
        if song.features.is_plausible() {
            songs.push(song);
        } else {
            debug!(
                "Dropping '{}' by '{}': implausible {:?}",
                song.song,
                song.artist,
                song.features.implausible()
            );
            report.implausible_dropped += 1;
        }
    }

    report.retained = songs.len();
    report.hits = songs.iter().filter(|s| s.label.is_hit()).count();

    if report.incomplete_dropped > 0 {
        warn!(
            "Dropped {} of {} records with missing audio features",
            report.incomplete_dropped, report.input_records
        );
    }
    if report.implausible_dropped > 0 {
        warn!(
            "Dropped {} songs failing the plausibility filter (tempo > 0, danceability/energy in [0, 1])",
            report.implausible_dropped
        );
    }
    info!(
        "Cleaned {} records into {} songs ({} Hit, {} NoHit)",
        report.input_records,
        report.retained,
        report.hits,
        report.retained - report.hits
    );

    CleaningOutput { songs, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioFeature;

    fn record(song: &str, artist: &str, rank: u32, year: i32, lyrics: &str, features: [f64; FEATURE_COUNT]) -> RawRecord {
        RawRecord {
            song: song.into(),
            artist: artist.into(),
            rank,
            year,
            lyrics: lyrics.into(),
            features: features.map(Some),
            duration_ms: Some(180_000.0),
        }
    }

    fn plain() -> [f64; FEATURE_COUNT] {
        [0.5, 0.6, -6.0, 0.05, 0.2, 0.0, 0.1, 0.4, 118.0]
    }

    #[test]
    fn test_two_weeks_collapse_to_best_rank() {
        let mut later = plain();
        later[0] = 0.7;
        let records = vec![
            record("Song", "Band", 7, 2001, "first", plain()),
            record("Song", "Band", 3, 2000, "second", later),
        ];
        let out = clean(&records);
        assert_eq!(out.songs.len(), 1);
        let song = &out.songs[0];
        assert_eq!(song.rank, 3);
        assert_eq!(song.year, 2000);
        assert_eq!(song.lyrics, "first");
        assert_eq!(song.label, Label::Hit);
        assert_eq!(song.occurrences, 2);
        assert!((song.features[AudioFeature::Danceability] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_grouping_is_case_sensitive() {
        let records = vec![
            record("Song", "Band", 20, 2001, "", plain()),
            record("song", "Band", 20, 2001, "", plain()),
            record("Song", "band", 20, 2001, "", plain()),
        ];
        assert_eq!(clean(&records).songs.len(), 3);
    }

    #[test]
    fn test_incomplete_records_dropped_before_grouping() {
        let mut incomplete = record("Song", "Band", 1, 1990, "early", plain());
        incomplete.features[3] = None;
        let records = vec![incomplete, record("Song", "Band", 40, 1995, "late", plain())];

        let out = clean(&records);
        assert_eq!(out.report.incomplete_dropped, 1);
        assert_eq!(out.songs.len(), 1);
        assert_eq!(out.songs[0].rank, 40);
        assert_eq!(out.songs[0].lyrics, "late");
        assert_eq!(out.songs[0].label, Label::NoHit);
    }

    #[test]
    fn test_zero_tempo_excluded() {
        let mut zero_tempo = plain();
        zero_tempo[AudioFeature::Tempo.index()] = 0.0;
        let records = vec![
            record("Silent", "Nobody", 1, 2005, "", zero_tempo),
            record("Loud", "Somebody", 1, 2005, "", plain()),
        ];
        let out = clean(&records);
        assert_eq!(out.report.implausible_dropped, 1);
        assert_eq!(out.songs.len(), 1);
        assert_eq!(out.songs[0].song, "Loud");
    }

    #[test]
    fn test_filter_applies_to_group_mean() {
        let mut high = plain();
        high[AudioFeature::Energy.index()] = 1.2;
        let mut low = plain();
        low[AudioFeature::Energy.index()] = 0.6;
        // Mean energy 0.9 is plausible even though one week was not
        let records = vec![
            record("Song", "Band", 50, 2010, "", high),
            record("Song", "Band", 60, 2010, "", low),
        ];
        let out = clean(&records);
        assert_eq!(out.songs.len(), 1);
        for song in &out.songs {
            assert!(song.features.is_plausible());
        }
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut other = plain();
        other[AudioFeature::Valence.index()] = 0.9;
        let records = vec![
            record("A", "X", 12, 2003, "a1", plain()),
            record("B", "Y", 2, 2004, "b1", other),
            record("A", "X", 9, 2002, "a2", other),
            record("C", "Z", 33, 2001, "c1", plain()),
        ];
        let once = clean(&records).songs;
        let again_input: Vec<RawRecord> = once.iter().map(RawRecord::from).collect();
        let twice = clean(&again_input).songs;

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.song, b.song);
            assert_eq!(a.artist, b.artist);
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.year, b.year);
            assert_eq!(a.lyrics, b.lyrics);
            assert_eq!(a.features, b.features);
            assert_eq!(a.label, b.label);
        }
    }

    #[test]
    fn test_report_counts() {
        let mut bad = plain();
        bad[AudioFeature::Danceability.index()] = -0.5;
        let mut incomplete = record("D", "W", 5, 2000, "", plain());
        incomplete.features[0] = None;
        let records = vec![
            record("A", "X", 1, 2000, "", plain()),
            record("B", "X", 50, 2000, "", plain()),
            record("C", "X", 2, 2000, "", bad),
            incomplete,
        ];
        let report = clean(&records).report;
        assert_eq!(
            report,
            CleaningReport {
                input_records: 4,
                incomplete_dropped: 1,
                unique_songs: 3,
                implausible_dropped: 1,
                retained: 2,
                hits: 1,
            }
        );
    }
}
