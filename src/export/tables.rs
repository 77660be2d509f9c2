//! CSV tables for the external reporter
//!
//! Flat rows go through `csv::Writer::serialize`; tables whose columns
//! depend on the feature set or the trained models are written field by
//! field.

use crate::cleaning::YearSummary;
use crate::error::{HitlabError, Result};
use crate::evaluation::RocCurve;
use crate::model::{Coefficient, FeatureImportance};
use crate::types::{AudioFeature, CleanedSong};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::debug;

fn create_writer(path: &Path) -> Result<csv::Writer<File>> {
    let file = File::create(path).map_err(|e| HitlabError::output_io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut writer: csv::Writer<File>, path: &Path, rows: usize) -> Result<()> {
    writer.flush().map_err(|e| HitlabError::output_io(path, e))?;
    debug!("Wrote {} rows to {}", rows, path.display());
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = create_writer(path)?;
    for row in rows {
        writer.serialize(row).map_err(|e| HitlabError::output_error(path, e))?;
    }
    finish(writer, path, rows.len())
}

fn feature_headers() -> impl Iterator<Item = String> {
    AudioFeature::ALL.iter().map(|f| f.name().to_string())
}

/// One row per cleaned song with raw (unscaled) features
pub fn write_cleaned_songs(path: &Path, songs: &[CleanedSong]) -> Result<()> {
    let mut writer = create_writer(path)?;
    let header: Vec<String> = ["song", "artist", "rank", "year", "label", "occurrences", "duration_ms"]
        .iter()
        .map(|s| s.to_string())
        .chain(feature_headers())
        .chain(std::iter::once("lyrics".to_string()))
        .collect();
    writer.write_record(&header).map_err(|e| HitlabError::output_error(path, e))?;

    for song in songs {
        let mut record = vec![
            song.song.clone(),
            song.artist.clone(),
            song.rank.to_string(),
            song.year.to_string(),
            song.label.to_string(),
            song.occurrences.to_string(),
            song.duration_ms.map(|d| d.to_string()).unwrap_or_default(),
        ];
        record.extend(song.features.as_array().iter().map(|v| v.to_string()));
        record.push(song.lyrics.clone());
        writer.write_record(&record).map_err(|e| HitlabError::output_error(path, e))?;
    }
    finish(writer, path, songs.len())
}

/// Per-year counts and mean raw features
pub fn write_yearly_summary(path: &Path, years: &[YearSummary]) -> Result<()> {
    let mut writer = create_writer(path)?;
    let header: Vec<String> = ["year", "songs", "hits", "hit_share"]
        .iter()
        .map(|s| s.to_string())
        .chain(feature_headers().map(|f| format!("mean_{}", f)))
        .collect();
    writer.write_record(&header).map_err(|e| HitlabError::output_error(path, e))?;

    for year in years {
        let mut record = vec![
            year.year.to_string(),
            year.songs.to_string(),
            year.hits.to_string(),
            year.hit_share.to_string(),
        ];
        record.extend(year.mean_features.as_array().iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| HitlabError::output_error(path, e))?;
    }
    finish(writer, path, years.len())
}

/// Out-of-fold P(Hit) per song, one column per trained model
pub fn write_predictions(path: &Path, songs: &[CleanedSong], models: &[(&str, &[f64])]) -> Result<()> {
    let mut writer = create_writer(path)?;
    let header: Vec<String> = ["row", "song", "artist", "rank", "label"]
        .iter()
        .map(|s| s.to_string())
        .chain(models.iter().map(|(name, _)| format!("p_hit_{}", name)))
        .collect();
    writer.write_record(&header).map_err(|e| HitlabError::output_error(path, e))?;

    for (row, song) in songs.iter().enumerate() {
        let mut record = vec![
            row.to_string(),
            song.song.clone(),
            song.artist.clone(),
            song.rank.to_string(),
            song.label.to_string(),
        ];
        record.extend(models.iter().map(|(_, p)| p[row].to_string()));
        writer.write_record(&record).map_err(|e| HitlabError::output_error(path, e))?;
    }
    finish(writer, path, songs.len())
}

/// Curve points in increasing false-positive-rate order
pub fn write_roc(path: &Path, curve: &RocCurve) -> Result<()> {
    write_rows(path, &curve.points)
}

pub fn write_importance(path: &Path, table: &[FeatureImportance]) -> Result<()> {
    write_rows(path, table)
}

pub fn write_coefficients(path: &Path, table: &[Coefficient]) -> Result<()> {
    write_rows(path, table)
}
