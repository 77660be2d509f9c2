//! CSV reader: selects and renames the needed columns into `RawRecord`s
//!
//! Header problems and unparseable identity fields (rank, year) are fatal.
//! Missing audio features are kept as `None` and dropped by the cleaner.

use crate::config::ColumnMap;
use crate::error::{HitlabError, Result};
use crate::types::{RawRecord, FEATURE_COUNT};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Cell values treated as missing
const MISSING_MARKERS: [&str; 4] = ["", "na", "nan", "null"];

/// Header positions for each logical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub song: usize,
    pub artist: usize,
    pub rank: usize,
    pub year: usize,
    pub lyrics: usize,
    pub duration: usize,
    pub features: [usize; FEATURE_COUNT],
}

impl ResolvedColumns {
    /// Resolve every logical column against the header row.
    ///
    /// Collects all missing columns before failing so the error lists them
    /// together.
    pub fn resolve(headers: &StringRecord, columns: &ColumnMap, path: &Path) -> Result<Self> {
        let mut missing = Vec::new();
        let mut hints = Vec::new();

        let mut find = |logical: &str, names: &[String]| -> usize {
            let found = names
                .iter()
                .find_map(|name| headers.iter().position(|h| h.trim() == name));
            match found {
                Some(idx) => idx,
                None => {
                    missing.push(logical.to_string());
                    hints.push(format!("{}: {}", logical, names.join("|")));
                    usize::MAX
                }
            }
        };

        let song = find("song", &columns.song);
        let artist = find("artist", &columns.artist);
        let rank = find("rank", &columns.rank);
        let year = find("year", &columns.year);
        let lyrics = find("lyrics", &columns.lyrics);
        let duration = find("duration", &columns.duration);
        let mut features = [0usize; FEATURE_COUNT];
        for (i, names) in columns.features.iter().enumerate() {
            let logical = names.first().map(String::as_str).unwrap_or("feature");
            features[i] = find(logical, names);
        }

        if !missing.is_empty() {
            return Err(HitlabError::MissingColumns {
                path: path.to_path_buf(),
                missing,
                hint: hints.join("; "),
            });
        }

        Ok(Self {
            song,
            artist,
            rank,
            year,
            lyrics,
            duration,
            features,
        })
    }
}

/// Load every row of the source file, preserving source order
pub fn load(path: &Path, columns: &ColumnMap) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).map_err(|e| HitlabError::InputError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let records = load_from_reader(file, columns, path)?;
    info!("Loaded {} chart-week records from {}", records.len(), path.display());
    Ok(records)
}

/// Load from any reader; `path` is used for error messages only
pub fn load_from_reader<R: Read>(reader: R, columns: &ColumnMap, path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        // Text cells are grouping keys and stay verbatim; numeric parsers trim
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| HitlabError::InputError {
            path: path.to_path_buf(),
            reason: format!("failed to read header row: {}", e),
        })?
        .clone();

    let resolved = ResolvedColumns::resolve(&headers, columns, path)?;
    debug!("Resolved source columns: {:?}", resolved);

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| csv_error(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        records.push(parse_row(&row, &resolved, path, line)?);
    }

    Ok(records)
}

fn csv_error(path: &Path, err: csv::Error) -> HitlabError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.kind() {
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. } => {
            HitlabError::malformed(path, line, err.to_string())
        }
        _ => HitlabError::InputError {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}

fn parse_row(row: &StringRecord, cols: &ResolvedColumns, path: &Path, line: u64) -> Result<RawRecord> {
    let cell = |idx: usize| row.get(idx).unwrap_or("");

    let rank_text = cell(cols.rank);
    let rank = parse_rank(rank_text)
        .ok_or_else(|| HitlabError::malformed(path, line, format!("invalid rank '{}'", rank_text)))?;

    let year_text = cell(cols.year);
    let year = parse_integer(year_text)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| HitlabError::malformed(path, line, format!("invalid year '{}'", year_text)))?;

    let mut features = [None; FEATURE_COUNT];
    for (slot, &idx) in features.iter_mut().zip(cols.features.iter()) {
        *slot = parse_optional(cell(idx))
            .map_err(|text| HitlabError::malformed(path, line, format!("invalid audio feature value '{}'", text)))?;
    }

    let duration_ms = parse_optional(cell(cols.duration))
        .map_err(|text| HitlabError::malformed(path, line, format!("invalid duration '{}'", text)))?;

    Ok(RawRecord {
        song: cell(cols.song).to_string(),
        artist: cell(cols.artist).to_string(),
        rank,
        year,
        lyrics: cell(cols.lyrics).to_string(),
        features,
        duration_ms,
    })
}

fn is_missing(text: &str) -> bool {
    let lower = text.trim().to_ascii_lowercase();
    MISSING_MARKERS.contains(&lower.as_str())
}

/// Parse a possibly-missing numeric cell; `Err` carries the offending text
fn parse_optional(text: &str) -> std::result::Result<Option<f64>, String> {
    if is_missing(text) {
        return Ok(None);
    }
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(text.to_string()),
    }
}

/// Integers may be written as floats by upstream tools ("1999.0")
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let v = text.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_rank(text: &str) -> Option<u32> {
    parse_integer(text)
        .filter(|&r| r >= 1)
        .and_then(|r| u32::try_from(r).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "song,band_singer,ranking,year,lyrics,danceability,energy,loudness,speechiness,acousticness,instrumentalness,liveness,valence,tempo,duration_ms";

    fn load_str(body: &str) -> Result<Vec<RawRecord>> {
        load_from_reader(body.as_bytes(), &ColumnMap::default(), Path::new("test.csv"))
    }

    #[test]
    fn test_load_selects_and_renames() {
        let csv = format!(
            "{}\nSong A,Artist A,3,1999,la la,0.5,0.6,-5.0,0.05,0.1,0.0,0.2,0.7,120.0,200000\n",
            HEADER
        );
        let records = load_str(&csv).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.song, "Song A");
        assert_eq!(r.artist, "Artist A");
        assert_eq!(r.rank, 3);
        assert_eq!(r.year, 1999);
        assert_eq!(r.features[0], Some(0.5));
        assert_eq!(r.features[8], Some(120.0));
        assert_eq!(r.duration_ms, Some(200000.0));
    }

    #[test]
    fn test_text_cells_kept_verbatim() {
        let csv = format!(
            "{}\n Song,Artist, 3 ,1999,x, 0.5,0.6,-5.0,0.05,0.1,0.0,0.2,0.7,120.0 ,\nSong,Artist,4,1999,x,0.5,0.6,-5.0,0.05,0.1,0.0,0.2,0.7,120.0,\n",
            HEADER
        );
        let records = load_str(&csv).unwrap();
        assert_eq!(records[0].song, " Song");
        assert_eq!(records[1].song, "Song");
        assert_ne!(records[0].song, records[1].song);
        assert_eq!(records[0].rank, 3);
        assert_eq!(records[0].features[0], Some(0.5));
        assert_eq!(records[0].features[8], Some(120.0));
    }

    #[test]
    fn test_missing_markers_become_none() {
        let csv = format!(
            "{}\nS,A,1,2001,x,NA,,-5,0.1,0.1,0,0.1,0.1,100,\n",
            HEADER
        );
        let records = load_str(&csv).unwrap();
        assert_eq!(records[0].features[0], None);
        assert_eq!(records[0].features[1], None);
        assert_eq!(records[0].duration_ms, None);
    }

    #[test]
    fn test_missing_columns_is_fatal_and_lists_all() {
        let csv = "song,artist,year\nS,A,2001\n";
        let err = load_str(csv).unwrap_err();
        match err {
            HitlabError::MissingColumns { missing, .. } => {
                assert!(missing.contains(&"rank".to_string()));
                assert!(missing.contains(&"tempo".to_string()));
                assert!(!missing.contains(&"artist".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_rank_is_malformed() {
        let csv = format!("{}\nS,A,zero,2001,x,0.5,0.5,-5,0.1,0.1,0,0.1,0.1,100,1\n", HEADER);
        assert!(matches!(
            load_str(&csv).unwrap_err(),
            HitlabError::MalformedRecord { line: 2, .. }
        ));
        let csv = format!("{}\nS,A,0,2001,x,0.5,0.5,-5,0.1,0.1,0,0.1,0.1,100,1\n", HEADER);
        assert!(load_str(&csv).is_err());
    }

    #[test]
    fn test_float_encoded_integers_accepted() {
        assert_eq!(parse_integer("1999.0"), Some(1999));
        assert_eq!(parse_integer("1999.5"), None);
        assert_eq!(parse_rank("7"), Some(7));
        assert_eq!(parse_rank("-1"), None);
    }

    #[test]
    fn test_source_order_preserved() {
        let csv = format!(
            "{}\nB,X,5,2001,b,0.5,0.5,-5,0.1,0.1,0,0.1,0.1,100,1\nA,X,4,2000,a,0.5,0.5,-5,0.1,0.1,0,0.1,0.1,100,1\n",
            HEADER
        );
        let records = load_str(&csv).unwrap();
        assert_eq!(records[0].song, "B");
        assert_eq!(records[1].song, "A");
    }
}
