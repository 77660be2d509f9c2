//! Integration tests for the hitlab pipeline
//!
//! These tests write chart-week CSVs into temp directories and verify the
//! outputs the full pipeline produces.

use hitlab::config::Settings;
use hitlab::model::ForestParams;
use hitlab::{pipeline, HitlabError};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "song,band_singer,ranking,year,lyrics,danceability,energy,loudness,speechiness,\
acousticness,instrumentalness,liveness,valence,tempo,duration_ms";

/// One chart-week row
struct Week {
    song: String,
    rank: u32,
    year: i32,
    speechiness: f64,
    tempo: f64,
}

impl Week {
    fn new(song: &str, rank: u32, speechiness: f64) -> Self {
        Self {
            song: song.to_string(),
            rank,
            year: 1990 + (rank % 10) as i32,
            speechiness,
            tempo: 120.0,
        }
    }

    fn to_csv(&self, i: usize) -> String {
        let wobble = (i * 7 % 10) as f64 / 20.0;
        format!(
            "{},Artist {},{},{},\"la {}\",{},{},{},{},{},{},{},{},{},{}",
            self.song,
            self.song,
            self.rank,
            self.year,
            i,
            0.3 + wobble,
            0.4 + wobble / 2.0,
            -8.0 + wobble,
            self.speechiness,
            0.2 + wobble / 3.0,
            (i % 3) as f64 / 100.0,
            0.1 + wobble / 4.0,
            0.5 - wobble / 2.0,
            self.tempo,
            200_000 + i * 100
        )
    }
}

fn write_csv(path: &Path, weeks: &[Week]) {
    let mut content = String::from(HEADER);
    content.push('\n');
    for (i, week) in weeks.iter().enumerate() {
        writeln!(content, "{}", week.to_csv(i)).unwrap();
    }
    fs::write(path, content).expect("Failed to write CSV");
}

/// 60 songs ranked 1..=60 where speechiness tracks rank
fn ranked_songs() -> Vec<Week> {
    (1..=60)
        .map(|r| Week::new(&format!("Song {}", r), r, r as f64 / 60.0))
        .collect()
}

/// Create test settings with progress bars disabled and a small grid
fn create_test_settings(input: &Path, output: &Path) -> Settings {
    Settings {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        folds: 5,
        seed: 7,
        forest_grid: vec![
            ForestParams {
                n_trees: 10,
                mtry: 3,
                ..ForestParams::default()
            },
            ForestParams {
                n_trees: 20,
                mtry: 5,
                ..ForestParams::default()
            },
        ],
        analysis_threads: 2,
        show_progress: false, // Disable progress bars in tests
        dry_run: false,
        ..Settings::default()
    }
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV");
    reader.records().map(|r| r.expect("Bad CSV row")).collect()
}

#[test]
fn test_pipeline_writes_all_outputs() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");
    let input = input_dir.path().join("songs.csv");
    write_csv(&input, &ranked_songs());

    let out = output_dir.path().join("results");
    let settings = create_test_settings(&input, &out);
    let result = pipeline::run(&settings).expect("Pipeline should succeed");

    assert_eq!(result.songs, 60);
    assert_eq!(result.hits, 10);
    assert_eq!(result.models_trained, 2);
    assert_eq!(result.models_failed, 0);

    for file in [
        "cleaned_songs.csv",
        "yearly_summary.csv",
        "predictions.csv",
        "roc_logistic.csv",
        "roc_random_forest.csv",
        "feature_importance.csv",
        "logistic_coefficients.csv",
        "report.json",
    ] {
        assert!(out.join(file).exists(), "{} should exist", file);
    }

    let predictions = read_rows(&out.join("predictions.csv"));
    assert_eq!(predictions.len(), 60);
    for row in &predictions {
        let p: f64 = row[5].parse().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    let importance = read_rows(&out.join("feature_importance.csv"));
    assert_eq!(importance.len(), 9);
    assert_eq!(&importance[0][0], "1");

    // Intercept plus nine features
    assert_eq!(read_rows(&out.join("logistic_coefficients.csv")).len(), 10);
}

#[test]
fn test_report_json_structure() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");
    write_csv(&input, &ranked_songs());

    let settings = create_test_settings(&input, output_dir.path());
    pipeline::run(&settings).expect("Pipeline should succeed");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.path().join("report.json")).unwrap())
            .expect("Should be valid JSON");

    assert_eq!(json["version"], "1.0");
    assert_eq!(json["metadata"]["seed"], 7);
    assert_eq!(json["dataset"]["cleaning"]["retained"], 60);

    let models = json["models"].as_array().unwrap();
    assert_eq!(models.len(), 2);
    for model in models {
        assert_eq!(model["status"], "trained");
        let auc = model["auc"].as_f64().unwrap();
        let auc_rank = model["auc_rank"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&auc));
        assert!((auc - auc_rank).abs() < 1e-9);
        assert_eq!(model["folds"].as_array().unwrap().len(), 5);
    }
    assert!(models[0]["auc"].as_f64().unwrap() > 0.85, "speechiness tracks rank");
    assert_eq!(models[1]["grid"].as_array().unwrap().len(), 2);
    assert!(models[1]["selected"].is_object());
}

#[test]
fn test_duplicate_weeks_collapse_to_best_rank() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");

    let mut weeks = ranked_songs();
    weeks.retain(|w| w.rank != 3 && w.rank != 7);
    let mut first = Week::new("Twice", 7, 0.2);
    first.year = 1995;
    let mut second = Week::new("Twice", 3, 0.4);
    second.year = 1994;
    weeks.push(first);
    weeks.push(second);
    write_csv(&input, &weeks);

    let settings = create_test_settings(&input, output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed");
    assert_eq!(result.songs, 59);

    let rows = read_rows(&output_dir.path().join("cleaned_songs.csv"));
    let twice = rows.iter().find(|r| &r[0] == "Twice").expect("collapsed song");
    assert_eq!(&twice[2], "3");
    assert_eq!(&twice[3], "1994");
    assert_eq!(&twice[4], "Hit");
    assert_eq!(&twice[5], "2");
    let speechiness: f64 = twice[10].parse().unwrap();
    assert!((speechiness - 0.3).abs() < 1e-12);
}

#[test]
fn test_zero_tempo_song_excluded() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");

    let mut weeks = ranked_songs();
    let mut silent = Week::new("Silence", 2, 0.05);
    silent.tempo = 0.0;
    weeks.push(silent);
    write_csv(&input, &weeks);

    let settings = create_test_settings(&input, output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed");
    assert_eq!(result.songs, 60);

    let rows = read_rows(&output_dir.path().join("cleaned_songs.csv"));
    assert!(rows.iter().all(|r| &r[0] != "Silence"));
    assert!(rows.iter().all(|r| r[15].parse::<f64>().unwrap() > 0.0));
}

#[test]
fn test_missing_feature_rows_dropped() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");

    write_csv(&input, &ranked_songs());
    let mut content = fs::read_to_string(&input).unwrap();
    content.push_str("Gap,Someone,5,1999,words,0.5,0.5,-6,NA,0.1,0,0.1,0.5,110,180000\n");
    fs::write(&input, content).unwrap();

    let settings = create_test_settings(&input, output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed");
    assert_eq!(result.songs, 60);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(json["dataset"]["cleaning"]["incomplete_dropped"], 1);
}

#[test]
fn test_missing_columns_is_fatal() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");
    fs::write(&input, "song,band_singer,ranking\nA,B,1\n").unwrap();

    let out = output_dir.path().join("results");
    let settings = create_test_settings(&input, &out);
    let err = pipeline::run(&settings).expect_err("Missing columns should abort");

    match err {
        HitlabError::MissingColumns { missing, .. } => {
            assert!(missing.contains(&"year".to_string()));
            assert!(missing.contains(&"tempo".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!out.exists(), "Nothing should be written");
}

#[test]
fn test_malformed_rank_is_fatal() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");

    write_csv(&input, &ranked_songs());
    let mut content = fs::read_to_string(&input).unwrap();
    content.push_str("Bad,Someone,first,1999,words,0.5,0.5,-6,0.1,0.1,0,0.1,0.5,110,180000\n");
    fs::write(&input, content).unwrap();

    let settings = create_test_settings(&input, output_dir.path());
    assert!(matches!(
        pipeline::run(&settings),
        Err(HitlabError::MalformedRecord { line: 62, .. })
    ));
}

#[test]
fn test_single_class_input_fails_models_but_writes_tables() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");

    let weeks: Vec<Week> = (20..60)
        .map(|r| Week::new(&format!("Song {}", r), r, r as f64 / 60.0))
        .collect();
    write_csv(&input, &weeks);

    let settings = create_test_settings(&input, output_dir.path());
    let result = pipeline::run(&settings).expect("Model failures are not fatal");
    assert_eq!(result.hits, 0);
    assert_eq!(result.models_trained, 0);
    assert_eq!(result.models_failed, 2);

    assert!(output_dir.path().join("cleaned_songs.csv").exists());
    assert!(!output_dir.path().join("roc_logistic.csv").exists());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.path().join("report.json")).unwrap()).unwrap();
    for model in json["models"].as_array().unwrap() {
        assert_eq!(model["status"], "failed");
        assert!(model["failure"].is_string());
    }
}

#[test]
fn test_dry_run_writes_nothing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");
    write_csv(&input, &ranked_songs());

    let out = output_dir.path().join("results");
    let mut settings = create_test_settings(&input, &out);
    settings.dry_run = true;

    let result = pipeline::run(&settings).expect("Dry run should succeed");
    assert_eq!(result.songs, 60);
    assert_eq!(result.models_trained, 0);
    assert!(!out.exists());
}

#[test]
fn test_same_seed_same_predictions() {
    let input_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("songs.csv");
    write_csv(&input, &ranked_songs());

    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    pipeline::run(&create_test_settings(&input, a.path())).unwrap();
    pipeline::run(&create_test_settings(&input, b.path())).unwrap();

    for file in ["predictions.csv", "feature_importance.csv", "roc_random_forest.csv"] {
        assert_eq!(
            fs::read_to_string(a.path().join(file)).unwrap(),
            fs::read_to_string(b.path().join(file)).unwrap(),
            "{} should be reproducible",
            file
        );
    }
}
