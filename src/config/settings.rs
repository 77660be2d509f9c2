//! Runtime configuration settings

use crate::error::{HitlabError, Result};
use crate::model::ForestParams;
use crate::types::{AudioFeature, FEATURE_COUNT};
use std::path::PathBuf;

/// Default number of cross-validation folds
pub const DEFAULT_FOLDS: usize = 10;

/// Accepted header names for each logical input column, first match wins
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub song: Vec<String>,
    pub artist: Vec<String>,
    pub rank: Vec<String>,
    pub year: Vec<String>,
    pub lyrics: Vec<String>,
    pub duration: Vec<String>,
    /// Indexed by `AudioFeature::index()`
    pub features: [Vec<String>; FEATURE_COUNT],
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            song: aliases(&["song", "title", "song_title"]),
            artist: aliases(&["band_singer", "artist", "artist_name", "performer"]),
            rank: aliases(&["ranking", "rank", "position", "peak_position"]),
            year: aliases(&["year", "chart_year"]),
            lyrics: aliases(&["lyrics", "lyric"]),
            duration: aliases(&["duration_ms", "duration"]),
            features: AudioFeature::ALL.map(|f| vec![f.name().to_string()]),
        }
    }
}

/// Runtime settings for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source CSV
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Cross-validation folds
    pub folds: usize,
    /// Seed for every resampling step
    pub seed: u64,
    /// Random forest configurations swept during cross-validation
    pub forest_grid: Vec<ForestParams>,
    /// Number of rayon worker threads
    pub analysis_threads: usize,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - diagnostics only
    pub dry_run: bool,
    /// Header aliases
    pub columns: ColumnMap,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let default_threads = num_cpus::get().saturating_sub(1).max(1);

        Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            folds: cli.folds,
            seed: cli.seed,
            forest_grid: forest_grid(&cli.trees, &cli.mtry),
            analysis_threads: cli.threads.unwrap_or(default_threads),
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
            columns: ColumnMap::default(),
        }
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(HitlabError::ConfigError(format!(
                "at least 2 folds are required, got {}",
                self.folds
            )));
        }
        if self.analysis_threads == 0 {
            return Err(HitlabError::ConfigError("thread count must be positive".into()));
        }
        if self.forest_grid.is_empty() {
            return Err(HitlabError::ConfigError("random forest grid is empty".into()));
        }
        if let Some(bad) = self
            .forest_grid
            .iter()
            .find(|p| p.n_trees == 0 || p.mtry == 0 || p.mtry > FEATURE_COUNT)
        {
            return Err(HitlabError::ConfigError(format!(
                "invalid forest configuration {}: trees must be positive and mtry in 1..={}",
                bad, FEATURE_COUNT
            )));
        }
        Ok(())
    }
}

/// Cross product of tree counts and split-feature counts, in sweep order
pub fn forest_grid(trees: &[usize], mtry: &[usize]) -> Vec<ForestParams> {
    trees
        .iter()
        .flat_map(|&n_trees| {
            mtry.iter().map(move |&mtry| ForestParams {
                n_trees,
                mtry,
                ..ForestParams::default()
            })
        })
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("songs.csv"),
            output: PathBuf::from("./hitlab-output"),
            folds: DEFAULT_FOLDS,
            seed: 42,
            forest_grid: forest_grid(&[50, 150], &[2, 3, 4]),
            analysis_threads: num_cpus::get().saturating_sub(1).max(1),
            show_progress: true,
            dry_run: false,
            columns: ColumnMap::default(),
        }
    }
}
