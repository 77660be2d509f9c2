//! hitlab - Which audio features separate chart hits from the rest?
//!
//! A command-line utility that turns a chart-week / audio-feature table into
//! one row per song, labels top-10 songs as hits, and cross-validates a
//! logistic baseline against a random forest. Outputs CSV tables and a JSON
//! report for plotting.
//!
//! # Architecture
//!
//! Data flows one way, each stage returning a fresh value:
//!
//! - `loader`: CSV source → `RawRecord`s, header aliases resolved
//! - `cleaning`: drop incomplete records, collapse (song, artist), plausibility gate, label
//! - `scaling`: population z-scores per audio feature
//! - `model`: shared fold plan, logistic regression, random forest grid, importance
//! - `evaluation`: ROC curve and AUC
//! - `pipeline`: stage sequencing and per-model failure isolation
//! - `export`: CSV tables and `report.json`
//!
//! # Example
//!
//! ```no_run
//! use hitlab::{config::Settings, pipeline};
//!
//! let settings = Settings::default();
//! let result = pipeline::run(&settings).expect("Analysis failed");
//! println!("Trained {} models on {} songs", result.models_trained, result.songs);
//! ```

pub mod cleaning;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod scaling;
pub mod types;

// Re-export key types at crate root
pub use error::{HitlabError, Result};
pub use types::{AudioFeature, AudioFeatures, CleanedSong, Label, RawRecord, ScaledSong};
