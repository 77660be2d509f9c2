//! Pipeline orchestration
//!
//! Runs load → clean → scale → train → evaluate → export. Input and output
//! errors abort the run. A recoverable model error marks that model failed
//! and the run continues with the other one.

use crate::cleaning::{self, CleaningReport, YearSummary};
use crate::config::Settings;
use crate::error::{HitlabError, Result};
use crate::evaluation::{roc_curve, RocCurve};
use crate::export;
use crate::loader;
use crate::model::{self, CvOutcome, Dataset, FoldPlan, ForestReport, LogisticReport};
use crate::scaling::FeatureScaler;
use crate::types::{CleanedSong, RawRecord};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    /// Songs retained after cleaning
    pub songs: usize,
    pub hits: usize,
    pub models_trained: usize,
    pub models_failed: usize,
}

/// Cleaned and scaled data, ready for training
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub songs: Vec<CleanedSong>,
    pub cleaning: CleaningReport,
    pub years: Vec<YearSummary>,
    pub scaler: FeatureScaler,
    /// Scaled features, rows aligned with `songs`
    pub dataset: Dataset,
}

/// What happened to one model
#[derive(Debug, Clone)]
pub enum ModelOutcome<T> {
    /// Cross-validated, with the curve over its out-of-fold probabilities
    Trained { report: T, roc: RocCurve },
    Failed { reason: String },
}

impl<T> ModelOutcome<T> {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelOutcome::Trained { .. })
    }

    pub fn report(&self) -> Option<&T> {
        match self {
            ModelOutcome::Trained { report, .. } => Some(report),
            ModelOutcome::Failed { .. } => None,
        }
    }

    pub fn roc(&self) -> Option<&RocCurve> {
        match self {
            ModelOutcome::Trained { roc, .. } => Some(roc),
            ModelOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            ModelOutcome::Trained { .. } => None,
            ModelOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Everything the exporters need
#[derive(Debug, Clone)]
pub struct Analysis {
    pub data: PreparedData,
    pub logistic: ModelOutcome<LogisticReport>,
    pub forest: ModelOutcome<ForestReport>,
}

impl Analysis {
    pub fn models_trained(&self) -> usize {
        self.logistic.is_trained() as usize + self.forest.is_trained() as usize
    }

    pub fn models_failed(&self) -> usize {
        2 - self.models_trained()
    }
}

/// Run the full analysis pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    settings.validate()?;
    configure_thread_pool(settings.analysis_threads)?;

    // Phase 1: Load
    let load_start = Instant::now();
    info!("Loading {}", settings.input.display());
    let records = loader::load(&settings.input, &settings.columns)?;
    info!(
        "Loaded {} chart-week records in {:.2}s",
        records.len(),
        load_start.elapsed().as_secs_f64()
    );

    // Phase 2: Clean and scale
    let prepared = prepare(&records);

    if settings.dry_run {
        print_dry_run(&prepared, settings);
        return Ok(PipelineResult {
            songs: prepared.songs.len(),
            hits: prepared.cleaning.hits,
            models_trained: 0,
            models_failed: 0,
        });
    }

    // Phase 3: Train and evaluate
    let train_start = Instant::now();
    let analysis = train(prepared, settings)?;
    info!("Training completed in {:.2}s", train_start.elapsed().as_secs_f64());

    // Phase 4: Export
    let export_start = Instant::now();
    export::write_all(&analysis, settings)?;
    info!("Export completed in {:.2}s", export_start.elapsed().as_secs_f64());

    info!("Total pipeline time: {:.2}s", pipeline_start.elapsed().as_secs_f64());

    Ok(PipelineResult {
        songs: analysis.data.songs.len(),
        hits: analysis.data.cleaning.hits,
        models_trained: analysis.models_trained(),
        models_failed: analysis.models_failed(),
    })
}

/// Clean, summarise and scale loaded records
pub fn prepare(records: &[RawRecord]) -> PreparedData {
    let cleaned = cleaning::clean(records);
    let years = cleaning::yearly_summary(&cleaned.songs);
    let scaler = FeatureScaler::fit(&cleaned.songs);
    let dataset = Dataset::from_scaled(&scaler.transform(&cleaned.songs));

    PreparedData {
        songs: cleaned.songs,
        cleaning: cleaned.report,
        years,
        scaler,
        dataset,
    }
}

/// Load-free pipeline core: prepare, then train and evaluate both models
pub fn analyze(records: &[RawRecord], settings: &Settings) -> Result<Analysis> {
    settings.validate()?;
    train(prepare(records), settings)
}

/// Cross-validate both models on one shared fold plan
pub fn train(data: PreparedData, settings: &Settings) -> Result<Analysis> {
    let plan = match FoldPlan::new(data.dataset.len(), settings.folds, settings.seed) {
        Ok(plan) => plan,
        Err(e) if e.is_recoverable() => {
            warn!("Skipping model training: {}", e);
            let reason = e.to_string();
            return Ok(Analysis {
                data,
                logistic: ModelOutcome::Failed { reason: reason.clone() },
                forest: ModelOutcome::Failed { reason },
            });
        }
        Err(e) => return Err(e),
    };

    let (hits, nohits) = data.dataset.class_counts(&(0..data.dataset.len()).collect::<Vec<_>>());
    info!(
        "Training on {} songs ({} Hit / {} NoHit), {} folds",
        data.dataset.len(),
        hits,
        nohits,
        plan.k()
    );

    let jobs = plan.k() * (1 + settings.forest_grid.len());
    let progress = create_progress_bar(jobs as u64, settings.show_progress);

    if let Some(pb) = &progress {
        pb.set_message("logistic");
    }
    let logistic = evaluate_model(
        "logistic",
        model::train_logistic(&data.dataset, &plan, progress.as_ref()),
        |r| &r.cv,
        &data.dataset,
    )?;

    if let Some(pb) = &progress {
        pb.set_message("random forest");
    }
    let forest = evaluate_model(
        "random_forest",
        model::train_forest(
            &data.dataset,
            &plan,
            &settings.forest_grid,
            settings.seed,
            progress.as_ref(),
        ),
        |r| &r.cv,
        &data.dataset,
    )?;

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    Ok(Analysis {
        data,
        logistic,
        forest,
    })
}

/// Turn a training result into an outcome, building the out-of-fold curve.
/// Fatal errors propagate.
fn evaluate_model<T>(
    name: &str,
    trained: Result<T>,
    cv: impl Fn(&T) -> &CvOutcome,
    data: &Dataset,
) -> Result<ModelOutcome<T>> {
    let outcome = trained.and_then(|report| {
        let roc = roc_curve(data.labels(), &cv(&report).predictions)?;
        Ok((report, roc))
    });

    match outcome {
        Ok((report, roc)) => {
            info!("{}: out-of-fold AUC {:.4}", name, roc.auc);
            Ok(ModelOutcome::Trained { report, roc })
        }
        Err(e) if e.is_recoverable() => {
            warn!("{} failed, continuing without it: {}", name, e);
            Ok(ModelOutcome::Failed { reason: e.to_string() })
        }
        Err(e) => Err(e),
    }
}

fn create_progress_bar(len: u64, show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} folds ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    Some(pb)
}

/// Dry run mode - show dataset diagnostics without fitting
fn print_dry_run(data: &PreparedData, settings: &Settings) {
    let report = &data.cleaning;

    println!();
    println!("=== DRY RUN MODE ===");
    println!();
    println!("Records loaded:        {}", report.input_records);
    println!("Incomplete (dropped):  {}", report.incomplete_dropped);
    println!("Unique songs:          {}", report.unique_songs);
    println!("Implausible (dropped): {}", report.implausible_dropped);
    println!("Songs retained:        {} ({} Hit)", report.retained, report.hits);
    println!();

    if let (Some(first), Some(last)) = (data.years.first(), data.years.last()) {
        println!("Chart years {}-{} ({} distinct)", first.year, last.year, data.years.len());
    }

    let degenerate = data.scaler.degenerate();
    if !degenerate.is_empty() {
        let names: Vec<&str> = degenerate.iter().map(|f| f.name()).collect();
        println!("Constant features (scaled to 0): {}", names.join(", "));
    }

    println!("─────────────────────────────────────────");
    println!();
    println!(
        "Would cross-validate logistic + {} forest configurations over {} folds",
        settings.forest_grid.len(),
        settings.folds
    );
    println!("Output directory: {}", settings.output.display());
}

/// Configure the global rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // Already initialised (tests, library callers) is fine
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(HitlabError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}
