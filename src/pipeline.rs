use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::config::EtlConfig;
use crate::error::Result;
use crate::extract::extract_regions;
use crate::load::{load_sales, LoadOutcome};
use crate::transform::{transform, TransformSummary};
use crate::validate::{run_validation, ValidationReport};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub region_a_rows: usize,
    pub region_b_rows: usize,
    pub transform: TransformSummary,
    pub load: LoadOutcome,
    /// `None` when validation could not run to completion
    pub validation: Option<ValidationReport>,
    pub database: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Pipeline {
    config: EtlConfig,
}

impl Pipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    /// Extract, transform, load and validate, in that order.
    ///
    /// Only extraction errors are returned; they abort the run before the table is
    /// touched. Load and validation failures are reported inside the result.
    #[instrument(skip(self), fields(database = %self.config.database.path.display()))]
    pub fn run(&self) -> Result<PipelineResult> {
        let started_at = Utc::now();
        info!("🚀 Starting sales ETL run");

        // Step 1: Extract
        let (region_a, region_b) =
            extract_regions(&self.config.sources.region_a, &self.config.sources.region_b)?;
        let region_a_rows = region_a.len();
        let region_b_rows = region_b.len();

        // Step 2: Transform
        let (rows, summary) = transform(region_a, region_b);

        // Step 3: Load
        println!("\n💾 Loading {} rows...", rows.len());
        let database = self.config.database.path.clone();
        let load = load_sales(&database, &rows);

        // Step 4: Validate, even after a failed load
        println!("\n🔎 Validating {}...", database.display());
        let validation = run_validation(&database);

        let finished_at = Utc::now();
        info!(
            loaded = load.is_loaded(),
            validated = validation.is_some(),
            "✅ Sales ETL run finished in {} ms",
            (finished_at - started_at).num_milliseconds()
        );

        Ok(PipelineResult {
            region_a_rows,
            region_b_rows,
            transform: summary,
            load,
            validation,
            database,
            started_at,
            finished_at,
        })
    }

    /// Run only the validation queries against the configured database.
    pub fn validate_only(&self) -> Option<ValidationReport> {
        run_validation(&self.config.database.path)
    }
}
