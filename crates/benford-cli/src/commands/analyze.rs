use clap::Args;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use benford_core::benford::analysis::{
    analyze_sample_with_progress, sample_discrepancy_metrics, BenfordAnalysisOutput,
};
use benford_core::benford::combined::BenfordTestConfig;
use benford_core::sources::source::{AnalysisRequest, SampleSource};
use benford_core::ComputationOutput;

use crate::input;

/// Overrides applied on top of the configuration found in the input.
#[derive(Args, Clone)]
pub struct TestOverrides {
    /// Number of Monte Carlo trials
    #[arg(long)]
    pub trials: Option<u32>,
    /// Seed for the Monte Carlo trials
    #[arg(long)]
    pub seed: Option<u64>,
    /// Significance level for the conformity verdict
    #[arg(long)]
    pub significance_level: Option<f64>,
    /// Report Monte Carlo progress on stderr
    #[arg(long)]
    pub progress: bool,
}

impl TestOverrides {
    fn apply(&self, config: &mut BenfordTestConfig) {
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(level) = self.significance_level {
            config.significance_level = level;
        }
    }
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON request file
    #[arg(long, conflicts_with = "values")]
    pub input: Option<String>,
    /// Path to a plain list of numbers, comma or newline separated
    #[arg(long)]
    pub values: Option<String>,
    #[command(flatten)]
    pub overrides: TestOverrides,
}

#[derive(Args)]
pub struct MetricsArgs {
    /// Path to JSON request file
    #[arg(long, conflicts_with = "values")]
    pub input: Option<String>,
    /// Path to a plain list of numbers
    #[arg(long)]
    pub values: Option<String>,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Input files: `.json` requests or plain number lists
    #[arg(required = true)]
    pub files: Vec<String>,
    #[command(flatten)]
    pub overrides: TestOverrides,
}

/// One line of a batch report.
#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub filename: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub delta: Option<f64>,
    pub ned: Option<f64>,
    pub mad: Option<f64>,
    pub z_stat: Option<f64>,
    pub pearson: Option<f64>,
    pub fisher_stat: Option<f64>,
    pub p_value: Option<f64>,
    pub is_benford: Option<bool>,
    pub observed_counts: Vec<u64>,
    pub error: Option<String>,
}

impl ReportRow {
    fn failed(filename: String, source_type: String, error: String) -> Self {
        Self {
            filename,
            source_type,
            delta: None,
            ned: None,
            mad: None,
            z_stat: None,
            pearson: None,
            fisher_stat: None,
            p_value: None,
            is_benford: None,
            observed_counts: Vec::new(),
            error: Some(error),
        }
    }

    fn from_output(filename: String, source_type: String, out: &BenfordAnalysisOutput) -> Self {
        let test = out.test.as_ref();
        Self {
            filename,
            source_type,
            delta: Some(out.metrics.delta),
            ned: Some(out.metrics.ned),
            mad: Some(out.metrics.mad),
            z_stat: Some(out.metrics.z_stat),
            pearson: out.metrics.pearson,
            fisher_stat: test.map(|t| t.combined_stat),
            p_value: test.map(|t| t.combined_p),
            is_benford: test.map(|t| t.conforms),
            observed_counts: out.digits.iter().map(|d| d.observed_count).collect(),
            error: None,
        }
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn values_request(path: &str) -> Result<AnalysisRequest, Box<dyn std::error::Error>> {
    Ok(AnalysisRequest {
        label: Some(file_name(path)),
        source: SampleSource::Values {
            values: input::file::read_values(path)?,
        },
        config: BenfordTestConfig::default(),
    })
}

fn json_request(path: &str) -> Result<AnalysisRequest, Box<dyn std::error::Error>> {
    let mut request: AnalysisRequest = input::file::read_json(path)?;
    if request.label.is_none() {
        request.label = Some(file_name(path));
    }
    Ok(request)
}

fn load_request(
    json_path: Option<&str>,
    values_path: Option<&str>,
) -> Result<AnalysisRequest, Box<dyn std::error::Error>> {
    if let Some(path) = values_path {
        values_request(path)
    } else if let Some(path) = json_path {
        json_request(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        if data.starts_with('{') {
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(AnalysisRequest {
                label: Some("stdin".into()),
                source: SampleSource::Values {
                    values: input::file::parse_values(&data)?,
                },
                config: BenfordTestConfig::default(),
            })
        }
    } else {
        Err("--input <file.json>, --values <file> or stdin required".into())
    }
}

fn analyze_request(
    request: AnalysisRequest,
    overrides: &TestOverrides,
) -> Result<ComputationOutput<BenfordAnalysisOutput>, Box<dyn std::error::Error>> {
    let mut analysis_input = request.into_analysis_input()?;
    overrides.apply(&mut analysis_input.config);

    let report = |done: usize, total: usize| {
        eprint!("\r{} {done}/{total}", "simulating".dimmed());
        if done == total {
            eprintln!();
        }
    };
    let progress: Option<&dyn Fn(usize, usize)> = if overrides.progress {
        Some(&report)
    } else {
        None
    };
    Ok(analyze_sample_with_progress(&analysis_input, progress)?)
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = load_request(args.input.as_deref(), args.values.as_deref())?;
    let result = analyze_request(request, &args.overrides)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = load_request(args.input.as_deref(), args.values.as_deref())?;
    let sample = request.source.into_sample()?;
    let result = sample_discrepancy_metrics(&sample)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_batch(args: BatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut rows = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let filename = file_name(path);
        let request = if path.to_ascii_lowercase().ends_with(".json") {
            json_request(path)
        } else {
            values_request(path)
        };
        let request = match request {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{}: {}: {}", "skipped".yellow().bold(), filename, e);
                rows.push(ReportRow::failed(filename, "unknown".into(), e.to_string()));
                continue;
            }
        };
        let source_type = request.source.kind().to_string();
        match analyze_request(request, &args.overrides) {
            Ok(out) => rows.push(ReportRow::from_output(filename, source_type, &out.result)),
            Err(e) => {
                eprintln!("{}: {}: {}", "failed".yellow().bold(), filename, e);
                rows.push(ReportRow::failed(filename, source_type, e.to_string()));
            }
        }
    }
    Ok(serde_json::to_value(rows)?)
}
