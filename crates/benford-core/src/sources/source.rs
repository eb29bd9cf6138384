use serde::{Deserialize, Serialize};

use crate::benford::analysis::BenfordAnalysisInput;
use crate::benford::combined::BenfordTestConfig;
use crate::sources::midi::{frequencies_from_events, NoteEvent};
use crate::BenfordResult;

/// Where a sample comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SampleSource {
    /// Numbers supplied directly, e.g. dominant frequencies from an audio
    /// front end.
    Values { values: Vec<f64> },
    /// Decoded MIDI note events.
    MidiEvents { events: Vec<NoteEvent> },
}

impl SampleSource {
    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SampleSource::Values { .. } => "values",
            SampleSource::MidiEvents { .. } => "midi",
        }
    }

    /// Resolve into a sample. Decode errors are returned unchanged.
    pub fn into_sample(self) -> BenfordResult<Vec<f64>> {
        match self {
            SampleSource::Values { values } => Ok(values),
            SampleSource::MidiEvents { events } => frequencies_from_events(&events),
        }
    }
}

/// Analysis request naming a sample source rather than a raw sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub label: Option<String>,
    pub source: SampleSource,
    #[serde(flatten)]
    pub config: BenfordTestConfig,
}

impl AnalysisRequest {
    pub fn into_analysis_input(self) -> BenfordResult<BenfordAnalysisInput> {
        Ok(BenfordAnalysisInput {
            label: self.label,
            sample: self.source.into_sample()?,
            config: self.config,
        })
    }
}
