//! Run state threaded through the pipeline.
//!
//! The website is fixed at creation. Every other field moves from absent to
//! present exactly once, in pipeline order, and is never cleared. The
//! recording methods enforce that; the phase of the run is derived from
//! which fields are present.

use serde::Serialize;
use std::fmt;

use crate::error::StateError;
use crate::pipeline::Stage;

/// Phases of a run, following the linear stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelinePhase {
    /// Nothing recorded yet
    #[default]
    Start,
    /// Website analysis recorded
    Analyzed,
    /// Competitor list recorded
    CompetitorsFound,
    /// Competitor research recorded
    Researched,
    /// Final report recorded
    ReportWritten,
}

impl PipelinePhase {
    /// Get the next phase
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Analyzed),
            Self::Analyzed => Some(Self::CompetitorsFound),
            Self::CompetitorsFound => Some(Self::Researched),
            Self::Researched => Some(Self::ReportWritten),
            Self::ReportWritten => None,
        }
    }

    /// Check if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReportWritten)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Analyzed => "analyzed",
            Self::CompetitorsFound => "competitors_found",
            Self::Researched => "researched",
            Self::ReportWritten => "report_written",
        };
        f.write_str(name)
    }
}

/// State of one pipeline invocation.
///
/// Serialize-only: a state can be reported but never rebuilt from outside,
/// so the recording methods stay the only way to populate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    website: String,
    analysis: Option<String>,
    competitors: Option<Vec<String>>,
    research: Option<String>,
    report: Option<String>,
}

impl RunState {
    /// Create a fresh state for a website
    pub fn new(website: impl Into<String>) -> Self {
        Self {
            website: website.into(),
            analysis: None,
            competitors: None,
            research: None,
            report: None,
        }
    }

    pub fn website(&self) -> &str {
        &self.website
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn competitors(&self) -> Option<&[String]> {
        self.competitors.as_deref()
    }

    pub fn research(&self) -> Option<&str> {
        self.research.as_deref()
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Check that `stage` may record its output now: its own field must be
    /// absent and the field of the stage it listens to must be present.
    pub fn check_ready(&self, stage: Stage) -> Result<(), StateError> {
        if self.is_recorded(stage) {
            return Err(StateError::AlreadySet {
                field: stage.field(),
            });
        }
        match stage.trigger() {
            Some(previous) if !self.is_recorded(previous) => Err(StateError::OutOfOrder {
                field: stage.field(),
                missing: previous.field(),
            }),
            _ => Ok(()),
        }
    }

    /// Record the website analysis
    pub fn record_analysis(&mut self, analysis: String) -> Result<(), StateError> {
        self.check_ready(Stage::Analyze)?;
        self.analysis = Some(analysis);
        Ok(())
    }

    /// Record the competitor list
    pub fn record_competitors(&mut self, competitors: Vec<String>) -> Result<(), StateError> {
        self.check_ready(Stage::FindCompetitors)?;
        self.competitors = Some(competitors);
        Ok(())
    }

    /// Record the competitor research
    pub fn record_research(&mut self, research: String) -> Result<(), StateError> {
        self.check_ready(Stage::ResearchCompetitors)?;
        self.research = Some(research);
        Ok(())
    }

    /// Record the final report
    pub fn record_report(&mut self, report: String) -> Result<(), StateError> {
        self.check_ready(Stage::WriteReport)?;
        self.report = Some(report);
        Ok(())
    }

    /// Current phase, derived from the recorded fields.
    ///
    /// The recording methods keep fields populated as a prefix of the stage
    /// order, so the furthest populated field decides the phase.
    pub fn phase(&self) -> PipelinePhase {
        if self.report.is_some() {
            PipelinePhase::ReportWritten
        } else if self.research.is_some() {
            PipelinePhase::Researched
        } else if self.competitors.is_some() {
            PipelinePhase::CompetitorsFound
        } else if self.analysis.is_some() {
            PipelinePhase::Analyzed
        } else {
            PipelinePhase::Start
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Stages whose output has been recorded, in pipeline order
    pub fn completed_stages(&self) -> Vec<Stage> {
        Stage::ORDER
            .iter()
            .copied()
            .filter(|stage| self.is_recorded(*stage))
            .collect()
    }

    /// Whether the output of `stage` is present
    pub fn is_recorded(&self, stage: Stage) -> bool {
        match stage {
            Stage::Analyze => self.analysis.is_some(),
            Stage::FindCompetitors => self.competitors.is_some(),
            Stage::ResearchCompetitors => self.research.is_some(),
            Stage::WriteReport => self.report.is_some(),
        }
    }
}
