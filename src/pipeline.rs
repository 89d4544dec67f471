//! The four-stage analysis pipeline.
//!
//! ```text
//! analyze ──▶ find_competitors ──▶ research_competitors ──▶ write_report
//! ```
//!
//! Each stage listens to the previous one and starts only after it has
//! returned. Every stage receives `{website}` as its input mapping; the
//! previous stage's output is handed to the next stage method but only gates
//! timing. A failing stage stops the run; whatever was recorded before it
//! stays in the run state.

use std::fmt;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::error::PipelineError;
use crate::executor::{run_stage, ExecutionMode, StageExecutor, StageInputs, StageOutput};
use crate::roster::Roster;
use crate::state::{PipelinePhase, RunState};

/// One step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Analyze,
    FindCompetitors,
    ResearchCompetitors,
    WriteReport,
}

impl Stage {
    /// Execution order
    pub const ORDER: [Stage; 4] = [
        Stage::Analyze,
        Stage::FindCompetitors,
        Stage::ResearchCompetitors,
        Stage::WriteReport,
    ];

    /// The stage whose completion triggers this one (`None` for the start stage)
    pub fn trigger(&self) -> Option<Stage> {
        match self {
            Self::Analyze => None,
            Self::FindCompetitors => Some(Self::Analyze),
            Self::ResearchCompetitors => Some(Self::FindCompetitors),
            Self::WriteReport => Some(Self::ResearchCompetitors),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Analyze => "run_analysis",
            Self::FindCompetitors => "find_competitors",
            Self::ResearchCompetitors => "research_competitors",
            Self::WriteReport => "write_report",
        }
    }

    /// Run state field this stage fills
    pub fn field(&self) -> &'static str {
        match self {
            Self::Analyze => "analysis",
            Self::FindCompetitors => "competitors",
            Self::ResearchCompetitors => "research",
            Self::WriteReport => "report",
        }
    }

    /// Phase reached once this stage has completed
    pub fn completes(&self) -> PipelinePhase {
        match self {
            Self::Analyze => PipelinePhase::Analyzed,
            Self::FindCompetitors => PipelinePhase::CompetitorsFound,
            Self::ResearchCompetitors => PipelinePhase::Researched,
            Self::WriteReport => PipelinePhase::ReportWritten,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives one run over a website.
///
/// Owns the executor, the agent/task roster and the run state. The state is
/// only ever written here.
pub struct SeoPipeline<E> {
    executor: E,
    roster: Roster,
    mode: ExecutionMode,
    state: RunState,
}

impl<E: StageExecutor> SeoPipeline<E> {
    pub fn new(executor: E, website: impl Into<String>) -> Self {
        Self {
            executor,
            roster: Roster::default(),
            mode: ExecutionMode::Sequential,
            state: RunState::new(website),
        }
    }

    /// Use a custom agent/task roster
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Run all four stages in order and return the report.
    pub async fn kickoff(&mut self) -> Result<String, PipelineError> {
        let phase = self.state.phase();
        if phase != PipelinePhase::Start {
            return Err(PipelineError::AlreadyStarted { phase });
        }

        info!(website = %self.state.website(), "Starting SEO analysis pipeline");
        let started = Instant::now();

        let analysis = self.run_analysis().await?;
        let competitors = self.find_competitors(&analysis).await?;
        let research = self.research_competitors(&competitors).await?;
        let report = self.write_report(&research).await?;

        info!(
            website = %self.state.website(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline finished"
        );
        Ok(report)
    }

    /// Start stage: analyze the website.
    pub async fn run_analysis(&mut self) -> Result<String, PipelineError> {
        let analysis = self.execute(Stage::Analyze).await?.into_text();
        self.state.record_analysis(analysis.clone())?;
        Ok(analysis)
    }

    /// Find competitors. A scalar result is wrapped into a one-element list.
    pub async fn find_competitors(
        &mut self,
        _analysis: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let competitors = self.execute(Stage::FindCompetitors).await?.into_list();
        info!(count = competitors.len(), "Competitors found");
        self.state.record_competitors(competitors.clone())?;
        Ok(competitors)
    }

    /// Research the competitors found in the previous stage.
    pub async fn research_competitors(
        &mut self,
        _competitors: &[String],
    ) -> Result<String, PipelineError> {
        let research = self.execute(Stage::ResearchCompetitors).await?.into_text();
        self.state.record_research(research.clone())?;
        Ok(research)
    }

    /// Terminal stage: write the final report.
    pub async fn write_report(&mut self, _research: &str) -> Result<String, PipelineError> {
        let report = self.execute(Stage::WriteReport).await?.into_text();
        self.state.record_report(report.clone())?;
        Ok(report)
    }

    async fn execute(&self, stage: Stage) -> Result<StageOutput, PipelineError> {
        // Refuse before paying for a model call whose result could not be recorded.
        self.state.check_ready(stage)?;

        let (agent, task) = self.roster.get(stage);
        let inputs = StageInputs::for_website(self.state.website());
        let started = Instant::now();

        let result = run_stage(&self.executor, agent, task, self.mode, &inputs)
            .instrument(info_span!("stage", stage = %stage, agent = %agent.name))
            .await;

        match result {
            Ok(output) => {
                info!(
                    stage = %stage,
                    phase = %stage.completes(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                Ok(output)
            }
            Err(source) => {
                warn!(stage = %stage, error = %source, "Stage failed");
                Err(PipelineError::Stage { stage, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, StateError};
    use crate::roster::{AgentProfile, TaskSpec};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns the task name and records which tasks ran
    struct RecordingExecutor {
        seen: Mutex<Vec<(String, StageInputs)>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StageExecutor for RecordingExecutor {
        async fn execute(
            &self,
            _agent: &AgentProfile,
            task: &TaskSpec,
            _mode: ExecutionMode,
            inputs: &StageInputs,
        ) -> Result<StageOutput, ExecutionError> {
            self.seen
                .lock()
                .unwrap()
                .push((task.name.clone(), inputs.clone()));
            Ok(StageOutput::Text(format!("{} done", task.name)))
        }
    }

    // Stages are named through `Display` only.
    static_assertions::assert_not_impl_any!(Stage: serde::Serialize, serde::de::DeserializeOwned);

    #[test]
    fn test_stage_display_uses_method_names() {
        let names: Vec<String> = Stage::ORDER.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["run_analysis", "find_competitors", "research_competitors", "write_report"]
        );
    }

    #[test]
    fn test_stage_triggers_form_a_chain() {
        assert_eq!(Stage::Analyze.trigger(), None);
        for pair in Stage::ORDER.windows(2) {
            assert_eq!(pair[1].trigger(), Some(pair[0]));
        }
    }

    #[test]
    fn test_stage_completes_matches_phase_order() {
        let mut phase = PipelinePhase::Start;
        for stage in Stage::ORDER {
            phase = phase.next().unwrap();
            assert_eq!(stage.completes(), phase);
        }
    }

    #[tokio::test]
    async fn test_kickoff_runs_stages_in_order_with_website_input() {
        let mut pipeline = SeoPipeline::new(RecordingExecutor::new(), "example.com");

        let report = pipeline.kickoff().await.unwrap();
        assert_eq!(report, "writing_task done");

        let seen = pipeline.executor.seen.lock().unwrap().clone();
        let names: Vec<&str> = seen.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "analysis_task",
                "competitor_finding_task",
                "competitor_researching_task",
                "writing_task",
            ]
        );
        for (_, inputs) in &seen {
            assert_eq!(inputs, &StageInputs::for_website("example.com"));
        }
    }

    #[tokio::test]
    async fn test_kickoff_twice_is_rejected() {
        let mut pipeline = SeoPipeline::new(RecordingExecutor::new(), "example.com");
        pipeline.kickoff().await.unwrap();

        let err = pipeline.kickoff().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AlreadyStarted {
                phase: PipelinePhase::ReportWritten
            }
        ));
    }

    #[tokio::test]
    async fn test_stage_out_of_order_does_not_call_executor() {
        let mut pipeline = SeoPipeline::new(RecordingExecutor::new(), "example.com");

        let err = pipeline.write_report("nothing").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::State(StateError::OutOfOrder {
                field: "report",
                missing: "research",
            })
        ));
        assert!(pipeline.executor.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stages_can_be_driven_one_by_one() {
        let mut pipeline = SeoPipeline::new(RecordingExecutor::new(), "example.com");

        let analysis = pipeline.run_analysis().await.unwrap();
        assert_eq!(pipeline.state().phase(), PipelinePhase::Analyzed);

        let competitors = pipeline.find_competitors(&analysis).await.unwrap();
        assert_eq!(competitors, vec!["competitor_finding_task done".to_string()]);
        assert_eq!(pipeline.state().phase(), PipelinePhase::CompetitorsFound);
    }
}
