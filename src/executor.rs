//! Stage execution.
//!
//! `StageExecutor` is the only seam between the pipeline and the LLM
//! backend: one agent, one task, one input mapping in, one result out.
//! `RigExecutor` implements it on top of Rig's Ollama provider; tests use
//! scripted stubs instead.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ExecutionError;
use crate::roster::{AgentProfile, OutputShape, TaskSpec};
use crate::tools::WebSearchTool;

/// How agent/task pairs are scheduled within one execution.
///
/// Only sequential execution exists: exactly one pair runs per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Named inputs handed to a stage, substituted into task placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInputs(BTreeMap<String, String>);

impl StageInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `{website}` mapping every stage receives
    pub fn for_website(website: impl Into<String>) -> Self {
        Self::new().with("website", website)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Result of one agent execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Text(String),
    List(Vec<String>),
}

impl StageOutput {
    /// Textual form; list items are joined line by line
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::List(items) => items.join("\n"),
        }
    }

    /// List form; a scalar becomes a one-element list
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::List(items) => items,
        }
    }
}

impl From<&str> for StageOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for StageOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for StageOutput {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Executes one agent against one task.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(
        &self,
        agent: &AgentProfile,
        task: &TaskSpec,
        mode: ExecutionMode,
        inputs: &StageInputs,
    ) -> Result<StageOutput, ExecutionError>;
}

#[async_trait]
impl<E: StageExecutor + ?Sized> StageExecutor for Box<E> {
    async fn execute(
        &self,
        agent: &AgentProfile,
        task: &TaskSpec,
        mode: ExecutionMode,
        inputs: &StageInputs,
    ) -> Result<StageOutput, ExecutionError> {
        (**self).execute(agent, task, mode, inputs).await
    }
}

#[async_trait]
impl<E: StageExecutor + ?Sized> StageExecutor for &E {
    async fn execute(
        &self,
        agent: &AgentProfile,
        task: &TaskSpec,
        mode: ExecutionMode,
        inputs: &StageInputs,
    ) -> Result<StageOutput, ExecutionError> {
        (**self).execute(agent, task, mode, inputs).await
    }
}

/// Run one stage. Errors from the executor come back unchanged.
pub async fn run_stage<E: StageExecutor + ?Sized>(
    executor: &E,
    agent: &AgentProfile,
    task: &TaskSpec,
    mode: ExecutionMode,
    inputs: &StageInputs,
) -> Result<StageOutput, ExecutionError> {
    debug!(agent = %agent.name, task = %task.name, mode = %mode, "Executing stage");
    executor.execute(agent, task, mode, inputs).await
}

/// Executor backed by Rig agents on an Ollama server.
pub struct RigExecutor {
    config: Config,
    search_tool: WebSearchTool,
}

impl RigExecutor {
    pub fn new(config: Config) -> Self {
        let search_tool = WebSearchTool::new(config.max_search_results);
        Self {
            config,
            search_tool,
        }
    }

    async fn prompt_agent(
        &self,
        agent: &AgentProfile,
        task: &TaskSpec,
        inputs: &StageInputs,
    ) -> Result<String, ExecutionError> {
        // Rig's Ollama client reads its base URL from the environment.
        std::env::set_var("OLLAMA_API_BASE_URL", &self.config.ollama_host);
        let client = ollama::Client::from_env();

        let preamble = agent.preamble(inputs);
        let prompt = task.prompt(inputs);
        let temperature = f64::from(self.config.temperature);

        debug!(
            model = %self.config.model,
            agent = %agent.name,
            web_search = agent.uses_web_search,
            "Building agent"
        );

        let response = if agent.uses_web_search {
            client
                .agent(&self.config.model)
                .preamble(&preamble)
                .temperature(temperature)
                .tool(self.search_tool.clone())
                .build()
                .prompt(&prompt)
                .multi_turn(self.config.max_turns)
                .await
        } else {
            client
                .agent(&self.config.model)
                .preamble(&preamble)
                .temperature(temperature)
                .build()
                .prompt(&prompt)
                .await
        };

        response.map_err(|e| ExecutionError::Model(e.to_string()))
    }
}

#[async_trait]
impl StageExecutor for RigExecutor {
    async fn execute(
        &self,
        agent: &AgentProfile,
        task: &TaskSpec,
        mode: ExecutionMode,
        inputs: &StageInputs,
    ) -> Result<StageOutput, ExecutionError> {
        info!(agent = %agent.name, task = %task.name, mode = %mode, "Running agent");

        let response = self.prompt_agent(agent, task, inputs).await?;

        Ok(match task.output_shape {
            OutputShape::Text => StageOutput::Text(response),
            OutputShape::List => parse_list_output(&response),
        })
    }
}

/// Parse a model response that should contain a JSON array of strings.
///
/// Each `[` is tried in turn and the first string array that parses wins,
/// so prose, code fences, citations like `[1]` and markdown links around
/// the array are tolerated. Anything unparseable comes back as trimmed text.
pub fn parse_list_output(response: &str) -> StageOutput {
    let parsed = response.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&response[start..])
            .into_iter::<Vec<String>>()
            .next()
            .and_then(Result::ok)
    });

    match parsed {
        Some(items) => StageOutput::List(
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ),
        None => StageOutput::Text(response.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StageExecutor for EchoExecutor {
        async fn execute(
            &self,
            _agent: &AgentProfile,
            task: &TaskSpec,
            _mode: ExecutionMode,
            inputs: &StageInputs,
        ) -> Result<StageOutput, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StageOutput::Text(task.render(inputs)))
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl StageExecutor for FailingExecutor {
        async fn execute(
            &self,
            _agent: &AgentProfile,
            _task: &TaskSpec,
            _mode: ExecutionMode,
            _inputs: &StageInputs,
        ) -> Result<StageOutput, ExecutionError> {
            Err(ExecutionError::Model("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_run_stage_passes_through_result() {
        let executor = EchoExecutor {
            calls: AtomicUsize::new(0),
        };
        let output = run_stage(
            &executor,
            &AgentProfile::website_analyst(),
            &TaskSpec::new("t", "Look at {website}", "text"),
            ExecutionMode::Sequential,
            &StageInputs::for_website("example.com"),
        )
        .await
        .unwrap();

        assert_eq!(output, StageOutput::Text("Look at example.com".to_string()));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stage_propagates_error_unchanged() {
        let result = run_stage(
            &FailingExecutor,
            &AgentProfile::report_writer(),
            &TaskSpec::report_writing(),
            ExecutionMode::Sequential,
            &StageInputs::for_website("example.com"),
        )
        .await;

        assert_eq!(
            result,
            Err(ExecutionError::Model("model unavailable".to_string()))
        );
    }

    #[tokio::test]
    async fn test_boxed_executor_delegates() {
        let executor: Box<dyn StageExecutor> = Box::new(FailingExecutor);
        let result = run_stage(
            &executor,
            &AgentProfile::report_writer(),
            &TaskSpec::report_writing(),
            ExecutionMode::default(),
            &StageInputs::for_website("example.com"),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_into_list_wraps_scalar() {
        let output = StageOutput::from("only-rival.com");
        assert_eq!(output.into_list(), vec!["only-rival.com".to_string()]);
    }

    #[test]
    fn test_into_list_keeps_list() {
        let items = vec!["a.com".to_string(), "b.com".to_string()];
        assert_eq!(StageOutput::from(items.clone()).into_list(), items);
    }

    #[test]
    fn test_into_text_joins_list() {
        let output = StageOutput::List(vec!["a".into(), "b".into()]);
        assert_eq!(output.into_text(), "a\nb");
    }

    #[test]
    fn test_parse_list_output_with_prose() {
        let response = "Here are the competitors:\n```json\n[\"rival-a.com\", \" rival-b.com \"]\n```";
        assert_eq!(
            parse_list_output(response),
            StageOutput::List(vec!["rival-a.com".into(), "rival-b.com".into()])
        );
    }

    #[test]
    fn test_parse_list_output_ignores_trailing_citation() {
        let response = "Competitors:\n[\"rival-a.com\", \"rival-b.com\"]\nSource: [1] search results";
        assert_eq!(
            parse_list_output(response),
            StageOutput::List(vec!["rival-a.com".into(), "rival-b.com".into()])
        );
    }

    #[test]
    fn test_parse_list_output_skips_markdown_links() {
        let response = "Based on [DuckDuckGo](https://duckduckgo.com) results:\n\
                        [\"rival-a.com\"]\nSee [rival-a](https://rival-a.com).";
        assert_eq!(
            parse_list_output(response),
            StageOutput::List(vec!["rival-a.com".into()])
        );
    }

    #[test]
    fn test_parse_list_output_falls_back_to_text() {
        assert_eq!(
            parse_list_output("  rival-a.com and rival-b.com  "),
            StageOutput::Text("rival-a.com and rival-b.com".into())
        );
        assert_eq!(
            parse_list_output("[not json]"),
            StageOutput::Text("[not json]".into())
        );
    }

    #[test]
    fn test_stage_inputs_for_website() {
        let inputs = StageInputs::for_website("example.com");
        assert_eq!(inputs.get("website"), Some("example.com"));
        assert_eq!(inputs.iter().count(), 1);
    }

    #[test]
    fn test_execution_mode_display() {
        assert_eq!(ExecutionMode::Sequential.to_string(), "sequential");
    }
}
