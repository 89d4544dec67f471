//! Agent and task definitions for each stage.
//!
//! An `AgentProfile` describes who does the work (role, goal, backstory),
//! a `TaskSpec` describes the work itself and the shape of its result.
//! Both are plain configuration: the executor decides how to turn them into
//! a model call.

use std::collections::HashMap;

use crate::executor::StageInputs;
use crate::pipeline::Stage;

/// Role/goal bundle for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Whether the agent gets the web search tool
    pub uses_web_search: bool,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            uses_web_search: false,
        }
    }

    pub fn with_web_search(mut self) -> Self {
        self.uses_web_search = true;
        self
    }

    /// System prompt for this agent, with placeholders filled from `inputs`
    pub fn preamble(&self, inputs: &StageInputs) -> String {
        let template = format!(
            "You are a {}.\n\n## Goal\n{}\n\n## Background\n{}",
            self.role, self.goal, self.backstory
        );
        interpolate(&template, inputs)
    }

    pub fn website_analyst() -> Self {
        Self::new(
            "website_analyst",
            "Senior SEO Website Analyst",
            "Audit {website} and describe its positioning, target audience, main keywords \
             and technical SEO strengths and weaknesses.",
            "You have audited hundreds of sites for organic search performance and know \
             how to read a site's structure, content and metadata quickly.",
        )
        .with_web_search()
    }

    pub fn competitor_analyst() -> Self {
        Self::new(
            "competitor_analyst",
            "Competitive Intelligence Analyst",
            "Identify the websites that compete with {website} for the same audience and \
             search keywords.",
            "You map search landscapes for a living and can tell a real competitor from \
             a site that merely shares a keyword.",
        )
        .with_web_search()
    }

    pub fn competitor_researcher() -> Self {
        Self::new(
            "competitor_researcher",
            "Competitor Research Specialist",
            "Research the competitors of {website} and compare their content, keywords \
             and search visibility.",
            "You dig into competing sites to find what they do better and where they \
             leave openings.",
        )
        .with_web_search()
    }

    pub fn report_writer() -> Self {
        Self::new(
            "report_writer",
            "SEO Report Writer",
            "Write a clear, actionable SEO report for {website}.",
            "You turn analyst notes into reports that marketing teams can act on the \
             same week.",
        )
    }
}

/// Expected shape of a task result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    #[default]
    Text,
    /// An ordered list of strings
    List,
}

/// Description of one unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub output_shape: OutputShape,
}

impl TaskSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            output_shape: OutputShape::Text,
        }
    }

    pub fn with_output_shape(mut self, shape: OutputShape) -> Self {
        self.output_shape = shape;
        self
    }

    /// Substitute `{key}` placeholders in the description from `inputs`.
    /// Placeholders without a matching input are left as they are.
    pub fn render(&self, inputs: &StageInputs) -> String {
        interpolate(&self.description, inputs)
    }

    /// Full user prompt: rendered description plus the expected output.
    pub fn prompt(&self, inputs: &StageInputs) -> String {
        let mut prompt = format!(
            "{}\n\n## Expected output\n{}",
            self.render(inputs),
            interpolate(&self.expected_output, inputs)
        );
        if self.output_shape == OutputShape::List {
            prompt.push_str("\n\nRespond with a JSON array of strings and nothing else.");
        }
        prompt
    }

    pub fn analysis() -> Self {
        Self::new(
            "analysis_task",
            "Analyze the website {website}. Cover its purpose, audience, primary keywords, \
             content quality, on-page SEO and any obvious technical issues.",
            "A structured analysis of {website} with one section per area reviewed.",
        )
    }

    pub fn competitor_finding() -> Self {
        Self::new(
            "competitor_finding_task",
            "Find the main online competitors of {website}. Only include sites that target \
             the same audience or rank for the same keywords.",
            "A JSON array of competitor domains, most relevant first, for example \
             [\"rival-a.com\", \"rival-b.com\"].",
        )
        .with_output_shape(OutputShape::List)
    }

    pub fn competitor_research() -> Self {
        Self::new(
            "competitor_researching_task",
            "Research the competitors of {website}. For each one, summarize its content \
             strategy, strongest keywords and what it does better or worse than {website}.",
            "A competitor-by-competitor research summary.",
        )
    }

    pub fn report_writing() -> Self {
        Self::new(
            "writing_task",
            "Write the final SEO report for {website}. Combine the site analysis and the \
             competitor research into prioritized recommendations.",
            "A markdown report with an executive summary, findings and a prioritized \
             action list.",
        )
    }
}

/// Replace `{key}` occurrences for every key in `inputs`
fn interpolate(template: &str, inputs: &StageInputs) -> String {
    inputs
        .iter()
        .fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{}}}", key), value)
        })
}

/// Agent/task pair for every stage
#[derive(Debug, Clone)]
pub struct Roster {
    pairs: HashMap<Stage, (AgentProfile, TaskSpec)>,
}

impl Default for Roster {
    fn default() -> Self {
        let pairs = HashMap::from([
            (
                Stage::Analyze,
                (AgentProfile::website_analyst(), TaskSpec::analysis()),
            ),
            (
                Stage::FindCompetitors,
                (AgentProfile::competitor_analyst(), TaskSpec::competitor_finding()),
            ),
            (
                Stage::ResearchCompetitors,
                (AgentProfile::competitor_researcher(), TaskSpec::competitor_research()),
            ),
            (
                Stage::WriteReport,
                (AgentProfile::report_writer(), TaskSpec::report_writing()),
            ),
        ]);
        Self { pairs }
    }
}

impl Roster {
    /// Replace the agent/task pair of one stage
    pub fn with_stage(mut self, stage: Stage, agent: AgentProfile, task: TaskSpec) -> Self {
        self.pairs.insert(stage, (agent, task));
        self
    }

    /// Agent/task pair for `stage`
    pub fn get(&self, stage: Stage) -> (&AgentProfile, &TaskSpec) {
        // Every stage is inserted by `default()` and never removed.
        let (agent, task) = &self.pairs[&stage];
        (agent, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_website() {
        let task = TaskSpec::analysis();
        let rendered = task.render(&StageInputs::for_website("example.com"));

        assert!(rendered.contains("example.com"));
        assert!(!rendered.contains("{website}"));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let task = TaskSpec::new("t", "Compare {website} with {other}", "text");
        let rendered = task.render(&StageInputs::for_website("example.com"));

        assert_eq!(rendered, "Compare example.com with {other}");
    }

    #[test]
    fn test_list_prompt_asks_for_json_array() {
        let inputs = StageInputs::for_website("example.com");

        let list_prompt = TaskSpec::competitor_finding().prompt(&inputs);
        assert!(list_prompt.contains("JSON array of strings and nothing else"));
        assert!(list_prompt.contains("competitors of example.com"));

        let text_prompt = TaskSpec::analysis().prompt(&inputs);
        assert!(text_prompt.contains("## Expected output"));
        assert!(!text_prompt.contains("nothing else"));
    }

    #[test]
    fn test_default_roster_covers_every_stage() {
        let roster = Roster::default();
        for stage in Stage::ORDER {
            let (agent, task) = roster.get(stage);
            assert!(!agent.role.is_empty());
            assert!(!task.description.is_empty());
        }
        let (_, finding) = roster.get(Stage::FindCompetitors);
        assert_eq!(finding.output_shape, OutputShape::List);
    }

    #[test]
    fn test_report_writer_has_no_search_tool() {
        assert!(!AgentProfile::report_writer().uses_web_search);
        assert!(AgentProfile::competitor_analyst().uses_web_search);
    }

    #[test]
    fn test_with_stage_overrides_pair() {
        let roster = Roster::default().with_stage(
            Stage::WriteReport,
            AgentProfile::new("terse", "Editor", "Be brief", "None"),
            TaskSpec::new("short_report", "Summarize {website}", "One paragraph"),
        );
        let (agent, task) = roster.get(Stage::WriteReport);
        assert_eq!(agent.name, "terse");
        assert_eq!(task.name, "short_report");
    }

    #[test]
    fn test_preamble_mentions_role_and_goal() {
        let preamble =
            AgentProfile::website_analyst().preamble(&StageInputs::for_website("example.com"));
        assert!(preamble.contains("SEO Website Analyst"));
        assert!(preamble.contains("Audit example.com"));
    }
}
