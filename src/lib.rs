//! # SEO Analysis Agent
//!
//! A four-stage pipeline that hands each stage to an LLM agent:
//! analyze a website, find its competitors, research them, write a report.
//!
//! The pipeline talks to the model backend only through [`StageExecutor`],
//! so it can run against [`RigExecutor`] (Ollama via Rig) or a test stub.
//!
//! ```rust,ignore
//! use seo_analysis_agent::{Config, RigExecutor, SeoPipeline};
//!
//! let config = Config::from_env()?;
//! let mut pipeline = SeoPipeline::new(RigExecutor::new(config), "example.com");
//! let report = pipeline.kickoff().await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod pipeline;
pub mod roster;
pub mod state;
pub mod tools;

pub use config::Config;
pub use error::{ExecutionError, PipelineError, StateError};
pub use executor::{
    run_stage, ExecutionMode, RigExecutor, StageExecutor, StageInputs, StageOutput,
};
pub use pipeline::{SeoPipeline, Stage};
pub use roster::{AgentProfile, OutputShape, Roster, TaskSpec};
pub use state::{PipelinePhase, RunState};
