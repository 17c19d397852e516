//! Provider boundaries: plan generation, flavor log text, demo dataset.

mod demo;
mod logtext;
mod plan;

use async_trait::async_trait;

use crate::error::BoardError;
use crate::store::{Severity, TaskSeed};

pub use demo::demo_board;
pub use logtext::{CannedLogText, FALLBACK_LINE};
pub use plan::HttpPlanGenerator;

/// Turns a free-text goal into an ordered list of task skeletons.
/// The core assigns identifiers and initializes status/progress/logs.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, goal: &str) -> Result<Vec<TaskSeed>, BoardError>;
}

/// Produces one short flavor line for the active task's log.
///
/// Infallible by contract: implementations absorb any internal failure and
/// return a fallback line instead. A failed flavor line must never fail the
/// tick that requested it.
#[async_trait]
pub trait LogTextProvider: Send + Sync {
    async fn flavor_line(&self, title: &str, progress: u8) -> (String, Severity);
}
