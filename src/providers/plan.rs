use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::PlanGenerator;
use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::store::TaskSeed;

/// Plan generator backed by an HTTP planning service.
///
/// POSTs `{"goal": "..."}` with a bearer token and expects an ordered JSON
/// array of task skeletons (either bare or wrapped in `{"tasks": [...]}`).
pub struct HttpPlanGenerator {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanResponse {
    Bare(Vec<TaskSeed>),
    Wrapped { tasks: Vec<TaskSeed> },
}

impl HttpPlanGenerator {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.plan_url.clone(), config.plan_token.clone())
    }
}

#[async_trait]
impl PlanGenerator for HttpPlanGenerator {
    async fn generate(&self, goal: &str) -> Result<Vec<TaskSeed>, BoardError> {
        // Credentials are checked before any network I/O: a missing token is
        // a configuration error, not a provider failure.
        let token = self.token.as_deref().ok_or_else(|| {
            BoardError::Config(
                "plan generator token not set — set BOARDD_PLAN_TOKEN or plan_token in boardd.toml"
                    .to_string(),
            )
        })?;

        info!(url = %self.url, "requesting plan");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "goal": goal }))
            .send()
            .await
            .map_err(|e| BoardError::Provider(e.to_string()))?
            .error_for_status()
            .map_err(|e| BoardError::Provider(e.to_string()))?;

        let plan: PlanResponse = response
            .json()
            .await
            .map_err(|e| BoardError::Provider(format!("invalid plan response: {e}")))?;

        let seeds = match plan {
            PlanResponse::Bare(seeds) => seeds,
            PlanResponse::Wrapped { tasks } => tasks,
        };
        if seeds.is_empty() {
            warn!("plan generator returned an empty plan");
            return Err(BoardError::Provider("empty plan".to_string()));
        }
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_config_error_before_io() {
        // The URL is unreachable on purpose — the error must come from the
        // credentials check, not the network.
        let plan = HttpPlanGenerator::new("http://127.0.0.1:9/plan", None);
        match plan.generate("goal").await {
            Err(BoardError::Config(msg)) => assert!(msg.contains("token")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_provider_error() {
        let plan = HttpPlanGenerator::new("http://127.0.0.1:9/plan", Some("tok".into()));
        assert!(matches!(
            plan.generate("goal").await,
            Err(BoardError::Provider(_))
        ));
    }

    #[test]
    fn test_plan_response_shapes() {
        let bare: PlanResponse =
            serde_json::from_str(r#"[{"title":"A"},{"title":"B","priority":"high"}]"#).unwrap();
        assert!(matches!(bare, PlanResponse::Bare(v) if v.len() == 2));

        let wrapped: PlanResponse =
            serde_json::from_str(r#"{"tasks":[{"title":"A"}]}"#).unwrap();
        assert!(matches!(wrapped, PlanResponse::Wrapped { tasks } if tasks.len() == 1));
    }
}
