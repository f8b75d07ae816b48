use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::{
  command::CommandStatus, deployment::Deployment,
};

/// Errors surfaced by the control plane.
///
/// NOT_FOUND is typed because several call sites treat it as a valid
/// answer ("never deployed") rather than a failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("resource not found")]
  NotFound,
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

/// The deployment most recently created for an application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MostRecentDeployment {
  #[serde(default)]
  pub deployment_id: String,
  /// Commit hash the deployment was created for.
  /// May be empty for deployments created outside the trigger.
  #[serde(default)]
  pub commit_hash: String,
}

/// Response of a deployment creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedDeployment {
  /// The id assigned by the control plane.
  pub id: String,
}

/// Control plane calls the trigger depends on.
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
  /// Returns [ApiError::NotFound] when the application
  /// has never been deployed.
  async fn get_application_most_recent_deployment(
    &self,
    application_id: &str,
  ) -> Result<MostRecentDeployment, ApiError>;

  /// Submits the deployment and returns the assigned id.
  async fn create_deployment(
    &self,
    deployment: &Deployment,
  ) -> Result<String, ApiError>;

  /// Marks a pending command as handled.
  async fn report_command_handled(
    &self,
    command_id: &str,
    status: CommandStatus,
    metadata: HashMap<String, String>,
    output: String,
  ) -> Result<(), ApiError>;
}
