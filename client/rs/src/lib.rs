//! # Piped Client
//!
//! Shared entities of the piped continuous delivery agent, the
//! [ControlPlaneApi][api::ControlPlaneApi] contract, and
//! [PipedClient], the HTTP implementation of that contract.

use std::collections::HashMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
  api::{
    ApiError, ControlPlaneApi, CreatedDeployment,
    MostRecentDeployment,
  },
  entities::{
    application::Application, command::Command,
    command::CommandStatus, deployment::Deployment,
    environment::Environment,
  },
};

pub mod api;
pub mod entities;

/// HTTP JSON client for the piped control plane.
#[derive(Clone)]
pub struct PipedClient {
  address: String,
  token: String,
  http: reqwest::Client,
}

impl PipedClient {
  pub fn new(
    address: impl Into<String>,
    token: impl Into<String>,
  ) -> PipedClient {
    let address: String = address.into();
    PipedClient {
      address: address.trim_end_matches('/').to_string(),
      token: token.into(),
      http: Default::default(),
    }
  }

  /// All registered applications.
  pub async fn list_applications(
    &self,
  ) -> anyhow::Result<Vec<Application>> {
    self
      .get("/api/applications")
      .await
      .context("failed to list applications")
  }

  /// Commands issued by users which have not been handled yet.
  pub async fn list_pending_commands(
    &self,
  ) -> anyhow::Result<Vec<Command>> {
    self
      .get("/api/commands/pending")
      .await
      .context("failed to list pending commands")
  }

  pub async fn get_environment(
    &self,
    environment_id: &str,
  ) -> anyhow::Result<Environment> {
    self
      .get::<Environment>(&format!(
        "/api/environments/{environment_id}"
      ))
      .await
      .with_context(|| {
        format!("failed to get environment {environment_id}")
      })
  }

  async fn get<R: DeserializeOwned>(
    &self,
    path: &str,
  ) -> Result<R, ApiError> {
    let response = self
      .http
      .get(format!("{}{path}", self.address))
      .bearer_auth(&self.token)
      .send()
      .await
      .context("failed to reach control plane")?;
    parse_response(response).await
  }

  async fn post<B: Serialize, R: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<R, ApiError> {
    let response = self
      .http
      .post(format!("{}{path}", self.address))
      .bearer_auth(&self.token)
      .json(body)
      .send()
      .await
      .context("failed to reach control plane")?;
    parse_response(response).await
  }

  async fn post_unit<B: Serialize>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<(), ApiError> {
    let response = self
      .http
      .post(format!("{}{path}", self.address))
      .bearer_auth(&self.token)
      .json(body)
      .send()
      .await
      .context("failed to reach control plane")?;
    check_status(response).await?;
    Ok(())
  }
}

async fn parse_response<R: DeserializeOwned>(
  response: reqwest::Response,
) -> Result<R, ApiError> {
  let response = check_status(response).await?;
  let parsed = response
    .json()
    .await
    .context("failed to parse control plane response")?;
  Ok(parsed)
}

async fn check_status(
  response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
  let status = response.status();
  if status == StatusCode::NOT_FOUND {
    return Err(ApiError::NotFound);
  }
  if status.is_success() {
    return Ok(response);
  }
  let text = response.text().await.unwrap_or_default();
  Err(ApiError::Other(anyhow!(
    "control plane request failed | {status} | {text}"
  )))
}

#[async_trait]
impl ControlPlaneApi for PipedClient {
  async fn get_application_most_recent_deployment(
    &self,
    application_id: &str,
  ) -> Result<MostRecentDeployment, ApiError> {
    self
      .get(&format!(
        "/api/applications/{application_id}/most-recent-deployment"
      ))
      .await
  }

  async fn create_deployment(
    &self,
    deployment: &Deployment,
  ) -> Result<String, ApiError> {
    let created: CreatedDeployment =
      self.post("/api/deployments", deployment).await?;
    Ok(created.id)
  }

  async fn report_command_handled(
    &self,
    command_id: &str,
    status: CommandStatus,
    metadata: HashMap<String, String>,
    output: String,
  ) -> Result<(), ApiError> {
    #[derive(Serialize)]
    struct Body {
      status: CommandStatus,
      metadata: HashMap<String, String>,
      output: String,
    }
    self
      .post_unit(
        &format!("/api/commands/{command_id}/handled"),
        &Body { status, metadata, output },
      )
      .await
  }
}
