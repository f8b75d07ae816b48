use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use async_trait::async_trait;
use piped_client::{
  PipedClient, entities::environment::Environment,
};
use trigger::EnvironmentLister;

/// Environment lookup with a per-id cache in front of the control
/// plane. Environment name records are stable, entries never expire.
pub struct EnvironmentStore {
  client: Arc<PipedClient>,
  cache: Mutex<HashMap<String, Environment>>,
}

impl EnvironmentStore {
  pub fn new(client: Arc<PipedClient>) -> EnvironmentStore {
    EnvironmentStore { client, cache: Default::default() }
  }
}

#[async_trait]
impl EnvironmentLister for EnvironmentStore {
  async fn get(
    &self,
    environment_id: &str,
  ) -> anyhow::Result<Environment> {
    if let Some(environment) =
      self.cache.lock().unwrap().get(environment_id)
    {
      return Ok(environment.clone());
    }
    let environment =
      self.client.get_environment(environment_id).await?;
    self
      .cache
      .lock()
      .unwrap()
      .insert(environment_id.to_string(), environment.clone());
    Ok(environment)
  }
}
