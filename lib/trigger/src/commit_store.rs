use std::{
  num::NonZeroUsize,
  sync::{Arc, Mutex},
};

use anyhow::Context;
use clru::CLruCache;
use piped_client::api::{ApiError, ControlPlaneApi};

pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Maps application id to the last commit hash that was accounted for
/// by the trigger (the commit watermark).
///
/// A write-through cache in front of the control plane: reads are
/// served from a bounded LRU, misses fetch the application's most
/// recent deployment over RPC. The durable record is the deployment
/// itself, so [put][Self::put] only touches the cache.
pub struct LastTriggeredCommitStore {
  api: Arc<dyn ControlPlaneApi>,
  cache: Mutex<CLruCache<String, String>>,
}

impl LastTriggeredCommitStore {
  /// A zero `capacity` falls back to [DEFAULT_CACHE_CAPACITY].
  pub fn new(
    api: Arc<dyn ControlPlaneApi>,
    capacity: usize,
  ) -> LastTriggeredCommitStore {
    let capacity = NonZeroUsize::new(capacity)
      .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
      .expect("default cache capacity is nonzero");
    LastTriggeredCommitStore {
      api,
      cache: Mutex::new(CLruCache::new(capacity)),
    }
  }

  /// The watermark for the application. An empty string means the
  /// application has never been deployed, and is a valid cached
  /// answer. RPC errors other than NOT_FOUND propagate uncached.
  pub async fn get(
    &self,
    application_id: &str,
  ) -> anyhow::Result<String> {
    if let Some(hash) =
      self.cache.lock().unwrap().get(application_id)
    {
      return Ok(hash.clone());
    }

    let hash = match self
      .api
      .get_application_most_recent_deployment(application_id)
      .await
    {
      Ok(deployment) => deployment.commit_hash,
      Err(ApiError::NotFound) => String::new(),
      Err(e) => {
        return Err(e).with_context(|| {
          format!(
            "failed to look up most recent deployment of application {application_id}"
          )
        });
      }
    };

    self
      .cache
      .lock()
      .unwrap()
      .put(application_id.to_string(), hash.clone());

    Ok(hash)
  }

  /// Advance the watermark. Cache only, no RPC.
  pub fn put(&self, application_id: &str, commit_hash: &str) {
    self
      .cache
      .lock()
      .unwrap()
      .put(application_id.to_string(), commit_hash.to_string());
  }
}
