use serde::{Deserialize, Serialize};

/// A deployment environment registered on the control plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
}
