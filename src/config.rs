//! Session configuration.
//!
//! ```json
//! {
//!   "model_name": "resnet50",
//!   "clear_body_names": true,
//!   "default_input_type": "f32"
//! }
//! ```

use crate::core::types::ElementType;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_model_name() -> String {
    "model".to_string()
}

fn default_true() -> bool {
    true
}

fn default_input_type() -> ElementType {
    ElementType::F32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name given to the top-level IR model.
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Strip tensor names from translated bodies before caching them, so that
    /// several injections of one body do not produce clashing names.
    #[serde(default = "default_true")]
    pub clear_body_names: bool,
    /// Element type of parameters whose input place has none, e.g. after the graph was cut.
    #[serde(default = "default_input_type")]
    pub default_input_type: ElementType,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            clear_body_names: true,
            default_input_type: default_input_type(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config '{}': {}", path.display(), e))?;
        Self::from_json(&content)
    }
}
