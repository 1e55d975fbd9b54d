use crate::schema::ParamType;
use serde::{Deserialize, Serialize};

/// A synthetic output exposed by nodes whose retry strategy routes failures downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
}

/// Tunables shared by the store, the resolver and the branch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Level assigned to the trailing else-case.
    pub else_level: u32,
    /// Maximum number of undo snapshots kept.
    pub max_history: usize,
    /// Node type of compound iteration nodes.
    pub iteration_node_type: String,
    /// Node type of the start node nested inside an iteration node.
    pub iteration_start_node_type: String,
    /// Node type of the end node nested inside an iteration node.
    pub iteration_end_node_type: String,
    /// Prefix for generated input names of condition operands.
    pub input_name_prefix: String,
    /// Outputs appended to a node's references when its retry strategy exposes failures.
    pub error_outputs: Vec<ErrorOutput>,
    /// Node types whose template text must not be empty.
    pub template_required_node_types: Vec<String>,
    /// Node types whose outputs need a description or a default value.
    pub described_output_node_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            else_level: 999,
            max_history: 50,
            iteration_node_type: "iteration".to_string(),
            iteration_start_node_type: "node-start".to_string(),
            iteration_end_node_type: "node-end".to_string(),
            input_name_prefix: "input".to_string(),
            error_outputs: vec![
                ErrorOutput {
                    name: "errorCode".to_string(),
                    param_type: ParamType::String,
                    description: "Error code".to_string(),
                },
                ErrorOutput {
                    name: "errorMessage".to_string(),
                    param_type: ParamType::String,
                    description: "Error message".to_string(),
                },
            ],
            template_required_node_types: vec!["spark-llm".to_string(), "message".to_string()],
            described_output_node_types: vec!["extractor-parameter".to_string()],
        }
    }
}

impl EngineConfig {
    /// Parses a config document; missing keys fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, crate::error::ConversionError> {
        Ok(serde_json::from_str(json)?)
    }
}
