use anyhow::Result;
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_namespace_prefix() -> String {
    "KEY-GR".to_string()
}

/// Case handling for the value segments of emitted rule paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueCase {
    #[default]
    Lower,
    Preserve,
}

/// Which rule-emission style governs an invocation. Both strategies were
/// observed in the field; they are selectable here instead of by picking
/// which script to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// One `Excludes` rule per attribute column. The default: it generalizes
    /// cleanly to tables with multiple attribute columns.
    #[default]
    ExcludesPerAttribute,
    /// One `AllTrue(...)` rule per block over all retained columns.
    AllTrueAggregate,
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excludes_per_attribute" => Ok(SynthesisStrategy::ExcludesPerAttribute),
            "all_true_aggregate" => Ok(SynthesisStrategy::AllTrueAggregate),
            other => Err(format!(
                "unknown strategy '{other}' (expected excludes_per_attribute or all_true_aggregate)"
            )),
        }
    }
}

/// Process-wide configuration, threaded explicitly into the pipeline's
/// entry point, never ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Prepended as the first segment of every operand path.
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    /// Override for the key column's semantic domain (e.g. "valve_size").
    /// When unset, the normalized key-column name is used.
    #[serde(default)]
    pub key_domain_name: Option<String>,
    #[serde(default)]
    pub output_value_case: ValueCase,
    #[serde(default)]
    pub synthesis_strategy: SynthesisStrategy,
    /// Reduce key values to their size token ("P12" in "Valve P12 DN50",
    /// "050" in "050 x 040") before normalization.
    #[serde(default)]
    pub size_token_extraction: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: default_namespace_prefix(),
            key_domain_name: None,
            output_value_case: ValueCase::default(),
            synthesis_strategy: SynthesisStrategy::default(),
            size_token_extraction: false,
        }
    }
}

impl SynthesisConfig {
    /// Load config from a YAML file path.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SynthesisConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to defaults.
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                eprintln!("⚠️  Failed to load config from {p} ({e}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
