//! Rule table file (schema version 1)
//!
//! ```yaml
//! schema_version: 1
//! rules:
//!   Audit:
//!     fst:
//!       - { kind: attribute, name: program }
//!   Program:
//!     snd: [Control, Objective]
//! ```

use crate::errors::{io_error, rules_validation, Result};
use grcsnap_core::rules::{NeighborRule, RuleTable};
use serde::Deserialize;
use std::path::Path;

const SUPPORTED_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFileV1 {
    schema_version: u32,
    #[serde(default)]
    rules: RuleTable,
}

/// Load and validate a rule table file
pub fn load_rules_file(path: &Path) -> Result<RuleTable> {
    let content = std::fs::read_to_string(path).map_err(|e| io_error("load_rules_file", e))?;
    parse_rules_str(&content)
}

/// Parse and validate a rule table from a YAML string
pub fn parse_rules_str(content: &str) -> Result<RuleTable> {
    let file: RulesFileV1 = serde_yaml::from_str(content)
        .map_err(|e| rules_validation(&format!("YAML parse error: {}", e)))?;

    if file.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(rules_validation(&format!(
            "Unsupported schema_version: {}. Expected {}",
            file.schema_version, SUPPORTED_SCHEMA_VERSION
        )));
    }

    validate_rules(&file.rules)?;
    Ok(file.rules)
}

fn validate_rules(table: &RuleTable) -> Result<()> {
    for object_type in table.object_types() {
        if object_type.trim().is_empty() {
            return Err(rules_validation("Rule declared for an empty object type"));
        }
        let Some(rule) = table.get(object_type) else {
            continue;
        };
        for neighbor in &rule.fst {
            if neighbor.name().trim().is_empty() {
                return Err(rules_validation(&format!(
                    "Empty neighbor name in fst of {}",
                    object_type
                )));
            }
            if let NeighborRule::Unrecognized { kind, name } = neighbor {
                tracing::debug!(
                    object_type = object_type,
                    kind = %kind,
                    name = %name,
                    "Unrecognized neighbor kind, entry will match nothing"
                );
            }
        }
        if rule.snd.iter().any(|t| t.trim().is_empty()) {
            return Err(rules_validation(&format!(
                "Empty type name in snd of {}",
                object_type
            )));
        }
    }
    Ok(())
}
