// ABOUTME: Parsed provisioning outputs as a flat key -> string map.
// ABOUTME: Decodes `terraform output -json` and drops sensitive values unread.

use serde::Deserialize;
use serde_json::Value;
use snafu::ResultExt;
use std::collections::BTreeMap;

use super::error::{MissingOutputSnafu, NoOutputsSnafu, ParseSnafu, StateError};
use crate::types::ServiceName;

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    sensitive: bool,
    value: Value,
}

/// Non-sensitive provisioning outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    values: BTreeMap<String, String>,
}

impl Outputs {
    /// Parse a `terraform output -json` document.
    ///
    /// An empty document means the stack was never applied and is reported as
    /// `StateError::NoOutputs`.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        if json.trim().is_empty() {
            return NoOutputsSnafu.fail();
        }
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(json).context(ParseSnafu)?;
        if raw.is_empty() {
            return NoOutputsSnafu.fail();
        }

        let mut values = BTreeMap::new();
        for (key, output) in raw {
            if output.sensitive {
                tracing::debug!(output = %key, "skipping sensitive output");
                continue;
            }
            let text = match output.value {
                Value::Null => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            if !text.is_empty() {
                values.insert(key, text);
            }
        }

        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str, service: Option<&ServiceName>) -> Result<&str, StateError> {
        self.get(key).ok_or_else(|| {
            MissingOutputSnafu {
                key,
                service: service.cloned(),
            }
            .build()
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
