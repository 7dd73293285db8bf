// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Enforces a non-empty service list with unique names.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeSet;

use super::ServiceConfig;

pub fn deserialize_services<'de, D>(deserializer: D) -> Result<NonEmpty<ServiceConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let services: Vec<ServiceConfig> = Vec::deserialize(deserializer)?;

    let mut seen = BTreeSet::new();
    for service in &services {
        if !seen.insert(service.name.clone()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate service name: {}",
                service.name
            )));
        }
    }

    NonEmpty::from_vec(services)
        .ok_or_else(|| serde::de::Error::custom("at least one service is required"))
}
