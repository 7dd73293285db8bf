// ABOUTME: Phantom-typed identifiers for platform resources.
// ABOUTME: Keeps cluster, service, secret, and task definition identifiers from being swapped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
pub enum ClusterMarker {}
pub enum PlatformServiceMarker {}
pub enum SecretMarker {}
pub enum TaskDefinitionMarker {}

/// An opaque identifier (name or ARN) tagged with the kind of resource it names.
///
/// A `ClusterId` cannot be passed where a `PlatformServiceId` is expected, which
/// matters because both are plain strings in the provisioning outputs.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Short form for display: the last `/`-separated segment of an ARN,
    /// or the whole value for plain names.
    pub fn short(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }
}

// Manual impls so T needs no bounds; it is only a marker.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

pub type ClusterId = Id<ClusterMarker>;
pub type PlatformServiceId = Id<PlatformServiceMarker>;
pub type SecretId = Id<SecretMarker>;
pub type TaskDefinitionArn = Id<TaskDefinitionMarker>;
