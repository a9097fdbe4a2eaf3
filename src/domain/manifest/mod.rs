// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Generated resource documents

pub mod generator;

use crate::domain::request::Subject;
use crate::infrastructure::constants::{LABEL_MANAGED_BY, MANAGED_BY_VALUE};
use crate::shared::error::{ProvisionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use self::generator::{generate_cluster_manifests, generate_namespace_manifests};

/// Logical role of a document inside a [`ManifestSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestKey {
    Namespace,
    LimitRange,
    NetworkPolicy,
    ManagedCluster,
    NodeClass,
    NodePool,
}

impl ManifestKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKey::Namespace => "namespace",
            ManifestKey::LimitRange => "limit-range",
            ManifestKey::NetworkPolicy => "network-policy",
            ManifestKey::ManagedCluster => "managed-cluster",
            ManifestKey::NodeClass => "node-class",
            ManifestKey::NodePool => "node-pool",
        }
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated document plus the identity fields pulled out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub key: ManifestKey,
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub document: serde_json::Value,
}

impl Manifest {
    /// Wrap a typed Kubernetes object.
    pub fn from_resource<K: Serialize>(key: ManifestKey, resource: &K) -> Result<Self> {
        Self::from_value(key, serde_json::to_value(resource)?)
    }

    /// Wrap an untyped document; it must carry apiVersion, kind and metadata.name.
    pub fn from_value(key: ManifestKey, document: serde_json::Value) -> Result<Self> {
        let field = |pointer: &str| {
            document
                .pointer(pointer)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let missing =
            |what: &str| ProvisionError::config_error(format!("{} manifest has no {}", key, what));

        let api_version = field("/apiVersion").ok_or_else(|| missing("apiVersion"))?;
        let kind = field("/kind").ok_or_else(|| missing("kind"))?;
        let name = field("/metadata/name").ok_or_else(|| missing("metadata.name"))?;
        let namespace = field("/metadata/namespace");

        Ok(Self {
            key,
            api_version,
            kind,
            name,
            namespace,
            document,
        })
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.document
            .pointer("/metadata/labels")
            .and_then(|v| v.as_object())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_managed(&self) -> bool {
        self.labels().get(LABEL_MANAGED_BY).map(String::as_str) == Some(MANAGED_BY_VALUE)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }
}

/// Ordered documents for one subject. Order is application order.
///
/// Equality ignores `generated_at`: two sets generated from the same input
/// compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSet {
    subject: Subject,
    entries: Vec<Manifest>,
    generated_at: DateTime<Utc>,
}

impl PartialEq for ManifestSet {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject && self.entries == other.entries
    }
}

impl ManifestSet {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            entries: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Append a manifest; a key may appear only once.
    pub fn push(&mut self, manifest: Manifest) -> Result<()> {
        if self.get(manifest.key).is_some() {
            return Err(ProvisionError::config_error(format!(
                "duplicate {} manifest for {}",
                manifest.key, self.subject
            )));
        }
        self.entries.push(manifest);
        Ok(())
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn get(&self, key: ManifestKey) -> Option<&Manifest> {
        self.entries.iter().find(|m| m.key == key)
    }

    pub fn contains(&self, key: ManifestKey) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<ManifestKey> {
        self.entries.iter().map(|m| m.key).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Multi-document YAML in application order.
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for manifest in &self.entries {
            out.push_str("---\n");
            out.push_str(&format!("# {}\n", manifest.key));
            out.push_str(&manifest.to_yaml()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::SubjectKind;
    use serde_json::json;

    fn namespace_doc(name: &str) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name, "labels": { LABEL_MANAGED_BY: MANAGED_BY_VALUE } }
        })
    }

    #[test]
    fn test_from_value_extracts_identity() {
        let manifest = Manifest::from_value(ManifestKey::Namespace, namespace_doc("team-a")).unwrap();
        assert_eq!(manifest.api_version, "v1");
        assert_eq!(manifest.kind, "Namespace");
        assert_eq!(manifest.name, "team-a");
        assert_eq!(manifest.namespace, None);
        assert!(manifest.is_managed());
    }

    #[test]
    fn test_from_value_requires_name() {
        let doc = json!({ "apiVersion": "v1", "kind": "Namespace", "metadata": {} });
        assert!(Manifest::from_value(ManifestKey::Namespace, doc).is_err());
    }

    #[test]
    fn test_set_rejects_duplicate_keys() {
        let mut set = ManifestSet::new(Subject::new(SubjectKind::Namespace, "team-a"));
        let manifest = Manifest::from_value(ManifestKey::Namespace, namespace_doc("team-a")).unwrap();
        set.push(manifest.clone()).unwrap();
        assert!(set.push(manifest).is_err());
        assert_eq!(set.keys(), vec![ManifestKey::Namespace]);
    }

    #[test]
    fn test_equality_ignores_timestamp() {
        let subject = Subject::new(SubjectKind::Namespace, "team-a");
        let mut a = ManifestSet::new(subject.clone());
        let mut b = ManifestSet::new(subject);
        b.generated_at = a.generated_at + chrono::Duration::seconds(5);
        let manifest = Manifest::from_value(ManifestKey::Namespace, namespace_doc("team-a")).unwrap();
        a.push(manifest.clone()).unwrap();
        b.push(manifest).unwrap();
        assert_eq!(a, b);
    }
}
