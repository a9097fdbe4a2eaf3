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

pub mod cluster;
pub mod configmap;
pub mod limit_range;
pub mod namespace;
pub mod network_policy;
pub mod workflow;

pub use self::configmap::RecordConfigMapBuilder;
pub use self::limit_range::LimitRangeBuilder;
pub use self::namespace::NamespaceBuilder;
pub use self::network_policy::NetworkPolicyBuilder;
pub use self::workflow::ArgoWorkflowBuilder;

use crate::domain::request::Subject;
use crate::infrastructure::constants::{
    LABEL_MANAGED_BY, LABEL_SUBJECT_KIND, LABEL_SUBJECT_NAME, MANAGED_BY_VALUE,
};
use std::collections::BTreeMap;

/// Labels carried by every generated document.
pub fn managed_labels(subject: &Subject) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(
        LABEL_SUBJECT_KIND.to_string(),
        subject.kind.as_str().to_ascii_lowercase(),
    );
    labels.insert(LABEL_SUBJECT_NAME.to_string(), subject.name.clone());
    labels
}
