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

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Invalid name for {field} '{value}': {reason}")]
    InvalidName {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid quantity for {field} '{value}': {reason}")]
    InvalidQuantity {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Request {request} exceeds limit {limit} for {field}")]
    RequestExceedsLimit {
        field: String,
        request: String,
        limit: String,
    },

    #[error("Unknown node pool type '{pool_type}'")]
    UnknownPoolType { pool_type: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Resource already exists: {kind} '{name}'")]
    AlreadyExists { kind: String, name: String },

    #[error("{kind} '{name}' already has an active workflow {workflow_id}")]
    ConflictingWorkflow {
        kind: String,
        name: String,
        workflow_id: String,
    },

    #[error("Resource not found: {resource_type} '{name}'")]
    NotFound { resource_type: String, name: String },

    #[error("Workflow {workflow_id} is {status}, cannot {operation}")]
    InvalidState {
        workflow_id: String,
        status: String,
        operation: String,
    },

    #[error("Workflow {workflow_id} has no step named '{step}'")]
    UnknownStep { workflow_id: String, step: String },

    #[error("Step '{step}' depends on '{dependency}', which did not succeed")]
    DependencyNotSatisfied { step: String, dependency: String },

    #[error("Step '{step}' was not observed to finish within {window_secs}s")]
    ObservationTimeout { step: String, window_secs: u64 },

    #[error("Workflow engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// The API server could not be reached
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    #[error("Kubernetes API rejected the request ({code} {reason}): {message}")]
    KubeApi {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("Kubernetes client error: {0}")]
    KubeClient(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<kube::Error> for ProvisionError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => ProvisionError::KubeApi {
                code: response.code,
                reason: response.reason,
                message: response.message,
            },
            kube::Error::HyperError(_) | kube::Error::Service(_) => {
                ProvisionError::KubeError(err.to_string())
            }
            other => ProvisionError::KubeClient(other.to_string()),
        }
    }
}

/// Machine-readable classification of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidName,
    InvalidQuantity,
    RequestExceedsLimit,
    UnknownPoolType,
    InvalidField,
    AlreadyExists,
    ConflictingWorkflow,
    NotFound,
    InvalidState,
    UnknownStep,
    DependencyNotSatisfied,
    ObservationTimeout,
    EngineUnavailable,
    StepFailed,
    Kubernetes,
    Configuration,
    Serialization,
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            Self::RequestExceedsLimit { .. } => ErrorKind::RequestExceedsLimit,
            Self::UnknownPoolType { .. } => ErrorKind::UnknownPoolType,
            Self::InvalidField { .. } => ErrorKind::InvalidField,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::ConflictingWorkflow { .. } => ErrorKind::ConflictingWorkflow,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::UnknownStep { .. } => ErrorKind::UnknownStep,
            Self::DependencyNotSatisfied { .. } => ErrorKind::DependencyNotSatisfied,
            Self::ObservationTimeout { .. } => ErrorKind::ObservationTimeout,
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::StepFailed { .. } => ErrorKind::StepFailed,
            Self::KubeError(_) | Self::KubeApi { .. } | Self::KubeClient(_) => {
                ErrorKind::Kubernetes
            }
            Self::ConfigError(_) | Self::Io(_) => ErrorKind::Configuration,
            Self::YamlParse(_) | Self::TomlParse(_) | Self::JsonParse(_) => {
                ErrorKind::Serialization
            }
        }
    }

    /// Errors raised before any workflow record exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidName
                | ErrorKind::InvalidQuantity
                | ErrorKind::RequestExceedsLimit
                | ErrorKind::UnknownPoolType
                | ErrorKind::InvalidField
        )
    }

    /// Errors worth retrying against a remote API: unreachable servers,
    /// server-side failures and throttling.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::KubeError(_) | Self::EngineUnavailable(_) | Self::Io(_) => true,
            Self::KubeApi { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn invalid_name(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidName {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_quantity(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidQuantity {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid_state(
        workflow_id: impl ToString,
        status: impl ToString,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            workflow_id: workflow_id.to_string(),
            status: status.to_string(),
            operation: operation.into(),
        }
    }

    pub fn step_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Step the error is attributed to, when there is one.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::ObservationTimeout { step, .. }
            | Self::StepFailed { step, .. }
            | Self::DependencyNotSatisfied { step, .. } => Some(step),
            Self::UnknownStep { step, .. } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_classified() {
        let err = ProvisionError::invalid_name("name", "ab", "too short");
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(err.is_validation());

        let err = ProvisionError::EngineUnavailable("connection refused".to_string());
        assert!(!err.is_validation());
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} from the API server", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_api_errors_are_classified_by_code() {
        let forbidden = ProvisionError::from(api_error(403, "Forbidden"));
        assert!(matches!(forbidden, ProvisionError::KubeApi { code: 403, .. }));
        assert_eq!(forbidden.kind(), ErrorKind::Kubernetes);
        assert!(!forbidden.is_transient());

        assert!(!ProvisionError::from(api_error(422, "Invalid")).is_transient());
        assert!(!ProvisionError::from(api_error(409, "AlreadyExists")).is_transient());
        assert!(ProvisionError::from(api_error(503, "ServiceUnavailable")).is_transient());
        assert!(ProvisionError::from(api_error(429, "TooManyRequests")).is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        assert!(ProvisionError::KubeError("connection refused".to_string()).is_transient());
        assert!(!ProvisionError::KubeClient("bad kubeconfig".to_string()).is_transient());
    }

    #[test]
    fn test_step_is_exposed() {
        let err = ProvisionError::ObservationTimeout {
            step: "apply-namespace".to_string(),
            window_secs: 30,
        };
        assert_eq!(err.step(), Some("apply-namespace"));
        assert_eq!(ProvisionError::not_found("Workflow", "x").step(), None);
    }
}
