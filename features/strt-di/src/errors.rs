use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::{dependency_graph::DependencyGraphErrors, types::DynError};

/// Errors while resolving a service
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A constructor parameter can neither be resolved nor defaulted
    #[error("Unable to resolve parameter '{parameter}' of '{class}'")]
    Unresolvable {
        class: String,
        parameter: &'static str,
    },
    /// The constructor of a class takes the class itself
    #[error("Cyclic dependency: '{class}' depends on itself")]
    CyclicSelfDependency { class: String },
    /// A class was requested again while it was still being built
    #[error("Circular dependency through {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },
    /// There is no constructible class behind the name
    #[error("'{class}' can not be instantiated")]
    NotInstantiable { class: String },
    /// A constructor or factory returned an error
    #[error("Construction of '{class}' failed - error: {error}")]
    ConstructionFailed { class: String, error: Arc<DynError> },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
}

impl ResolveError {
    /// Wraps an arbitrary error raised while constructing `class`
    pub fn construction(class: impl Into<String>, error: impl Into<DynError>) -> Self {
        Self::ConstructionFailed {
            class: class.into(),
            error: Arc::new(error.into()),
        }
    }
}

/// Errors while registering or booting the service table
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Service '{key}' could not be resolved: {error}")]
    Resolve { key: String, error: ResolveError },

    #[error("Service '{key}' failed to initialize - error: {error}")]
    Init { key: String, error: Arc<DynError> },

    #[error(transparent)]
    Graph(#[from] DependencyGraphErrors),
}

/// Errors while loading a [crate::config::ContainerConfig]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
