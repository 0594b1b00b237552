use std::sync::Arc;

use crate::{
    autowire::Class,
    container::Container,
    dependency_graph::{DependencyGraph, DependencyGraphErrors},
    errors::ProviderError,
    types::Instance,
};

/// Ordered mapping of service keys to the classes behind them
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    entries: Vec<(String, Class)>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`, replacing the class of an existing key in place
    pub fn service(mut self, key: impl Into<String>, class: Class) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = class,
            None => self.entries.push((key, class)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Class)> {
        self.entries.iter().map(|(key, class)| (key.as_str(), class))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to a key during [ServiceProvider::boot]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// Resolved and its init hook ran
    Initialized,
    /// Resolved, the service has no init hook
    Resolved,
    /// Not resolved or not initialized
    Skipped { reason: String },
}

/// Per key outcome of a boot, in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootReport {
    pub outcomes: Vec<(String, BootOutcome)>,
}

impl BootReport {
    pub fn outcome(&self, key: &str) -> Option<&BootOutcome> {
        self.outcomes
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, outcome)| outcome)
    }

    pub fn initialized(&self) -> usize {
        self.count(|outcome| *outcome == BootOutcome::Initialized)
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, BootOutcome::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&BootOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Drives a [ServiceTable] through register and boot
///
/// `register` only binds, nothing is constructed until `boot`.
pub struct ServiceProvider {
    container: Container,
    table: ServiceTable,
}

impl ServiceProvider {
    pub fn new(container: Container, table: ServiceTable) -> Self {
        ServiceProvider { container, table }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn table(&self) -> &ServiceTable {
        &self.table
    }

    /// Binds every key to a factory which auto-wires its class
    pub fn register(&self) {
        for (key, class) in self.table.iter() {
            let class = *class;
            self.container
                .bind(key, move |container| container.try_make_class(&class));
        }
        tracing::debug!("Registered {} services", self.table.len());
    }

    /// Checks that every class in the table can be auto-wired
    ///
    /// Names the container already binds, holds or has resolved are taken as
    /// given, the same way resolution prefers them over auto-wiring.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let container = self.container.clone();
        let provided = move |name: &str| {
            name == Container::NAME || container.has(name) || container.is_resolved(name)
        };
        let graph = DependencyGraph::with_provided(
            self.table.iter().map(|(_, class)| *class),
            provided,
        )
        .map_err(|error| DependencyGraphErrors {
            errors: vec![error],
        })?;
        graph.check()?;
        Ok(())
    }

    /// Resolves every registered key in table order and runs its init hook
    ///
    /// Permissive mode logs failures and continues with the next key.
    /// Strict mode validates the table first and returns the first failure.
    pub fn boot(&self) -> Result<BootReport, ProviderError> {
        let strict = self.container.config().is_strict();
        if strict {
            self.validate().inspect_err(|error| {
                tracing::error!("Aborting boot, invalid service table: {error}")
            })?;
        }

        let mut report = BootReport::default();
        for key in self.table.keys() {
            let outcome = match self.boot_service(key, strict) {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!("Aborting boot: {error}");
                    return Err(error);
                }
            };
            report.outcomes.push((key.to_string(), outcome));
        }

        tracing::info!(
            "Booted {} services ({} initialized, {} skipped)",
            report.outcomes.len(),
            report.initialized(),
            report.skipped()
        );
        Ok(report)
    }

    fn boot_service(&self, key: &str, strict: bool) -> Result<BootOutcome, ProviderError> {
        if !self.container.has(key) {
            tracing::warn!("Service '{key}' is not registered, skipping");
            return Ok(BootOutcome::Skipped {
                reason: "not registered".to_string(),
            });
        }

        let instance = match self.resolve(key, strict)? {
            Some(instance) => instance,
            None => {
                return Ok(BootOutcome::Skipped {
                    reason: "unresolvable".to_string(),
                })
            }
        };

        match instance.init() {
            None => Ok(BootOutcome::Resolved),
            Some(Ok(())) => {
                tracing::debug!("Initialized '{key}'");
                Ok(BootOutcome::Initialized)
            }
            Some(Err(error)) if strict => Err(ProviderError::Init {
                key: key.to_string(),
                error: Arc::new(error),
            }),
            Some(Err(error)) => {
                tracing::warn!("Service '{key}' failed to initialize: {error}");
                Ok(BootOutcome::Skipped {
                    reason: error.to_string(),
                })
            }
        }
    }

    fn resolve(&self, key: &str, strict: bool) -> Result<Option<Instance>, ProviderError> {
        if !strict {
            return Ok(self.container.make(key));
        }
        self.container
            .try_make(key)
            .map(Some)
            .map_err(|error| ProviderError::Resolve {
                key: key.to_string(),
                error,
            })
    }
}
