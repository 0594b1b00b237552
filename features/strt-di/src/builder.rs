use std::sync::Arc;

use crate::{
    autowire::{Autowire, Class},
    config::ContainerConfig,
    container::{Container, Resolver},
    errors::ResolveError,
    types::Instance,
};

enum Registration {
    Binding(String, Resolver),
    Singleton(String, Resolver),
    Instance(String, Instance),
    Class(Class),
}

/// Collects configuration and registrations, then builds a [Container]
///
/// Registrations are applied in the order they were added, so a later
/// binding for the same name wins.
#[derive(Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    registrations: Vec<Registration>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        self.registrations
            .push(Registration::Binding(name.into(), Arc::new(resolver)));
        self
    }

    pub fn singleton<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        self.registrations
            .push(Registration::Singleton(name.into(), Arc::new(resolver)));
        self
    }

    pub fn instance(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.registrations
            .push(Registration::Instance(name.into(), instance));
        self
    }

    pub fn autowire<T: Autowire>(self) -> Self {
        self.class(Class::of::<T>())
    }

    pub fn class(mut self, class: Class) -> Self {
        self.registrations.push(Registration::Class(class));
        self
    }

    pub fn build(self) -> Container {
        tracing::debug!(
            "Building container with {} registrations",
            self.registrations.len()
        );

        let container = Container::with_config(self.config);
        for registration in self.registrations {
            match registration {
                Registration::Binding(name, resolver) => container.insert_binding(name, resolver),
                Registration::Singleton(name, resolver) => {
                    container.insert_pending_singleton(name, resolver)
                }
                Registration::Instance(name, instance) => container.instance(name, instance),
                Registration::Class(class) => container.register_class(class),
            }
        }
        container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        autowire::{Arguments, Parameter},
        config::ErrorMode,
        types::DynError,
    };

    struct Clock;
    impl Autowire for Clock {
        fn class_name() -> &'static str {
            "Clock"
        }

        fn parameters() -> Vec<Parameter> {
            vec![]
        }

        fn construct(_: &Arguments) -> Result<Self, DynError> {
            Ok(Clock)
        }
    }

    #[test]
    fn build_applies_every_registration() {
        let container = ContainerBuilder::new()
            .config(ContainerConfig::strict())
            .bind("answer", |_| Ok(Instance::new(42u32)))
            .singleton("name", |_| Ok(Instance::new("strt")))
            .instance("flag", Instance::new(true))
            .autowire::<Clock>()
            .build();

        assert_eq!(container.config().error_mode, ErrorMode::Strict);
        assert!(container.has("answer"));
        assert!(container.has("name"));
        assert!(container.has("flag"));
        assert!(!container.has("Clock"));

        assert_eq!(*container.make_as::<u32>("answer").unwrap(), 42);
        assert_eq!(*container.make_as::<&'static str>("name").unwrap(), "strt");
        assert!(*container.make_as::<bool>("flag").unwrap());
        assert!(container.make_as::<Clock>("Clock").is_some());
    }

    #[test]
    fn later_registration_wins() {
        let container = ContainerBuilder::new()
            .bind("n", |_| Ok(Instance::new(1u8)))
            .bind("n", |_| Ok(Instance::new(2u8)))
            .build();

        assert_eq!(*container.make_as::<u8>("n").unwrap(), 2);
    }
}
