use std::{any::type_name, fmt::Debug, sync::Arc};

use crate::{
    errors::ResolveError,
    types::{run_init, DynError, InitHook, Initialize, Injectable, Instance, TypeInfo},
};

/// A class the container can build on its own
///
/// Declares its constructor: which parameters it takes and how to build
/// itself once they are resolved.
pub trait Autowire: Injectable + Sized {
    /// Classes which only describe a contract set this to false
    const INSTANTIABLE: bool = true;

    /// Name the class is known by inside the container
    fn class_name() -> &'static str {
        type_name::<Self>()
    }

    /// Returns the ordered constructor parameters
    fn parameters() -> Vec<Parameter>;

    /// Constructs the class from its resolved parameters
    fn construct(args: &Arguments) -> Result<Self, DynError>;
}

/// A constructor parameter
#[derive(Clone)]
pub struct Parameter {
    pub name: &'static str,
    pub kind: ParameterKind,
}

#[derive(Clone)]
pub enum ParameterKind {
    /// Another class, resolved through the container
    Service {
        class: fn() -> Class,
        /// Optional services resolve to `None` instead of failing
        optional: bool,
    },
    /// A plain value, never resolved through the container
    Value {
        type_info: TypeInfo,
        default: Option<Arc<dyn Fn() -> Instance + Send + Sync>>,
    },
}

impl Parameter {
    pub fn service<T: Autowire>(name: &'static str) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Service {
                class: Class::of::<T>,
                optional: false,
            },
        }
    }

    pub fn optional<T: Autowire>(name: &'static str) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Service {
                class: Class::of::<T>,
                optional: true,
            },
        }
    }

    /// A value without default - resolving it always fails
    pub fn value<T: Injectable>(name: &'static str) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Value {
                type_info: TypeInfo::of::<T>(),
                default: None,
            },
        }
    }

    pub fn value_or<T: Injectable + Clone>(name: &'static str, default: T) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Value {
                type_info: TypeInfo::of::<T>(),
                default: Some(Arc::new(move || Instance::new(default.clone()))),
            },
        }
    }
}

impl Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParameterKind::Service { class, optional } => f
                .debug_struct("Service")
                .field("name", &self.name)
                .field("class", &class().name)
                .field("optional", optional)
                .finish(),
            ParameterKind::Value { type_info, default } => f
                .debug_struct("Value")
                .field("name", &self.name)
                .field("type", &type_info.type_name)
                .field("default", &default.is_some())
                .finish(),
        }
    }
}

/// Type erased [Autowire] implementation
#[derive(Clone, Copy)]
pub struct Class {
    pub info: TypeInfo,
    pub name: &'static str,
    pub instantiable: bool,
    parameters: fn() -> Vec<Parameter>,
    construct: fn(&Arguments) -> Result<Instance, DynError>,
    pub(crate) init: Option<InitHook>,
}

impl Class {
    pub fn of<T: Autowire>() -> Class {
        Class {
            info: TypeInfo::of::<T>(),
            name: T::class_name(),
            instantiable: T::INSTANTIABLE,
            parameters: T::parameters,
            construct: construct::<T>,
            init: None,
        }
    }

    /// A class whose instances expose the [Initialize] contract
    pub fn initializable<T: Autowire + Initialize>() -> Class {
        Class {
            init: Some(run_init::<T>),
            ..Class::of::<T>()
        }
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        (self.parameters)()
    }

    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    pub(crate) fn construct(&self, args: &Arguments) -> Result<Instance, DynError> {
        (self.construct)(args).map(|instance| instance.with_init(self.init))
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("instantiable", &self.instantiable)
            .field("init", &self.init.is_some())
            .finish()
    }
}

fn construct<T: Autowire>(args: &Arguments) -> Result<Instance, DynError> {
    T::construct(args).map(Instance::new)
}

/// Resolved constructor arguments, looked up by parameter name
pub struct Arguments {
    class: &'static str,
    values: Vec<(&'static str, Option<Instance>)>,
}

impl Arguments {
    pub(crate) fn new(class: &'static str) -> Self {
        Arguments {
            class,
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, value: Option<Instance>) {
        self.values.push((name, value));
    }

    /// A required service
    pub fn service<T: Injectable>(&self, name: &'static str) -> Result<Arc<T>, ResolveError> {
        self.optional(name)?.ok_or_else(|| self.unresolvable(name))
    }

    /// An optional service, `None` if it could not be resolved
    pub fn optional<T: Injectable>(
        &self,
        name: &'static str,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        match self.get(name)? {
            Some(instance) => downcast(instance).map(Some),
            None => Ok(None),
        }
    }

    /// A plain value
    pub fn value<T: Injectable + Clone>(&self, name: &'static str) -> Result<T, ResolveError> {
        let instance = self.get(name)?.ok_or_else(|| self.unresolvable(name))?;
        downcast::<T>(instance).map(|value| (*value).clone())
    }

    fn get(&self, name: &'static str) -> Result<Option<&Instance>, ResolveError> {
        self.values
            .iter()
            .find(|(parameter, _)| *parameter == name)
            .map(|(_, value)| value.as_ref())
            .ok_or_else(|| self.unresolvable(name))
    }

    fn unresolvable(&self, parameter: &'static str) -> ResolveError {
        ResolveError::Unresolvable {
            class: self.class.to_string(),
            parameter,
        }
    }
}

fn downcast<T: Injectable>(instance: &Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}
