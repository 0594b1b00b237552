use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

use crate::errors::ResolveError;

/// Errors raised by constructors, factories and init hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything stored in the container is shared through an `Arc`,
/// so it needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Zero argument setup operation, invoked once per service during boot
pub trait Initialize {
    fn init(&self) -> Result<(), DynError>;
}

/// Runs the [Initialize] implementation of the value behind an [Instance]
pub(crate) type InitHook = fn(&Instance) -> Result<(), DynError>;

/// A resolved service
///
/// Cloning an instance clones the handle, never the service itself.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
    init: Option<InitHook>,
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance: Arc::new(instance),
            init: None,
        }
    }

    /// Wraps a service which exposes the initialization contract
    pub fn initializable<ExistingInstance: Injectable + Initialize>(
        instance: ExistingInstance,
    ) -> Self {
        Instance {
            init: Some(run_init::<ExistingInstance>),
            ..Instance::new(instance)
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Whether the service exposes an init hook
    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    /// Invokes the init hook, `None` if the service does not expose one
    pub fn init(&self) -> Option<Result<(), DynError>> {
        self.init.map(|hook| hook(self))
    }

    /// Whether both handles point at the same service
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }

    /// Attaches the hook, keeping one already present
    pub(crate) fn with_init(mut self, init: Option<InitHook>) -> Self {
        if self.init.is_none() {
            self.init = init;
        }
        self
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.info.type_name)
            .field("init", &self.init.is_some())
            .finish()
    }
}

pub(crate) fn run_init<T: Injectable + Initialize>(instance: &Instance) -> Result<(), DynError> {
    let service = instance
        .downcast::<T>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: std::any::type_name::<T>(),
            actual_type,
        })?;
    service.init()
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
