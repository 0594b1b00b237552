use std::{
    any::type_name,
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use crate::{
    autowire::{Arguments, Autowire, Class, ParameterKind},
    config::ContainerConfig,
    errors::ResolveError,
    types::{Injectable, Instance},
};

/// Produces a service - receives the container to resolve its own dependencies
pub type Resolver = Arc<dyn Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync>;

/// Invoked once with a freshly constructed service
pub type ResolvingHook = Arc<dyn Fn(&Instance, &Container) + Send + Sync>;

/// Singleton registry entry - the factory is replaced by its product on first use
#[derive(Clone)]
enum SingletonSlot {
    Pending(Resolver),
    Resolved(Instance),
}

/// Where a name resolves from, captured while holding the lock
enum Source {
    Singleton(Resolver),
    Binding(Resolver),
    Class(Class),
}

#[derive(Default)]
struct Registry {
    bindings: HashMap<String, Resolver>,
    singletons: HashMap<String, SingletonSlot>,
    resolved: HashMap<String, Instance>,
    resolving_hooks: HashMap<String, Vec<ResolvingHook>>,
    /// Classes the container knows how to auto-wire
    classes: HashMap<String, Class>,
    /// Names currently under construction per thread, outermost first
    stacks: HashMap<ThreadId, Vec<String>>,
}

impl Registry {
    /// Adds a class, replacing a known one only to gain an init hook
    fn add_class(&mut self, name: &str, class: Class) {
        match self.classes.get(name) {
            Some(known) if known.info != class.info => {
                tracing::warn!(
                    "Class '{name}' is already known as '{}', ignoring '{}'",
                    known.info,
                    class.info
                );
            }
            Some(known) if known.has_init() || !class.has_init() => {}
            _ => {
                self.classes.insert(name.to_string(), class);
            }
        }
    }
}

/// Service container
///
/// Cheap to clone, all clones share the same registry. One container is
/// meant to live for one request or process and to be passed explicitly.
///
/// The registry lock is never held while factories, constructors or hooks
/// run, so they may resolve other services through the container.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);
struct ContainerInner {
    config: ContainerConfig,
    registry: Mutex<Registry>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        let mut map = f.debug_struct("Container");
        for name in registry.bindings.keys() {
            let state = if registry.resolved.contains_key(name) {
                "resolved"
            } else {
                "bound"
            };
            map.field(name, &state);
        }
        for (name, slot) in &registry.singletons {
            let state = match slot {
                SingletonSlot::Pending(_) => "singleton",
                SingletonSlot::Resolved(_) => "singleton (resolved)",
            };
            map.field(name, &state);
        }
        map.finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Name under which the container resolves to itself
    ///
    /// Every resolution wraps a fresh handle, compare them with [Container::same].
    pub const NAME: &'static str = "container";

    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Container(Arc::new(ContainerInner {
            config,
            registry: Mutex::new(Registry::default()),
        }))
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.0.config
    }

    /// Whether both handles share one registry
    pub fn same(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Registers a factory, overwriting any previous binding for `name`
    pub fn bind<F>(&self, name: impl Into<String>, resolver: F)
    where
        F: Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        self.insert_binding(name.into(), Arc::new(resolver));
    }

    /// Registers a factory which is invoked at most once
    pub fn singleton<F>(&self, name: impl Into<String>, resolver: F)
    where
        F: Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        self.insert_singleton(name.into(), SingletonSlot::Pending(Arc::new(resolver)));
    }

    /// Registers an already built service as a singleton
    pub fn instance(&self, name: impl Into<String>, instance: Instance) {
        self.insert_singleton(name.into(), SingletonSlot::Resolved(instance));
    }

    pub(crate) fn insert_binding(&self, name: String, resolver: Resolver) {
        let replaced = self
            .registry()
            .bindings
            .insert(name.clone(), resolver)
            .is_some();
        self.report_registration("binding", &name, replaced);
    }

    fn insert_singleton(&self, name: String, slot: SingletonSlot) {
        let kind = match slot {
            SingletonSlot::Pending(_) => "singleton",
            SingletonSlot::Resolved(_) => "instance",
        };
        let replaced = self
            .registry()
            .singletons
            .insert(name.clone(), slot)
            .is_some();
        self.report_registration(kind, &name, replaced);
    }

    pub(crate) fn insert_pending_singleton(&self, name: String, resolver: Resolver) {
        self.insert_singleton(name, SingletonSlot::Pending(resolver));
    }

    /// Makes `T` known so it can be auto-wired by its class name
    pub fn autowire<T: Autowire>(&self) {
        self.register_class(Class::of::<T>());
    }

    pub fn register_class(&self, class: Class) {
        tracing::debug!("Registered class {}", class.name);
        self.registry().add_class(class.name, class);
    }

    /// Appends a callback invoked once, right after `name` is first constructed
    ///
    /// Callbacks fire for services produced by [Container::bind] or by
    /// auto-wiring, never for singletons or the container itself.
    pub fn resolving<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&Instance, &Container) + Send + Sync + 'static,
    {
        self.registry()
            .resolving_hooks
            .entry(name.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Whether `name` has a binding or a singleton
    ///
    /// Auto-wired services are not counted.
    pub fn has(&self, name: &str) -> bool {
        let registry = self.registry();
        registry.bindings.contains_key(name) || registry.singletons.contains_key(name)
    }

    /// Whether `name` already has a cached instance
    pub fn is_resolved(&self, name: &str) -> bool {
        let registry = self.registry();
        registry.resolved.contains_key(name)
            || matches!(
                registry.singletons.get(name),
                Some(SingletonSlot::Resolved(_))
            )
    }

    /// Forgets the binding, singleton and cached instance of `name`
    pub fn remove(&self, name: &str) {
        let mut registry = self.registry();
        registry.bindings.remove(name);
        registry.singletons.remove(name);
        registry.resolved.remove(name);
        tracing::debug!("Removed '{name}'");
    }

    /// Resolves `name`
    ///
    /// Failures are logged as warnings and result in `None`.
    /// Use [Container::try_make] to get the error instead.
    pub fn make(&self, name: &str) -> Option<Instance> {
        self.try_make(name)
            .map_err(|error| tracing::warn!("Unable to resolve '{name}': {error}"))
            .ok()
    }

    /// Resolves `name`, in order from:
    /// 1. the cache of already constructed services
    /// 2. the container itself, if `name` is [Container::NAME]
    /// 3. the singletons
    /// 4. the bindings
    /// 5. a known class, auto-wired from its constructor parameters
    pub fn try_make(&self, name: &str) -> Result<Instance, ResolveError> {
        self.resolve(name, None)
            .inspect_err(|error| tracing::debug!("Resolving '{name}' failed: {error}"))
    }

    /// Resolves `name` and downcasts it to `T`
    pub fn make_as<T: Injectable>(&self, name: &str) -> Option<Arc<T>> {
        let instance = self.make(name)?;
        instance
            .downcast::<T>()
            .map_err(|actual_type| {
                tracing::warn!(
                    "Resolved '{name}' as '{actual_type}' but '{}' was requested",
                    type_name::<T>()
                )
            })
            .ok()
    }

    /// Auto-wires `T`, registering the class if it is not known yet
    pub fn make_type<T: Autowire>(&self) -> Option<Arc<T>> {
        let instance = self.make_class(&Class::of::<T>())?;
        instance
            .downcast::<T>()
            .map_err(|actual_type| {
                tracing::warn!(
                    "Resolved '{}' as '{actual_type}' but '{}' was requested",
                    T::class_name(),
                    type_name::<T>()
                )
            })
            .ok()
    }

    /// Resolves the service named after `class`, auto-wiring it if needed
    pub fn make_class(&self, class: &Class) -> Option<Instance> {
        self.try_make_class(class)
            .map_err(|error| tracing::warn!("Unable to resolve '{}': {error}", class.name))
            .ok()
    }

    pub fn try_make_class(&self, class: &Class) -> Result<Instance, ResolveError> {
        self.resolve(class.name, Some(*class))
            .map(|instance| instance.with_init(class.init))
    }

    fn resolve(&self, name: &str, hint: Option<Class>) -> Result<Instance, ResolveError> {
        let source = {
            let mut registry = self.registry();

            if let Some(instance) = registry.resolved.get(name) {
                return Ok(instance.clone());
            }

            if name == Self::NAME {
                return Ok(Instance::new(self.clone()));
            }

            if let Some(stack) = registry.stacks.get(&thread::current().id()) {
                if let Some(position) = stack.iter().position(|entry| entry == name) {
                    let mut chain = stack[position..].to_vec();
                    chain.push(name.to_string());
                    return Err(ResolveError::CircularDependency { chain });
                }
            }

            let source = match registry.singletons.get(name) {
                Some(SingletonSlot::Resolved(instance)) => return Ok(instance.clone()),
                Some(SingletonSlot::Pending(resolver)) => Source::Singleton(resolver.clone()),
                None => match registry.bindings.get(name) {
                    Some(resolver) => Source::Binding(resolver.clone()),
                    None => {
                        if let Some(hint) = hint {
                            registry.add_class(name, hint);
                        }
                        match registry.classes.get(name) {
                            Some(class) => Source::Class(*class),
                            None => {
                                return Err(ResolveError::NotInstantiable {
                                    class: name.to_string(),
                                })
                            }
                        }
                    }
                },
            };

            registry
                .stacks
                .entry(thread::current().id())
                .or_default()
                .push(name.to_string());
            source
        };
        let _guard = ResolutionGuard {
            container: self,
            name,
        };

        match source {
            Source::Singleton(resolver) => {
                let instance = resolver(self)?;
                tracing::debug!("Constructed singleton '{name}'");
                Ok(self.settle_singleton(name, &resolver, instance))
            }
            Source::Binding(resolver) => {
                let instance = resolver(self)?;
                tracing::debug!("Constructed '{name}'");
                Ok(self.store(name, instance))
            }
            Source::Class(class) => {
                let instance = self.build(&class)?;
                tracing::debug!("Auto-wired '{name}'");
                Ok(self.store(name, instance))
            }
        }
    }

    /// Constructs `class`, resolving each of its parameters
    fn build(&self, class: &Class) -> Result<Instance, ResolveError> {
        if !class.instantiable {
            return Err(ResolveError::NotInstantiable {
                class: class.name.to_string(),
            });
        }

        let mut args = Arguments::new(class.name);
        for parameter in class.parameters() {
            let value = match parameter.kind {
                ParameterKind::Service {
                    class: dependency,
                    optional,
                } => {
                    let dependency = dependency();
                    if dependency.info.type_id == class.info.type_id {
                        return Err(ResolveError::CyclicSelfDependency {
                            class: class.name.to_string(),
                        });
                    }

                    match self.resolve(dependency.name, Some(dependency)) {
                        Ok(instance) => Some(instance),
                        Err(error) if optional => {
                            tracing::debug!(
                                "Optional parameter '{}' of '{}' left empty: {error}",
                                parameter.name,
                                class.name
                            );
                            None
                        }
                        Err(error) => return Err(error),
                    }
                }
                ParameterKind::Value {
                    default: Some(default),
                    ..
                } => Some(default()),
                ParameterKind::Value { default: None, .. } => {
                    return Err(ResolveError::Unresolvable {
                        class: class.name.to_string(),
                        parameter: parameter.name,
                    })
                }
            };
            args.push(parameter.name, value);
        }

        class
            .construct(&args)
            .map_err(|error| ResolveError::construction(class.name, error))
    }

    /// Fills the singleton slot `resolver` came from
    ///
    /// A slot replaced while the factory ran is left alone. A slot resolved
    /// meanwhile by another thread wins over `instance`.
    fn settle_singleton(&self, name: &str, resolver: &Resolver, instance: Instance) -> Instance {
        let mut registry = self.registry();
        let Some(slot) = registry.singletons.get_mut(name) else {
            return instance;
        };
        match slot {
            SingletonSlot::Resolved(existing) => existing.clone(),
            SingletonSlot::Pending(current) if !Arc::ptr_eq(current, resolver) => instance,
            SingletonSlot::Pending(_) => {
                *slot = SingletonSlot::Resolved(instance.clone());
                instance
            }
        }
    }

    /// Caches a constructed service and runs its resolving hooks
    ///
    /// If another thread cached `name` first, its instance is returned instead.
    fn store(&self, name: &str, instance: Instance) -> Instance {
        let hooks = {
            let mut registry = self.registry();
            if let Some(existing) = registry.resolved.get(name) {
                return existing.clone();
            }
            registry.resolved.insert(name.to_string(), instance.clone());
            registry
                .resolving_hooks
                .get(name)
                .cloned()
                .unwrap_or_default()
        };

        for hook in hooks {
            hook(&instance, self);
        }
        instance
    }

    fn report_registration(&self, kind: &str, name: &str, replaced: bool) {
        match replaced {
            true if self.0.config.warn_on_rebind => {
                tracing::warn!("Replaced existing {kind} for '{name}'")
            }
            true => tracing::debug!("Replaced existing {kind} for '{name}'"),
            false => tracing::debug!("Registered {kind} '{name}'"),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.0
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the name pushed by [Container::resolve] once construction ends
struct ResolutionGuard<'a> {
    container: &'a Container,
    name: &'a str,
}
impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        let mut registry = self.container.registry();
        let thread = thread::current().id();
        let Some(stack) = registry.stacks.get_mut(&thread) else {
            return;
        };
        if let Some(position) = stack.iter().rposition(|entry| entry == self.name) {
            stack.remove(position);
        }
        if stack.is_empty() {
            registry.stacks.remove(&thread);
        }
    }
}
