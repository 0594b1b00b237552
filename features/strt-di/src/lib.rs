//! A small service container with constructor auto-wiring
//!
//! Services are registered on a [Container] by name, either as factories,
//! singletons or ready instances. Names without a registration are built from
//! a known [Class], resolving each declared constructor parameter through the
//! container. A [ServiceProvider] drives an ordered [ServiceTable] through
//! register and boot, running the [Initialize] hook of every service.
//!
//! ```
//! use std::sync::Arc;
//! use strt_di::{Arguments, Autowire, Class, Container, DynError, Parameter};
//!
//! struct Bar;
//! impl Autowire for Bar {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![]
//!     }
//!
//!     fn construct(_: &Arguments) -> Result<Self, DynError> {
//!         Ok(Bar)
//!     }
//! }
//!
//! struct Foo {
//!     bar: Arc<Bar>,
//! }
//! impl Autowire for Foo {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::service::<Bar>("bar")]
//!     }
//!
//!     fn construct(args: &Arguments) -> Result<Self, DynError> {
//!         Ok(Foo { bar: args.service("bar")? })
//!     }
//! }
//!
//! let container = Container::new();
//! let foo = container.make_type::<Foo>().unwrap();
//! assert!(Arc::ptr_eq(&foo.bar, &container.make_type::<Bar>().unwrap()));
//! ```

pub mod autowire;
pub mod builder;
pub mod config;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod provider;
pub mod types;

pub use autowire::{Arguments, Autowire, Class, Parameter, ParameterKind};
pub use builder::ContainerBuilder;
pub use config::{ContainerConfig, ErrorMode};
pub use container::{Container, Resolver, ResolvingHook};
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{ConfigError, ProviderError, ResolveError};
pub use provider::{BootOutcome, BootReport, ServiceProvider, ServiceTable};
pub use types::{DynError, Initialize, Injectable, Instance, TypeInfo};
