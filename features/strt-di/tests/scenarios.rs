use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use strt_di::{
    Arguments, Autowire, BootOutcome, Class, Container, ContainerBuilder, ContainerConfig,
    DependencyGraph, DynError, Initialize, Instance, Parameter, ProviderError, ResolveError,
    ServiceProvider, ServiceTable,
};

#[derive(Debug)]
struct Value {
    v: u32,
}

struct Bar;
impl Autowire for Bar {
    fn class_name() -> &'static str {
        "Bar"
    }

    fn parameters() -> Vec<Parameter> {
        vec![]
    }

    fn construct(_: &Arguments) -> Result<Self, DynError> {
        Ok(Bar)
    }
}

struct Foo {
    bar: Arc<Bar>,
}
impl Autowire for Foo {
    fn class_name() -> &'static str {
        "Foo"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::service::<Bar>("bar")]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Foo {
            bar: args.service("bar")?,
        })
    }
}

struct Recursive {
    _inner: Arc<Recursive>,
}
impl Autowire for Recursive {
    fn class_name() -> &'static str {
        "Self"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::service::<Recursive>("inner")]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Recursive {
            _inner: args.service("inner")?,
        })
    }
}

struct Greeting {
    text: String,
    repeat: u8,
}
impl Autowire for Greeting {
    fn class_name() -> &'static str {
        "Greeting"
    }

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::value_or("text", "hello".to_string()),
            Parameter::value_or("repeat", 2u8),
        ]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Greeting {
            text: args.value("text")?,
            repeat: args.value("repeat")?,
        })
    }
}

struct Timeout(u64);
impl Autowire for Timeout {
    fn class_name() -> &'static str {
        "Timeout"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::value::<u64>("seconds")]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Timeout(args.value("seconds")?))
    }
}

#[test]
fn bound_factory_returns_the_same_object() {
    let container = Container::new();
    container.bind("a", |_| Ok(Instance::new(Value { v: 1 })));

    let first = container.make_as::<Value>("a").unwrap();
    let second = container.make_as::<Value>("a").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.v, 1);
}

#[test]
fn singleton_factory_is_invoked_once_for_three_calls() {
    let container = Container::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let calls = counter.clone();
    container.singleton("b", move |_| {
        Ok(Instance::new(Value {
            v: calls.fetch_add(1, Ordering::SeqCst) as u32 + 1,
        }))
    });

    let results: Vec<_> = (0..3)
        .map(|_| container.make_as::<Value>("b").unwrap())
        .collect();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|value| Arc::ptr_eq(value, &results[0])));
    assert_eq!(results[0].v, 1);
}

#[test]
fn container_name_resolves_to_the_container() {
    let container = ContainerBuilder::new()
        .instance(Container::NAME, Instance::new(Value { v: 0 }))
        .build();

    let resolved = container.make_as::<Container>(Container::NAME).unwrap();
    assert!(resolved.same(&container));
}

#[test]
fn unregistered_dependency_is_auto_wired() {
    let container = Container::new();
    container.autowire::<Foo>();

    let foo = container.make_as::<Foo>("Foo").unwrap();

    assert!(container.is_resolved("Bar"));
    assert!(Arc::ptr_eq(&foo.bar, &container.make_type::<Bar>().unwrap()));
}

#[test]
fn remove_purges_the_cache() {
    let container = Container::new();
    let first = container.make_type::<Foo>().unwrap();

    container.remove("Foo");
    let second = container.make_type::<Foo>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    // Only Foo was evicted, its dependency is still cached
    assert!(Arc::ptr_eq(&first.bar, &second.bar));
}

#[test]
fn self_referential_class_is_absent() {
    let container = Container::new();
    container.autowire::<Recursive>();

    assert!(container.make("Self").is_none());
    assert!(matches!(
        container.try_make("Self"),
        Err(ResolveError::CyclicSelfDependency { ref class }) if class == "Self"
    ));
}

#[test]
fn value_without_default_is_absent() {
    let container = Container::new();

    assert!(container.make_type::<Timeout>().is_none());
    assert!(matches!(
        container.try_make("Timeout"),
        Err(ResolveError::Unresolvable {
            parameter: "seconds",
            ..
        })
    ));
}

#[test]
fn value_defaults_are_used() {
    let container = Container::new();

    let greeting = container.make_type::<Greeting>().unwrap();
    assert_eq!(greeting.text, "hello");
    assert_eq!(greeting.repeat, 2);
}

#[test]
fn resolving_hooks_fire_once_on_the_binding_path() {
    let container = Container::new();
    let fired = Arc::new(Mutex::new(Vec::new()));
    for label in 1..=3 {
        let fired = fired.clone();
        container.resolving("N", move |_, _| fired.lock().unwrap().push(label));
    }
    container.bind("N", |_| Ok(Instance::new(Value { v: 7 })));

    for _ in 0..3 {
        container.make("N").unwrap();
    }

    assert_eq!(*fired.lock().unwrap(), [1, 2, 3]);
}

#[test]
fn hooks_may_resolve_other_services() {
    let container = Container::new();
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    container.resolving("foo", move |_, container| {
        *slot.lock().unwrap() = container.make_type::<Bar>();
    });
    container.bind("foo", |container| container.try_make_class(&Class::of::<Foo>()));

    let foo = container.make_as::<Foo>("foo").unwrap();

    let bar = seen.lock().unwrap().clone().unwrap();
    assert!(Arc::ptr_eq(&foo.bar, &bar));
}

struct Counter(AtomicUsize);
impl Autowire for Counter {
    fn class_name() -> &'static str {
        "Counter"
    }

    fn parameters() -> Vec<Parameter> {
        vec![]
    }

    fn construct(_: &Arguments) -> Result<Self, DynError> {
        Ok(Counter(AtomicUsize::new(0)))
    }
}
impl Initialize for Counter {
    fn init(&self) -> Result<(), DynError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn provider_boots_the_table_in_order() {
    let table = ServiceTable::new()
        .service("counter", Class::initializable::<Counter>())
        .service("foo", Class::of::<Foo>())
        .service("self", Class::of::<Recursive>());
    let provider = ServiceProvider::new(Container::new(), table);
    provider.register();

    let report = provider.boot().unwrap();

    let keys: Vec<_> = report.outcomes.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["counter", "foo", "self"]);
    assert_eq!(report.outcome("counter"), Some(&BootOutcome::Initialized));
    assert_eq!(report.outcome("foo"), Some(&BootOutcome::Resolved));
    assert!(matches!(
        report.outcome("self"),
        Some(BootOutcome::Skipped { .. })
    ));

    let counter = provider.container().make_as::<Counter>("counter").unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn strict_provider_rejects_a_cyclic_table() {
    let table = ServiceTable::new()
        .service("foo", Class::of::<Foo>())
        .service("self", Class::of::<Recursive>());
    let provider = ServiceProvider::new(Container::with_config(ContainerConfig::strict()), table);
    provider.register();

    let err = provider.boot().unwrap_err();

    assert!(matches!(err, ProviderError::Graph(_)));
    assert!(err.to_string().contains("Circular Dependency"));
    assert!(!provider.container().is_resolved("foo"));
}

#[test]
fn graph_orders_the_table() {
    let graph = DependencyGraph::new([Class::of::<Foo>(), Class::of::<Greeting>()]).unwrap();

    let order: Vec<_> = graph
        .build_order()
        .unwrap()
        .iter()
        .map(|class| class.name)
        .collect();
    assert_eq!(order, ["Bar", "Foo", "Greeting"]);
}

#[test]
fn config_file_selects_strict_mode() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "error_mode = \"strict\"\nwarn_on_rebind = true").unwrap();

    let config = ContainerConfig::from_file(file.path()).unwrap();
    let container = ContainerBuilder::new().config(config).build();

    assert!(container.config().is_strict());
    assert!(container.config().warn_on_rebind);
}
