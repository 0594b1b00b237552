use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::{
    autowire::{Class, Parameter, ParameterKind},
    types::TypeInfo,
};

/// Graph of auto-wired classes
///
/// Used to find cycles and unbuildable classes before anything is constructed,
/// and to compute an order in which the classes can be built.
pub struct DependencyGraph {
    map: BTreeMap<&'static str, DependencyGraphEntry>,
    /// Classes the graph was requested for, in insertion order
    roots: Vec<&'static str>,
    /// Names supplied from outside the graph, neither added nor checked
    provided: Box<dyn Fn(&str) -> bool>,
}

struct DependencyGraphEntry {
    class: Class,
    parameters: Vec<Parameter>,
}

impl DependencyGraph {
    pub fn new(classes: impl IntoIterator<Item = Class>) -> Result<Self, DependencyGraphError> {
        Self::with_provided(classes, |_| false)
    }

    /// Like [DependencyGraph::new], but names for which `provided` returns
    /// true are treated as available and not followed
    pub fn with_provided(
        classes: impl IntoIterator<Item = Class>,
        provided: impl Fn(&str) -> bool + 'static,
    ) -> Result<Self, DependencyGraphError> {
        let mut graph = Self {
            map: Default::default(),
            roots: Vec::new(),
            provided: Box::new(provided),
        };

        for class in classes {
            graph.add(class)?;
        }

        Ok(graph)
    }

    /// Adds a class and every class its constructor depends on
    pub fn add(&mut self, class: Class) -> Result<(), DependencyGraphError> {
        if !self.roots.contains(&class.name) {
            self.roots.push(class.name);
        }
        self.insert(class)
    }

    fn insert(&mut self, class: Class) -> Result<(), DependencyGraphError> {
        if (self.provided)(class.name) {
            return Ok(());
        }

        if let Some(existing) = self.map.get(class.name) {
            if existing.class.info != class.info {
                return Err(DependencyGraphError::Duplicate {
                    name: class.name,
                    first: existing.class.info,
                    second: class.info,
                });
            }
            return Ok(());
        }

        let parameters = class.parameters();
        let dependencies: Vec<Class> = parameters
            .iter()
            .filter_map(|parameter| match parameter.kind {
                ParameterKind::Service { class, .. } => Some(class()),
                ParameterKind::Value { .. } => None,
            })
            .collect();

        self.map
            .insert(class.name, DependencyGraphEntry { class, parameters });

        for dependency in dependencies {
            self.insert(dependency)?;
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Names of the classes `name` takes as constructor parameters
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<&'static str>> {
        self.map.get(name).map(|entry| {
            entry
                .parameters
                .iter()
                .filter_map(|parameter| match parameter.kind {
                    ParameterKind::Service { class, .. } => Some(class().name),
                    ParameterKind::Value { .. } => None,
                })
                .collect()
        })
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for root in &self.roots {
            let Some(entry) = self.map.get(root) else {
                continue;
            };
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse(
            graph: &DependencyGraph,
            checked: &mut HashSet<&'static str>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'static str>,
            entry: &DependencyGraphEntry,
        ) {
            let name = entry.class.name;

            // Circular Dependency Check
            if let Some(position) = dependency_chain.iter().position(|link| *link == name) {
                let from = dependency_chain.last().copied().unwrap_or(name);
                let mut chain = dependency_chain[position..].to_vec();
                chain.push(name); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from,
                    to: name,
                    chain,
                });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(name) {
                return;
            }

            if !entry.class.instantiable {
                errors.push(DependencyGraphError::NotInstantiable(name));
            }

            dependency_chain.push(name);

            for parameter in &entry.parameters {
                match parameter.kind {
                    ParameterKind::Value { default: None, .. } => {
                        errors.push(DependencyGraphError::MissingDefault {
                            parameter: parameter.name,
                            required_by: name,
                        });
                    }
                    ParameterKind::Value { .. } => {}
                    // Optional dependencies resolve to None instead of failing
                    ParameterKind::Service { optional: true, .. } => {}
                    ParameterKind::Service { class, .. } => {
                        if let Some(next_entry) = graph.map.get(class().name) {
                            check_recurse(graph, checked, errors, dependency_chain, next_entry);
                        }
                    }
                }
            }

            dependency_chain.pop();
        }
    }

    /// Classes ordered so every class comes after the classes it depends on
    pub fn build_order(&self) -> Result<Vec<Class>, DependencyGraphErrors> {
        self.check()?;

        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        let mut order = Vec::with_capacity(self.map.len());
        for root in &self.roots {
            visit(self, root, &mut visited, &mut in_progress, &mut order);
        }

        return Ok(order);

        fn visit(
            graph: &DependencyGraph,
            name: &'static str,
            visited: &mut HashSet<&'static str>,
            in_progress: &mut HashSet<&'static str>,
            order: &mut Vec<Class>,
        ) {
            // A cycle can only pass through optional edges here, which are skipped
            if visited.contains(name) || !in_progress.insert(name) {
                return;
            }
            let Some(entry) = graph.map.get(name) else {
                return;
            };

            for parameter in &entry.parameters {
                if let ParameterKind::Service { class, .. } = parameter.kind {
                    visit(graph, class().name, visited, in_progress, order);
                }
            }

            in_progress.remove(name);
            visited.insert(name);
            order.push(entry.class);
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error("'{name}' is used for both '{first}' and '{second}'")]
    Duplicate {
        name: &'static str,
        first: TypeInfo,
        second: TypeInfo,
    },
    #[error("'{required_by}' needs the value '{parameter}' but it has no default")]
    MissingDefault {
        parameter: &'static str,
        required_by: &'static str,
    },
    #[error("'{0}' can not be instantiated")]
    NotInstantiable(&'static str),
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: &'static str,
        to: &'static str,
        chain: Vec<&'static str>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        autowire::{Arguments, Autowire},
        types::DynError,
    };

    macro_rules! class {
        ($name:ident, [$($parameter:expr),*]) => {
            struct $name;
            impl Autowire for $name {
                fn class_name() -> &'static str {
                    stringify!($name)
                }

                fn parameters() -> Vec<Parameter> {
                    vec![$($parameter),*]
                }

                fn construct(_: &Arguments) -> Result<Self, DynError> {
                    Ok($name)
                }
            }
        };
    }

    class!(Helper, []);
    class!(Asset, [Parameter::service::<Helper>("helper")]);
    class!(Hook, [
        Parameter::service::<Asset>("asset"),
        Parameter::service::<Helper>("helper")
    ]);
    class!(Loop, [Parameter::service::<Loop>("me")]);
    class!(Ping, [Parameter::service::<Pong>("pong")]);
    class!(Pong, [Parameter::service::<Ping>("ping")]);
    class!(Lazy, [Parameter::optional::<Back>("back")]);
    class!(Back, [Parameter::service::<Lazy>("lazy")]);
    class!(Port, [Parameter::value::<u16>("port")]);
    class!(Retry, [Parameter::value_or("attempts", 3u32)]);

    struct Abstract;
    impl Autowire for Abstract {
        const INSTANTIABLE: bool = false;

        fn class_name() -> &'static str {
            "Abstract"
        }

        fn parameters() -> Vec<Parameter> {
            vec![]
        }

        fn construct(_: &Arguments) -> Result<Self, DynError> {
            Ok(Abstract)
        }
    }

    struct Impostor(#[allow(dead_code)] Arc<()>);
    impl Autowire for Impostor {
        fn class_name() -> &'static str {
            "Helper"
        }

        fn parameters() -> Vec<Parameter> {
            vec![]
        }

        fn construct(_: &Arguments) -> Result<Self, DynError> {
            Ok(Impostor(Arc::new(())))
        }
    }

    fn names(order: &[Class]) -> Vec<&'static str> {
        order.iter().map(|class| class.name).collect()
    }

    #[test]
    fn dependencies_are_added_transitively() {
        let graph = DependencyGraph::new([Class::of::<Hook>()]).unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.contains("Asset"));
        assert_eq!(graph.dependencies_of("Hook").unwrap(), ["Asset", "Helper"]);
        assert!(graph.check().is_ok());
    }

    #[test]
    fn build_order_puts_dependencies_first() {
        let graph = DependencyGraph::new([Class::of::<Hook>(), Class::of::<Retry>()]).unwrap();

        let order = names(&graph.build_order().unwrap());
        assert_eq!(order, ["Helper", "Asset", "Hook", "Retry"]);
    }

    #[test]
    fn self_cycle_is_reported() {
        let graph = DependencyGraph::new([Class::of::<Loop>()]).unwrap();

        let errors = graph.check().unwrap_err().errors;
        assert!(matches!(
            &errors[..],
            [DependencyGraphError::CircularDependency { from: "Loop", to: "Loop", .. }]
        ));
    }

    #[test]
    fn indirect_cycle_is_reported_with_its_chain() {
        let graph = DependencyGraph::new([Class::of::<Ping>()]).unwrap();

        let errors = graph.build_order().unwrap_err().errors;
        let [DependencyGraphError::CircularDependency { chain, .. }] = &errors[..] else {
            panic!("expected one cycle, got {errors:?}");
        };
        assert_eq!(chain, &["Ping", "Pong", "Ping"]);
    }

    #[test]
    fn cycle_through_optional_dependency_is_allowed() {
        let graph = DependencyGraph::new([Class::of::<Back>()]).unwrap();

        let order = names(&graph.build_order().unwrap());
        assert_eq!(order, ["Lazy", "Back"]);
    }

    #[test]
    fn value_without_default_is_reported() {
        let graph = DependencyGraph::new([Class::of::<Port>(), Class::of::<Abstract>()]).unwrap();

        let errors = graph.check().unwrap_err();
        assert_eq!(errors.errors.len(), 2);
        let message = errors.to_string();
        assert!(message.contains("'Port' needs the value 'port'"));
        assert!(message.contains("'Abstract' can not be instantiated"));
    }

    class!(Server, [Parameter::service::<Port>("port")]);

    #[test]
    fn provided_names_are_not_followed() {
        let graph =
            DependencyGraph::with_provided([Class::of::<Server>()], |name| name == "Port").unwrap();

        assert!(!graph.contains("Port"));
        assert_eq!(graph.dependencies_of("Server").unwrap(), ["Port"]);
        assert_eq!(names(&graph.build_order().unwrap()), ["Server"]);

        let unprovided = DependencyGraph::new([Class::of::<Server>()]).unwrap();
        assert!(unprovided.check().is_err());
    }

    #[test]
    fn same_name_for_two_types_is_a_duplicate() {
        let result = DependencyGraph::new([Class::of::<Asset>(), Class::of::<Impostor>()]);

        assert!(matches!(
            result,
            Err(DependencyGraphError::Duplicate { name: "Helper", .. })
        ));
    }
}
