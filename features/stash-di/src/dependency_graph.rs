use std::{
    any::TypeId,
    collections::{BTreeMap, HashSet},
};

use thiserror::Error;

use crate::{
    binding::Lifecycle,
    constructors::{ErasedConstructors, Literals},
    container::{Dependencies, Selected},
    errors::{display_chain, DiError},
    types::TypeInfo,
};

/// Graph of everything the registry would build
///
/// Built from the constructors the registry would select, without constructing anything.
/// Used to report all configuration problems at once.
pub struct DependencyGraph {
    map: BTreeMap<TypeId, DependencyGraphEntry>,
}
impl DependencyGraph {
    pub fn new(dependencies: &Dependencies) -> (Self, Vec<DependencyGraphError>) {
        let mut graph = Self {
            map: Default::default(),
        };
        let mut errors = Vec::new();

        // Implicitly constructed types discovered while walking bound ones
        let mut pending: Vec<(TypeInfo, ErasedConstructors)> = Vec::new();

        let mut bindings = dependencies.bindings();
        bindings.sort_by_key(|binding| binding.contract.type_name);
        for binding in bindings {
            if binding.lifecycle() == Lifecycle::Constant {
                graph.add(binding.contract, vec![]);
                continue;
            }

            let dependencies = graph.edges(
                dependencies,
                binding.contract,
                &binding.constructors,
                &binding.literals,
                &mut errors,
                &mut pending,
            );
            graph.add(binding.contract, dependencies);
        }

        while let Some((info, constructors)) = pending.pop() {
            if graph.map.contains_key(&info.type_id) {
                continue;
            }
            let dependencies = graph.edges(
                dependencies,
                info,
                &constructors,
                &Literals::new(),
                &mut errors,
                &mut pending,
            );
            graph.add(info, dependencies);
        }

        (graph, errors)
    }

    fn add(&mut self, info: TypeInfo, dependencies: Vec<TypeInfo>) {
        self.map
            .insert(info.type_id, DependencyGraphEntry { info, dependencies });
    }

    /// Dependencies of the constructor that would be selected for `info`
    fn edges(
        &self,
        dependencies: &Dependencies,
        info: TypeInfo,
        constructors: &ErasedConstructors,
        literals: &Literals,
        errors: &mut Vec<DependencyGraphError>,
        pending: &mut Vec<(TypeInfo, ErasedConstructors)>,
    ) -> Vec<TypeInfo> {
        if constructors.is_abstract {
            errors.push(DependencyGraphError::AbstractTarget {
                contract: info,
                implementation: constructors.target,
            });
            return vec![];
        }

        let index = match dependencies.select(constructors, literals) {
            Ok(Selected::Resolved(index)) => index,
            Ok(Selected::Default | Selected::Literals(_)) => return vec![],
            Err(DiError::NoMatchingConstructor {
                unresolved: Some(dependency),
                ..
            }) => {
                errors.push(DependencyGraphError::MissingDependency {
                    dependency,
                    required_by: info,
                });
                return vec![];
            }
            Err(_) => {
                errors.push(DependencyGraphError::NoUsableConstructor {
                    contract: info,
                    implementation: constructors.target,
                });
                return vec![];
            }
        };

        let mut edges = Vec::new();
        for param in constructors.list[index].params.iter() {
            if dependencies.binding(&param.info.type_id).is_none() && !self.map.contains_key(&param.info.type_id) {
                if let Some(constructors) = param.constructors {
                    pending.push((param.info, constructors()));
                }
            }
            edges.push(param.info);
        }
        edges
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
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
            checked: &mut HashSet<TypeId>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<TypeInfo>,
            entry: &DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if let Some(start) = dependency_chain.iter().position(|info| *info == entry.info) {
                let mut chain = dependency_chain[start..].to_vec();
                chain.push(entry.info); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency { chain });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(entry.info.type_id) {
                return;
            };

            dependency_chain.push(entry.info);

            for dependency in &entry.dependencies {
                // Unknown entries were already reported while building the graph
                if let Some(next_entry) = graph.map.get(&dependency.type_id) {
                    check_recurse(graph, checked, errors, dependency_chain, next_entry);
                }
            }

            dependency_chain.pop();
        }
    }

    /// Direct dependencies of `info`, if it is part of the graph
    pub fn dependencies_of(&self, info: &TypeInfo) -> Option<&[TypeInfo]> {
        self.map
            .get(&info.type_id)
            .map(|entry| entry.dependencies.as_slice())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

struct DependencyGraphEntry {
    info: TypeInfo,
    dependencies: Vec<TypeInfo>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: TypeInfo,
    },
    #[error("'{contract}' is bound to '{implementation}', which can not be constructed")]
    AbstractTarget {
        contract: TypeInfo,
        implementation: TypeInfo,
    },
    #[error("'{contract}' is bound to '{implementation}', which has no usable constructor")]
    NoUsableConstructor {
        contract: TypeInfo,
        implementation: TypeInfo,
    },
    #[error("A Circular Dependency exists: {}", display_chain(.chain))]
    CircularDependency { chain: Vec<TypeInfo> },
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

impl Dependencies {
    /// Checks every binding without constructing anything
    ///
    /// Reports missing dependencies, abstract construction targets, implementations
    /// without usable constructors and dependency cycles.
    pub fn validate(&self) -> Result<DependencyGraph, DependencyGraphErrors> {
        let (graph, mut errors) = DependencyGraph::new(self);

        if let Err(cycles) = graph.check() {
            errors.extend(cycles.errors);
        }

        if !errors.is_empty() {
            tracing::debug!("Dependency graph has {} errors", errors.len());
            return Err(DependencyGraphErrors { errors });
        }

        Ok(graph)
    }
}
