//! Dependency graph and resolution
//!
//! Resolution is a pure function of the catalog and the merged activation
//! configuration: the modules configured on, closed over their dependencies,
//! ordered dependencies first with ties broken by catalog order.

use crate::config::api::ActivationConfig;
use crate::module::descriptor::{is_valid_identifier, ModuleDescriptor};
use crate::module::error::{ModuleError, ModuleResult};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Validated view over a catalog's dependency edges
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    descriptors: &'a [ModuleDescriptor],
    index: HashMap<&'a str, usize>,
    /// `requires[i]`: catalog indices module `i` depends on
    requires: Vec<Vec<usize>>,
    /// `dependents[i]`: catalog indices that depend on module `i`
    dependents: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl<'a> DependencyGraph<'a> {
    /// Check identifiers, duplicates, missing dependencies and cycles
    pub fn build(descriptors: &'a [ModuleDescriptor]) -> ModuleResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            if !is_valid_identifier(&descriptor.id) {
                return Err(ModuleError::InvalidIdentifier {
                    id: descriptor.id.clone(),
                });
            }
            if index.insert(descriptor.id.as_str(), position).is_some() {
                return Err(ModuleError::DuplicateModule {
                    id: descriptor.id.clone(),
                });
            }
        }

        let mut requires = vec![Vec::new(); descriptors.len()];
        let mut dependents = vec![Vec::new(); descriptors.len()];
        for (position, descriptor) in descriptors.iter().enumerate() {
            for dependency in &descriptor.dependencies {
                let target = *index.get(dependency.as_str()).ok_or_else(|| {
                    ModuleError::MissingDependency {
                        module: descriptor.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                requires[position].push(target);
                dependents[target].push(position);
            }
        }

        let graph = Self {
            descriptors,
            index,
            requires,
            dependents,
        };
        if let Some(cycle) = graph.find_cycle() {
            return Err(ModuleError::CyclicDependency { cycle });
        }
        Ok(graph)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn descriptor(&self, position: usize) -> &'a ModuleDescriptor {
        &self.descriptors[position]
    }

    /// First cycle found walking the catalog in order, closed on its start
    /// (`[a, b, a]`; a self-reference yields `[a, a]`)
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.descriptors.len()];
        let mut path = Vec::new();

        for start in 0..self.descriptors.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = self.visit(start, &mut marks, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(&self, node: usize, marks: &mut [Mark], path: &mut Vec<usize>) -> Option<Vec<String>> {
        marks[node] = Mark::InProgress;
        path.push(node);

        for &next in &self.requires[node] {
            match marks[next] {
                Mark::InProgress => {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&p| self.descriptors[p].id.clone())
                        .collect();
                    cycle.push(self.descriptors[next].id.clone());
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(next, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        None
    }

    /// `roots` plus everything they transitively require
    pub fn closure(&self, roots: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        let mut selected = BTreeSet::new();
        let mut stack: Vec<usize> = roots.into_iter().collect();
        while let Some(node) = stack.pop() {
            if selected.insert(node) {
                stack.extend(self.requires[node].iter().copied());
            }
        }
        selected
    }

    /// Dependencies-first order of a dependency-closed selection
    ///
    /// Among modules whose dependencies are all placed, the earliest in the
    /// catalog goes next.
    pub fn order(&self, selected: &BTreeSet<usize>) -> Vec<usize> {
        let mut waiting: HashMap<usize, usize> = selected
            .iter()
            .map(|&node| {
                let count = self.requires[node]
                    .iter()
                    .filter(|dep| selected.contains(dep))
                    .count();
                (node, count)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = waiting
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&node, _)| Reverse(node))
            .collect();

        let mut ordered = Vec::with_capacity(selected.len());
        while let Some(Reverse(node)) = ready.pop() {
            ordered.push(node);
            for dependent in &self.dependents[node] {
                if let Some(count) = waiting.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(*dependent));
                        waiting.remove(dependent);
                    }
                }
            }
        }
        ordered
    }
}

/// Whether the configuration (or the module's own default) switches it on
pub(crate) fn is_configured_on(descriptor: &ModuleDescriptor, config: &ActivationConfig) -> bool {
    config
        .get(&descriptor.id)
        .map(|setting| setting.is_enabled())
        .unwrap_or(descriptor.default_enabled)
}

/// Ordered identifiers of every module that runs under `config`
///
/// # Errors
/// Fails on an invalid catalog (invalid or duplicate identifiers, unknown
/// dependencies, cycles) regardless of what `config` selects.
pub fn resolve(descriptors: &[ModuleDescriptor], config: &ActivationConfig) -> ModuleResult<Vec<String>> {
    let graph = DependencyGraph::build(descriptors)?;
    Ok(resolve_positions(&graph, config)
        .into_iter()
        .map(|position| descriptors[position].id.clone())
        .collect())
}

pub(crate) fn resolve_positions(graph: &DependencyGraph<'_>, config: &ActivationConfig) -> Vec<usize> {
    for id in config.module_ids() {
        if graph.position(id).is_none() {
            log::warn!("Ignoring configuration for unknown module '{}'", id);
        }
    }

    let roots = graph
        .descriptors
        .iter()
        .enumerate()
        .filter(|(_, descriptor)| is_configured_on(descriptor, config))
        .map(|(position, _)| position);

    let selected = graph.closure(roots);
    let ordered = graph.order(&selected);
    log::debug!(
        "Resolved {} of {} module(s): {:?}",
        ordered.len(),
        graph.descriptors.len(),
        ordered
            .iter()
            .map(|&p| graph.descriptors[p].id.as_str())
            .collect::<Vec<_>>()
    );
    ordered
}
