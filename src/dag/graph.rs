// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::engine::{Identity, TaskDefinition};
use crate::store::ResourceStore;

/// Static view of a set of task definitions, for diagnostics only.
///
/// The engine never consults this when scheduling. It exists so that dry
/// runs and failed runs can explain *why* a graph cannot make progress.
///
/// Edge direction: dependency -> task. For a task `b.png` with
/// `deps = ["a.png"]` we add the edge `a.png -> b.png`.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<Identity, ()>,
    /// Task identities in submission order.
    tasks: Vec<Identity>,
    deps: HashMap<Identity, Vec<Identity>>,
}

/// Explanation of an unsatisfiable run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StuckReport {
    /// Stuck tasks that wait directly on inputs nobody produces and that do
    /// not exist, with those inputs.
    pub missing_inputs: Vec<(Identity, Vec<Identity>)>,
    /// Cycles among the stuck tasks.
    pub cycles: Vec<Vec<Identity>>,
    /// Stuck tasks blocked only because something they depend on is stuck.
    pub blocked: Vec<Identity>,
}

impl TaskGraph {
    pub fn from_definitions<'a, I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskDefinition>,
    {
        let mut graph = DiGraph::new();
        let mut index: HashMap<Identity, NodeIndex> = HashMap::new();
        let mut tasks = Vec::new();
        let mut deps = HashMap::new();

        let mut node = |graph: &mut DiGraph<Identity, ()>, id: &str| -> NodeIndex {
            *index
                .entry(id.to_string())
                .or_insert_with(|| graph.add_node(id.to_string()))
        };

        for definition in definitions {
            let task_node = node(&mut graph, &definition.identity);
            for dep in definition.dependencies.iter() {
                let dep_node = node(&mut graph, dep);
                graph.update_edge(dep_node, task_node, ());
            }
            tasks.push(definition.identity.clone());
            deps.insert(definition.identity.clone(), definition.dependencies.clone());
        }

        Self {
            graph,
            tasks,
            deps,
        }
    }

    /// Task identities in submission order.
    pub fn tasks(&self) -> &[Identity] {
        &self.tasks
    }

    /// Direct dependencies of a task.
    pub fn dependencies_of(&self, identity: &str) -> &[Identity] {
        self.deps.get(identity).map(|d| d.as_slice()).unwrap_or(&[])
    }

    pub fn is_task(&self, identity: &str) -> bool {
        self.deps.contains_key(identity)
    }

    /// Dependencies that no task produces, in first-seen order.
    pub fn external_inputs(&self) -> Vec<Identity> {
        let mut seen = HashSet::new();
        let mut inputs = Vec::new();
        for task in self.tasks.iter() {
            for dep in self.dependencies_of(task) {
                if !self.is_task(dep) && seen.insert(dep.as_str()) {
                    inputs.push(dep.clone());
                }
            }
        }
        inputs
    }

    /// External inputs that do not exist in `store`.
    pub fn missing_inputs(&self, store: &dyn ResourceStore) -> Vec<Identity> {
        self.external_inputs()
            .into_iter()
            .filter(|input| !store.exists(input))
            .collect()
    }

    /// Tasks whose dependencies are all external inputs (or that have none).
    pub fn roots(&self) -> Vec<Identity> {
        self.tasks
            .iter()
            .filter(|task| self.dependencies_of(task).iter().all(|d| !self.is_task(d)))
            .cloned()
            .collect()
    }

    /// Every cycle among tasks, including self-dependencies.
    ///
    /// Each cycle is sorted; cycles are ordered by their first member.
    pub fn cycles(&self) -> Vec<Vec<Identity>> {
        let mut cycles: Vec<Vec<Identity>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| self.graph.contains_edge(*n, *n))
            })
            .map(|component| {
                let mut members: Vec<Identity> = component
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Explain why the given tasks could not start.
    pub fn diagnose(&self, stuck: &[Identity], store: &dyn ResourceStore) -> StuckReport {
        let stuck_set: HashSet<&str> = stuck.iter().map(|s| s.as_str()).collect();

        let mut report = StuckReport {
            cycles: self
                .cycles()
                .into_iter()
                .filter(|cycle| cycle.iter().any(|id| stuck_set.contains(id.as_str())))
                .collect(),
            ..StuckReport::default()
        };

        let in_cycle: HashSet<&str> = report
            .cycles
            .iter()
            .flatten()
            .map(|id| id.as_str())
            .collect();

        for task in stuck.iter() {
            let missing: Vec<Identity> = self
                .dependencies_of(task)
                .iter()
                .filter(|dep| !self.is_task(dep) && !store.exists(dep))
                .cloned()
                .collect();

            if !missing.is_empty() {
                report.missing_inputs.push((task.clone(), missing));
            } else if !in_cycle.contains(task.as_str()) {
                report.blocked.push(task.clone());
            }
        }

        report
    }
}
