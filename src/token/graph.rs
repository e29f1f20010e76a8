//! Token reference graph and cycle detection.
//!
//! An edge `A -> B` exists when the value of `A` contains `@@@B@@@`. Cycles are
//! found with Tarjan's strongly-connected-components algorithm: every
//! component with more than one member, or a single member referencing
//! itself, is a cycle. All of them are collected before reporting.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{referenced_names, TokenTable};
use crate::error::{Error, Result};

/// Token name to the names its value references, one level deep.
pub type TokenGraph = BTreeMap<String, Vec<String>>;

/// Build the reference graph of a token table.
pub fn build_graph(table: &TokenTable) -> TokenGraph {
    table
        .iter()
        .map(|(name, value)| {
            let mut edges: Vec<String> = Vec::new();
            for referenced in referenced_names(value) {
                if !edges.iter().any(|e| e == referenced) {
                    edges.push(referenced.to_string());
                }
            }
            (name.to_string(), edges)
        })
        .collect()
}

/// Every cycle in the graph, each sorted by name, in name order.
pub fn find_cycles(graph: &TokenGraph) -> Vec<Vec<String>> {
    let mut tarjan = Tarjan::new(graph);
    for node in graph.keys() {
        if !tarjan.indices.contains_key(node.as_str()) {
            tarjan.strong_connect(node);
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan
        .components
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph
                .get(single)
                .is_some_and(|edges| edges.iter().any(|e| e == single)),
            _ => true,
        })
        .map(|mut component| {
            component.sort();
            component
        })
        .collect();
    cycles.sort();
    cycles
}

/// Fail with every offending component if the graph has a cycle.
pub fn assert_acyclic(graph: &TokenGraph) -> Result<()> {
    let components = find_cycles(graph);
    if components.is_empty() {
        Ok(())
    } else {
        Err(Error::CycleDetected { components })
    }
}

struct Tarjan<'g> {
    graph: &'g TokenGraph,
    next_index: usize,
    indices: HashMap<&'g str, usize>,
    lowlinks: HashMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: HashSet<&'g str>,
    components: Vec<Vec<String>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g TokenGraph) -> Self {
        Self {
            graph,
            next_index: 0,
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        }
    }

    fn strong_connect(&mut self, v: &'g str) {
        self.indices.insert(v, self.next_index);
        self.lowlinks.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        // References to undefined tokens have no entry and no edges.
        let graph = self.graph;
        if let Some(successors) = graph.get(v) {
            for w in successors {
                let w = w.as_str();
                if !self.indices.contains_key(w) {
                    self.strong_connect(w);
                    let low = self.lowlinks[v].min(self.lowlinks[w]);
                    self.lowlinks.insert(v, low);
                } else if self.on_stack.contains(w) {
                    let low = self.lowlinks[v].min(self.indices[w]);
                    self.lowlinks.insert(v, low);
                }
            }
        }

        if self.lowlinks[v] == self.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(w);
                component.push(w.to_string());
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
