//! Index-based dependency graph with cycle detection.
//!
//! Nodes live in an arena and edges are adjacency lists of indices. Traversal
//! uses an explicit stack so deep graphs cannot overflow the call stack.

use std::collections::{HashMap, HashSet, VecDeque};

/// A cycle found while walking a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Circular dependency: {}", render_cycle(.cycle))]
pub struct CycleError {
    /// Nodes on the cycle, starting from the node that was revisited
    pub cycle: Vec<String>,
}

fn render_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => String::new(),
    }
}

/// Result of a full traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traversal {
    /// Post-order: every node appears after the nodes it depends on,
    /// except along the edges that close a cycle
    pub order: Vec<String>,

    /// Cycles found, in discovery order. Every node that lies on any cycle
    /// appears in at least one of them.
    pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Directed graph where an edge `a -> b` means "a depends on b".
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Adding an existing name is a no-op.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.edges.push(Vec::new());
        idx
    }

    /// Record that `from` depends on `to`. Missing nodes are created.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Direct dependencies of a node.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&idx| {
                self.edges[idx]
                    .iter()
                    .map(|&dep| self.names[dep].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walk every node depth-first in insertion order.
    ///
    /// A node revisited while still on the stack closes a cycle; the cycle is
    /// recorded and the walk continues so callers get a complete order.
    /// Nodes that are cyclic only through already finished nodes get a cycle
    /// of their own afterwards.
    pub fn walk(&self) -> Traversal {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut traversal = Traversal::default();

        for root in 0..self.names.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // (node, index of the next edge to follow)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::Visiting;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                match self.edges[node].get(frame.1) {
                    Some(&dep) => {
                        frame.1 += 1;
                        match marks[dep] {
                            Mark::Unvisited => {
                                marks[dep] = Mark::Visiting;
                                stack.push((dep, 0));
                            }
                            Mark::Visiting => {
                                let start = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                                let cycle = stack[start..]
                                    .iter()
                                    .map(|&(n, _)| self.names[n].clone())
                                    .collect();
                                traversal.cycles.push(cycle);
                            }
                            Mark::Visited => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Visited;
                        traversal.order.push(self.names[node].clone());
                        stack.pop();
                    }
                }
            }
        }

        let mut covered: HashSet<String> = traversal.cycles.iter().flatten().cloned().collect();
        for component in self.cyclic_components() {
            let members: HashSet<usize> = component.iter().copied().collect();
            for &node in &component {
                if covered.contains(&self.names[node]) {
                    continue;
                }
                if let Some(cycle) = self.cycle_through(node, &members) {
                    covered.extend(cycle.iter().cloned());
                    traversal.cycles.push(cycle);
                }
            }
        }

        traversal
    }

    /// Strongly connected components that contain a cycle, members sorted by
    /// insertion order. Iterative Tarjan.
    fn cyclic_components(&self) -> Vec<Vec<usize>> {
        const UNSEEN: usize = usize::MAX;

        let n = self.names.len();
        let mut index = vec![UNSEEN; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next = 0;
        let mut components = Vec::new();

        for root in 0..n {
            if index[root] != UNSEEN {
                continue;
            }

            index[root] = next;
            low[root] = next;
            next += 1;
            stack.push(root);
            on_stack[root] = true;
            let mut calls: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = calls.last_mut() {
                let node = frame.0;
                if let Some(&dep) = self.edges[node].get(frame.1) {
                    frame.1 += 1;
                    if index[dep] == UNSEEN {
                        index[dep] = next;
                        low[dep] = next;
                        next += 1;
                        stack.push(dep);
                        on_stack[dep] = true;
                        calls.push((dep, 0));
                    } else if on_stack[dep] {
                        low[node] = low[node].min(index[dep]);
                    }
                    continue;
                }

                calls.pop();
                if let Some(&(parent, _)) = calls.last() {
                    low[parent] = low[parent].min(low[node]);
                }
                if low[node] != index[node] {
                    continue;
                }

                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                if component.len() > 1 || self.edges[node].contains(&node) {
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }

        components
    }

    /// Shortest cycle from `start` back to itself, staying inside `members`.
    fn cycle_through(&self, start: usize, members: &HashSet<usize>) -> Option<Vec<String>> {
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for &dep in &self.edges[node] {
                if dep == start {
                    let mut path = vec![node];
                    let mut cur = node;
                    while cur != start {
                        match parent.get(&cur) {
                            Some(&prev) => {
                                path.push(prev);
                                cur = prev;
                            }
                            None => break,
                        }
                    }
                    path.reverse();
                    return Some(path.into_iter().map(|i| self.names[i].clone()).collect());
                }
                if members.contains(&dep) && !parent.contains_key(&dep) {
                    parent.insert(dep, node);
                    queue.push_back(dep);
                }
            }
        }

        None
    }

    /// First cycle in the graph, if any.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        self.walk().cycles.into_iter().next()
    }

    /// Dependencies-first order, or the first cycle found.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        let traversal = self.walk();
        match traversal.cycles.into_iter().next() {
            Some(cycle) => Err(CycleError { cycle }),
            None => Ok(traversal.order),
        }
    }
}
