//! Communication graph.
//!
//! Static directed adjacency declaring which agent may hand off to which.
//! Built once per agency and never mutated afterwards.

use std::collections::{HashMap, HashSet, VecDeque};

use super::error::GraphError;

/// Permitted handoff edges between agents.
#[derive(Debug, Clone, Default)]
pub struct CommunicationGraph {
    /// Outgoing targets per agent, in first-declared order.
    adjacency: HashMap<String, Vec<String>>,
    /// Edge set for constant-time membership.
    edges: HashSet<(String, String)>,
}

impl CommunicationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(from, to)` pairs.
    ///
    /// Self-edges are rejected; repeated edges are ignored.
    pub fn build<I, A, B>(edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to)?;
        }
        Ok(graph)
    }

    /// Add one edge. Returns `Ok(false)` when it was already present.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<bool, GraphError> {
        let from = from.into();
        let to = to.into();
        if from == to {
            return Err(GraphError::SelfEdge(from));
        }
        if !self.edges.insert((from.clone(), to.clone())) {
            log::debug!("Ignoring duplicate edge {} -> {}", from, to);
            return Ok(false);
        }
        self.adjacency.entry(from).or_default().push(to);
        Ok(true)
    }

    pub fn can_handoff(&self, from: &str, to: &str) -> bool {
        self.edges.contains(&(from.to_string(), to.to_string()))
    }

    /// Agents `from` may hand off to.
    pub fn allowed_targets(&self, from: &str) -> &[String] {
        self.adjacency.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `to` can be reached from `from` through zero or more edges.
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for next in self.allowed_targets(node) {
                if next == to {
                    return true;
                }
                if seen.insert(next.as_str()) {
                    queue.push_back(next.as_str());
                }
            }
        }
        false
    }

    /// Every agent name mentioned by an edge.
    pub fn agents(&self) -> HashSet<&str> {
        self.edges
            .iter()
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_can_handoff() {
        let graph = CommunicationGraph::build([("Coder", "Planner"), ("Planner", "Coder")]).unwrap();
        assert!(graph.can_handoff("Coder", "Planner"));
        assert!(graph.can_handoff("Planner", "Coder"));
        assert!(!graph.can_handoff("Coder", "Coder"));
        assert!(!graph.can_handoff("Coder", "Critic"));
    }

    #[test]
    fn test_self_edge_rejected() {
        let err = CommunicationGraph::build([("Coder", "Planner"), ("Critic", "Critic")]).unwrap_err();
        assert_eq!(err, GraphError::SelfEdge("Critic".into()));
    }

    #[test]
    fn test_duplicate_edges_are_idempotent() {
        let graph = CommunicationGraph::build([
            ("Coder", "Planner"),
            ("Coder", "Critic"),
            ("Coder", "Planner"),
        ])
        .unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.allowed_targets("Coder"), ["Planner", "Critic"]);
        assert!(graph.allowed_targets("Nobody").is_empty());
    }

    #[test]
    fn test_reachability_is_transitive() {
        let graph = CommunicationGraph::build([("A", "B"), ("B", "C"), ("C", "A"), ("D", "A")]).unwrap();
        assert!(graph.is_reachable("A", "C"));
        assert!(graph.is_reachable("C", "B"));
        assert!(graph.is_reachable("B", "B"));
        assert!(!graph.is_reachable("A", "D"));
        assert_eq!(graph.agents().len(), 4);
    }

    #[test]
    fn test_can_handoff_holds_for_every_declared_edge() {
        let names = ["a", "b", "c", "d"];
        let edges: Vec<(&str, &str)> = names
            .iter()
            .flat_map(|x| names.iter().filter(move |y| *y != x).map(move |y| (*x, *y)))
            .collect();
        let graph = CommunicationGraph::build(edges.clone()).unwrap();
        for (a, b) in edges {
            assert!(graph.can_handoff(a, b));
            assert!(!graph.can_handoff(a, a));
        }
    }
}
