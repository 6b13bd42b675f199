//! Forward and reverse lookups over cached dependencies

use crate::node::AssetNode;
use crate::path::PathSegment;
use crate::traversal::ASSET_NODE_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Direction in which edges are followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From an item to what it depends on
    #[default]
    Outgoing,
    /// From an item to what depends on it
    Incoming,
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "outgoing"),
            Direction::Incoming => write!(f, "incoming"),
            Direction::Both => write!(f, "both"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "outgoing" | "out" => Ok(Direction::Outgoing),
            "incoming" | "in" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// A dependency with its source attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub connection_type: String,
    pub target_node_type: String,
    /// Resolver that produced this edge
    pub resolver_id: String,
    pub path: Vec<PathSegment>,
}

impl Edge {
    /// Path names joined with `/`
    pub fn path_display(&self) -> String {
        self.path
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Node reached when following this edge away from `from`
    fn other_end(&self, from: &str) -> &str {
        if self.source == from {
            &self.target
        } else {
            &self.source
        }
    }
}

/// What is known about an id referenced from the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub id: String,
    pub node_type: String,
    /// False for asset targets that have no node of their own, e.g. after the
    /// asset was deleted
    pub existing: bool,
}

/// Shortest chain of edges between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChain {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

impl DependencyChain {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Lookup statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub nodes_visited: usize,
    pub edges_traversed: usize,
    pub max_depth_reached: usize,
    pub path_found: bool,
}

/// Result of a transitive lookup or chain search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupResult {
    pub start: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Reached ids in breadth-first order, excluding `start`
    pub visited: Vec<String>,

    /// Edges whose both ends were reached, in index order
    pub edges: Vec<Edge>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<DependencyChain>,

    pub stats: LookupStats,
}

/// Index over the edges of a set of nodes
///
/// Forward lists come straight from the nodes; reverse lists invert them.
/// Edge order is node order, then resolver order, then dependency order.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    edges: Vec<Edge>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
    nodes: HashSet<String>,
    target_types: HashMap<String, String>,
}

impl DependencyIndex {
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a AssetNode>) -> Self {
        let mut index = Self::default();

        for node in nodes {
            index.nodes.insert(node.asset_id.clone());
            for data in &node.resolver_datas {
                for dependency in &data.dependencies {
                    let position = index.edges.len();
                    index
                        .outgoing
                        .entry(node.asset_id.clone())
                        .or_default()
                        .push(position);
                    index
                        .incoming
                        .entry(dependency.target_id.clone())
                        .or_default()
                        .push(position);
                    index
                        .target_types
                        .entry(dependency.target_id.clone())
                        .or_insert_with(|| dependency.target_node_type.clone());
                    index.edges.push(Edge {
                        source: node.asset_id.clone(),
                        target: dependency.target_id.clone(),
                        connection_type: dependency.connection_type.clone(),
                        target_node_type: dependency.target_node_type.clone(),
                        resolver_id: data.resolver_id.clone(),
                        path: dependency.path.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            "Built dependency index: {} nodes, {} edges",
            index.nodes.len(),
            index.edges.len()
        );
        index
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether `id` is a cached node or the target of any edge
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id) || self.incoming.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &str) -> Vec<&Edge> {
        self.collect(self.outgoing.get(id))
    }

    pub fn dependents_of(&self, id: &str) -> Vec<&Edge> {
        self.collect(self.incoming.get(id))
    }

    pub fn resolve_node(&self, id: &str) -> Option<ResolvedNode> {
        if !self.contains(id) {
            return None;
        }
        let is_node = self.nodes.contains(id);
        let node_type = match self.target_types.get(id) {
            Some(t) if !is_node => t.clone(),
            _ => ASSET_NODE_TYPE.to_string(),
        };
        let existing = is_node || node_type != ASSET_NODE_TYPE;
        Some(ResolvedNode {
            id: id.to_string(),
            node_type,
            existing,
        })
    }

    /// Breadth-first closure from `start`, at most `max_depth` edges deep
    pub fn transitive(&self, start: &str, direction: Direction, max_depth: usize) -> LookupResult {
        tracing::debug!(
            "Transitive lookup: start={}, direction={}, depth={}",
            start,
            direction,
            max_depth
        );

        let mut seen: HashSet<&str> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        let mut stats = LookupStats::default();

        seen.insert(start);
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            stats.nodes_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            if depth >= max_depth {
                continue;
            }

            for edge in self.neighbors(current, direction) {
                stats.edges_traversed += 1;
                let next = edge.other_end(current);
                if seen.insert(next) {
                    order.push(next.to_string());
                    queue.push_back((next, depth + 1));
                }
            }
        }

        let edges = self
            .edges
            .iter()
            .filter(|e| seen.contains(e.source.as_str()) && seen.contains(e.target.as_str()))
            .cloned()
            .collect();

        LookupResult {
            start: start.to_string(),
            target: None,
            visited: order,
            edges,
            chain: None,
            stats,
        }
    }

    /// Shortest chain of outgoing edges from `from` to `to`
    pub fn find_chain(&self, from: &str, to: &str, max_depth: usize) -> LookupResult {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut parent: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        let mut stats = LookupStats::default();

        seen.insert(from);
        queue.push_back((from, 0));

        while let Some((current, depth)) = queue.pop_front() {
            stats.nodes_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            if current == to {
                stats.path_found = true;
                tracing::debug!("Chain found at depth {}", depth);
                break;
            }
            if depth >= max_depth {
                continue;
            }

            for &position in self.outgoing.get(current).into_iter().flatten() {
                stats.edges_traversed += 1;
                let next = self.edges[position].target.as_str();
                if seen.insert(next) {
                    parent.insert(next, position);
                    order.push(next.to_string());
                    queue.push_back((next, depth + 1));
                }
            }
        }

        let chain = stats.path_found.then(|| self.reconstruct(from, to, &parent));

        LookupResult {
            start: from.to_string(),
            target: Some(to.to_string()),
            visited: order,
            edges: Vec::new(),
            chain,
            stats,
        }
    }

    fn reconstruct(&self, from: &str, to: &str, parent: &HashMap<&str, usize>) -> DependencyChain {
        let mut nodes = vec![to.to_string()];
        let mut edges = Vec::new();
        let mut current = to;

        while current != from {
            let Some(&position) = parent.get(current) else {
                break;
            };
            let edge = &self.edges[position];
            edges.push(edge.clone());
            nodes.push(edge.source.clone());
            current = &edge.source;
        }

        nodes.reverse();
        edges.reverse();
        DependencyChain { nodes, edges }
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&Edge> {
        match direction {
            Direction::Outgoing => self.dependencies_of(id),
            Direction::Incoming => self.dependents_of(id),
            Direction::Both => {
                let mut positions: Vec<usize> = self
                    .outgoing
                    .get(id)
                    .into_iter()
                    .chain(self.incoming.get(id))
                    .flatten()
                    .copied()
                    .collect();
                positions.sort_unstable();
                positions.dedup();
                positions.into_iter().map(|p| &self.edges[p]).collect()
            }
        }
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<&Edge> {
        positions
            .map(|ps| ps.iter().map(|&p| &self.edges[p]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;
    use crate::node::ResolverData;

    fn asset(id: &str, targets: &[&str]) -> AssetNode {
        let deps = targets
            .iter()
            .map(|t| {
                Dependency::new(*t, "Object", "Asset", vec![PathSegment::property("m_Ref")])
            })
            .collect();
        AssetNode::new(id)
            .with_resolver_data(ResolverData::new("objects", 1).with_dependencies(deps))
    }

    // A -> B -> C -> D
    //      |    |
    //      v    v
    //      E -> F
    fn graph() -> Vec<AssetNode> {
        vec![
            asset("A", &["B"]),
            asset("B", &["C", "E"]),
            asset("C", &["D", "F"]),
            asset("D", &[]),
            asset("E", &["F"]),
            asset("F", &[]),
        ]
    }

    #[test]
    fn test_forward_and_reverse() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        assert_eq!(index.node_count(), 6);
        assert_eq!(index.edge_count(), 6);

        let deps: Vec<&str> =
            index.dependencies_of("B").iter().map(|e| e.target.as_str()).collect();
        assert_eq!(deps, vec!["C", "E"]);

        let dependents: Vec<&str> =
            index.dependents_of("F").iter().map(|e| e.source.as_str()).collect();
        assert_eq!(dependents, vec!["C", "E"]);

        assert!(index.dependents_of("A").is_empty());
        assert!(index.dependencies_of("missing").is_empty());
        assert_eq!(index.dependencies_of("A")[0].resolver_id, "objects");
    }

    #[test]
    fn test_resolve_node() {
        let mut nodes = graph();
        nodes.push(asset("G", &["deleted"]));
        nodes.push(
            AssetNode::new("H").with_resolver_data(
                ResolverData::new("loca", 1).with_dependencies(vec![Dependency::new(
                    "title",
                    "LocaKey",
                    "LocaKey",
                    vec![],
                )]),
            ),
        );
        let index = DependencyIndex::build(&nodes);

        let a = index.resolve_node("A").unwrap();
        assert_eq!(a.node_type, "Asset");
        assert!(a.existing);

        let deleted = index.resolve_node("deleted").unwrap();
        assert_eq!(deleted.node_type, "Asset");
        assert!(!deleted.existing);

        let key = index.resolve_node("title").unwrap();
        assert_eq!(key.node_type, "LocaKey");
        assert!(key.existing);

        assert!(index.resolve_node("nowhere").is_none());
    }

    #[test]
    fn test_transitive_outgoing() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        let result = index.transitive("B", Direction::Outgoing, 10);
        assert_eq!(result.visited, vec!["C", "E", "D", "F"]);
        assert_eq!(result.edges.len(), 5);
        assert_eq!(result.stats.max_depth_reached, 2);

        let shallow = index.transitive("B", Direction::Outgoing, 1);
        assert_eq!(shallow.visited, vec!["C", "E"]);
    }

    #[test]
    fn test_transitive_incoming() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        let result = index.transitive("F", Direction::Incoming, 10);
        assert_eq!(result.visited, vec!["C", "E", "B", "A"]);
    }

    #[test]
    fn test_transitive_both() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        let result = index.transitive("D", Direction::Both, 10);
        assert_eq!(result.visited.len(), 5);
        assert!(result.visited.contains(&"A".to_string()));
    }

    #[test]
    fn test_cycles_terminate() {
        let nodes = vec![asset("A", &["B"]), asset("B", &["A", "B"])];
        let index = DependencyIndex::build(&nodes);

        let result = index.transitive("A", Direction::Outgoing, 100);
        assert_eq!(result.visited, vec!["B"]);
        assert_eq!(result.stats.nodes_visited, 2);
    }

    #[test]
    fn test_find_chain() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        let result = index.find_chain("A", "D", 10);
        assert!(result.stats.path_found);
        let chain = result.chain.unwrap();
        assert_eq!(chain.nodes, vec!["A", "B", "C", "D"]);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.edges[0].path_display(), "m_Ref");
    }

    #[test]
    fn test_find_chain_respects_direction_and_depth() {
        let nodes = graph();
        let index = DependencyIndex::build(&nodes);

        assert!(index.find_chain("D", "A", 10).chain.is_none());
        assert!(index.find_chain("A", "D", 2).chain.is_none());

        let same = index.find_chain("A", "A", 0);
        assert!(same.stats.path_found);
        assert!(same.chain.unwrap().is_empty());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::Incoming);
        assert_eq!("Both".parse::<Direction>().unwrap(), Direction::Both);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
