use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::domain::network::node::{Node, Position};
use crate::domain::utils::id::NodeId;
use crate::error::ConversionError;

static NO_NEIGHBORS: BTreeSet<NodeId> = BTreeSet::new();

/// Read-only view of the mesh the scheduler works on.
///
/// The scheduler never mutates the topology. Paths are expected to be deterministic: two calls
/// with the same endpoints return the same sequence.
pub trait TopologyProvider: std::fmt::Debug {
    /// All node ids in ascending order.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Direct neighbors of `node`. Unknown nodes have no neighbors.
    fn neighbors(&self, node: NodeId) -> &BTreeSet<NodeId>;

    /// Shortest hop path from `source` to `target`, both endpoints included.
    ///
    /// # Returns
    /// An empty slice if `target` is unreachable, `[source]` if both are the same node.
    fn shortest_hop_path(&self, source: NodeId, target: NodeId) -> &[NodeId];

    /// Number of hops on the shortest path, `None` if unreachable.
    fn hop_distance(&self, source: NodeId, target: NodeId) -> Option<usize> {
        self.shortest_hop_path(source, target).len().checked_sub(1)
    }

    fn is_neighbor(&self, node: NodeId, other: NodeId) -> bool {
        self.neighbors(node).contains(&other)
    }
}

/// Undirected mesh topology with a precomputed all-pairs shortest path cache.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    /// All nodes of the mesh, indexed by their id.
    nodes: BTreeMap<NodeId, Node>,

    /// Shortest hop paths between every pair of mutually reachable nodes.
    /// Unreachable pairs are absent.
    path_cache: HashMap<(NodeId, NodeId), Vec<NodeId>>,
}

impl NetworkTopology {
    /// Builds a topology from an undirected edge list. The node set is the set of edge endpoints.
    pub fn from_edges(edges: &[(u32, u32)]) -> Result<Self, ConversionError> {
        Self::from_nodes_and_edges(&[], edges)
    }

    /// Builds a topology from an explicit node list plus an undirected edge list.
    ///
    /// Nodes listed in `node_ids` without any edge stay isolated. Edge endpoints which are not
    /// listed are added as well.
    pub fn from_nodes_and_edges(node_ids: &[u32], edges: &[(u32, u32)]) -> Result<Self, ConversionError> {
        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();

        for id in node_ids {
            let node_id = NodeId::new(*id);
            nodes.entry(node_id).or_insert_with(|| Node::new(node_id, None));
        }

        for (u, v) in edges {
            let (u, v) = (NodeId::new(*u), NodeId::new(*v));
            nodes.entry(u).or_insert_with(|| Node::new(u, None));
            nodes.entry(v).or_insert_with(|| Node::new(v, None));
        }

        Self::setup_adjacency(&mut nodes, edges.iter().map(|(u, v)| (NodeId::new(*u), NodeId::new(*v))));
        Self::build(nodes)
    }

    /// A chain `0 - 1 - ... - (n-1)`.
    pub fn line(num_of_nodes: u32) -> Result<Self, ConversionError> {
        let edges: Vec<(u32, u32)> = (1..num_of_nodes).map(|i| (i - 1, i)).collect();
        Self::from_nodes_and_edges(&(0..num_of_nodes).collect::<Vec<_>>(), &edges)
    }

    /// A `rows x cols` grid with unit-weight edges between horizontal and vertical neighbors.
    ///
    /// Nodes are numbered row-major. Node `(r, c)` is placed at `(c * spacing, r * spacing)`.
    pub fn grid(rows: u32, cols: u32, spacing: f64) -> Result<Self, ConversionError> {
        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();

        for r in 0..rows {
            for c in 0..cols {
                let id = NodeId::new(r * cols + c);
                nodes.insert(id, Node::new(id, Some(Position::new(c as f64 * spacing, r as f64 * spacing))));

                if c + 1 < cols {
                    edges.push((id, NodeId::new(r * cols + c + 1)));
                }
                if r + 1 < rows {
                    edges.push((id, NodeId::new((r + 1) * cols + c)));
                }
            }
        }

        Self::setup_adjacency(&mut nodes, edges.into_iter());
        Self::build(nodes)
    }

    /// Connects every pair of nodes whose euclidean distance is at most `radius`.
    ///
    /// Node ids follow the order of `positions`.
    pub fn unit_disk(positions: &[Position], radius: f64) -> Result<Self, ConversionError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(ConversionError::InvalidConfiguration(format!("Unit disk radius must be a non-negative number, got {}", radius)));
        }

        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        for (index, position) in positions.iter().enumerate() {
            let id = NodeId::new(index as u32);
            nodes.insert(id, Node::new(id, Some(*position)));
        }

        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
        for (i, a) in positions.iter().enumerate() {
            for (j, b) in positions.iter().enumerate().skip(i + 1) {
                if a.distance_to(b) <= radius {
                    edges.push((NodeId::new(i as u32), NodeId::new(j as u32)));
                }
            }
        }

        Self::setup_adjacency(&mut nodes, edges.into_iter());
        Self::build(nodes)
    }

    fn setup_adjacency(nodes: &mut BTreeMap<NodeId, Node>, edges: impl Iterator<Item = (NodeId, NodeId)>) {
        for (u, v) in edges {
            if u == v {
                log::warn!("InvalidTopologyConfiguration: Self loop on node {} is ignored.", u);
                continue;
            }
            if let Some(node) = nodes.get_mut(&u) {
                node.neighbors.insert(v);
            }
            if let Some(node) = nodes.get_mut(&v) {
                node.neighbors.insert(u);
            }
        }
    }

    fn build(nodes: BTreeMap<NodeId, Node>) -> Result<Self, ConversionError> {
        if nodes.is_empty() {
            return Err(ConversionError::EmptyTopology);
        }

        let mut topology = NetworkTopology { nodes, path_cache: HashMap::new() };
        topology.calc_all_paths();

        log::debug!("Topology built: {} nodes, {} links, {} reachable pairs.", topology.num_of_nodes(), topology.num_of_links(), topology.path_cache.len());
        Ok(topology)
    }

    /// Fills the path cache with one BFS per source node.
    ///
    /// Neighbors are expanded in ascending id order, so among equally short paths the one through
    /// the lowest ids is chosen.
    fn calc_all_paths(&mut self) {
        self.path_cache.clear();
        let node_ids: Vec<NodeId> = self.nodes.keys().copied().collect();

        for source in node_ids {
            let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
            let mut visited: BTreeSet<NodeId> = BTreeSet::new();
            let mut queue: VecDeque<NodeId> = VecDeque::new();

            visited.insert(source);
            queue.push_back(source);

            while let Some(current) = queue.pop_front() {
                for next in self.neighbors(current) {
                    if visited.insert(*next) {
                        parent.insert(*next, current);
                        queue.push_back(*next);
                    }
                }
            }

            for target in visited {
                let mut path = vec![target];
                let mut cursor = target;
                while let Some(previous) = parent.get(&cursor) {
                    path.push(*previous);
                    cursor = *previous;
                }
                path.reverse();
                self.path_cache.insert((source, target), path);
            }
        }
    }

    pub fn get_node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn num_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected links.
    pub fn num_of_links(&self) -> usize {
        self.nodes.values().map(Node::degree).sum::<usize>() / 2
    }
}

impl TopologyProvider for NetworkTopology {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn neighbors(&self, node: NodeId) -> &BTreeSet<NodeId> {
        match self.nodes.get(&node) {
            Some(node) => &node.neighbors,
            None => &NO_NEIGHBORS,
        }
    }

    fn shortest_hop_path(&self, source: NodeId, target: NodeId) -> &[NodeId] {
        match self.path_cache.get(&(source, target)) {
            Some(path) => path.as_slice(),
            None => &[],
        }
    }
}
