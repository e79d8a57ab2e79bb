//! Network topology: nodes and routes.
//!
//! The distribution network is a directed graph. Vertices are physical
//! locations with storage/processing capabilities; edges are transport
//! routes with a mode, a transit time, and a per-unit cost. A petgraph
//! view of the topology backs the reachability checks used at validation
//! time.

use crate::ids::NodeId;
use crate::product::StorageState;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Functional role of a network node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Manufacturing,
    Hub,
    FrozenBuffer,
    Breadroom,
}

/// A network vertex.
///
/// Capability bits are independent of the role: a hub may store frozen
/// stock, a breadroom may be able to thaw, and so on. Validation only
/// requires that flows through the node respect the bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub role: NodeRole,
    #[serde(default)]
    pub produces: bool,
    #[serde(default)]
    pub stores_ambient: bool,
    #[serde(default)]
    pub stores_frozen: bool,
    #[serde(default)]
    pub stores_thawed: bool,
    #[serde(default)]
    pub can_freeze: bool,
    #[serde(default)]
    pub can_thaw: bool,
    #[serde(default)]
    pub has_demand: bool,
    /// Optional storage capacity in units, per state
    #[serde(default)]
    pub ambient_capacity: Option<f64>,
    #[serde(default)]
    pub frozen_capacity: Option<f64>,
    #[serde(default)]
    pub thawed_capacity: Option<f64>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, role: NodeRole) -> Self {
        Node {
            id: id.into(),
            name: name.into(),
            role,
            produces: false,
            stores_ambient: false,
            stores_frozen: false,
            stores_thawed: false,
            can_freeze: false,
            can_thaw: false,
            has_demand: false,
            ambient_capacity: None,
            frozen_capacity: None,
            thawed_capacity: None,
        }
    }

    /// A manufacturing site: produces into ambient storage.
    pub fn manufacturing(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let mut n = Node::new(id, name, NodeRole::Manufacturing);
        n.produces = true;
        n.stores_ambient = true;
        n
    }

    /// A hub: stores and forwards ambient stock.
    pub fn hub(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let mut n = Node::new(id, name, NodeRole::Hub);
        n.stores_ambient = true;
        n
    }

    /// A frozen buffer: receives ambient, freezes, stores and ships frozen.
    pub fn frozen_buffer(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let mut n = Node::new(id, name, NodeRole::FrozenBuffer);
        n.stores_ambient = true;
        n.stores_frozen = true;
        n.can_freeze = true;
        n
    }

    /// A demand point consuming ambient stock.
    pub fn breadroom(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let mut n = Node::new(id, name, NodeRole::Breadroom);
        n.stores_ambient = true;
        n.has_demand = true;
        n
    }

    /// A demand point served via frozen shipments that thaw on arrival.
    pub fn thawing_breadroom(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let mut n = Node::new(id, name, NodeRole::Breadroom);
        n.stores_thawed = true;
        n.has_demand = true;
        n
    }

    pub fn stores(&self, state: StorageState) -> bool {
        match state {
            StorageState::Ambient => self.stores_ambient,
            StorageState::Frozen => self.stores_frozen,
            StorageState::Thawed => self.stores_thawed,
        }
    }

    pub fn capacity(&self, state: StorageState) -> Option<f64> {
        match state {
            StorageState::Ambient => self.ambient_capacity,
            StorageState::Frozen => self.frozen_capacity,
            StorageState::Thawed => self.thawed_capacity,
        }
    }

    /// States this node can hold, in fixed order.
    pub fn storable_states(&self) -> impl Iterator<Item = StorageState> + '_ {
        StorageState::ALL.into_iter().filter(|s| self.stores(*s))
    }
}

/// Transport mode of a route. Mass travels in the state the mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Ambient,
    Frozen,
}

impl TransportMode {
    pub fn ship_state(&self) -> StorageState {
        match self {
            TransportMode::Ambient => StorageState::Ambient,
            TransportMode::Frozen => StorageState::Frozen,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Ambient => write!(f, "ambient"),
            TransportMode::Frozen => write!(f, "frozen"),
        }
    }
}

/// A directed transport edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub origin: NodeId,
    pub destination: NodeId,
    pub mode: TransportMode,
    pub transit_days: u32,
    pub cost_per_unit: f64,
}

impl Route {
    pub fn new(
        origin: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        mode: TransportMode,
        transit_days: u32,
        cost_per_unit: f64,
    ) -> Self {
        Route {
            origin: origin.into(),
            destination: destination.into(),
            mode,
            transit_days,
            cost_per_unit,
        }
    }
}

/// The full topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub routes: Vec<Route>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// The state a shipment on `route` lands in at the destination.
    ///
    /// Frozen arrivals at a node without frozen storage thaw on delivery,
    /// which restarts the shelf-life clock.
    pub fn arrival_state(&self, route: &Route) -> Option<StorageState> {
        let dest = self.node(&route.destination)?;
        let shipped = route.mode.ship_state();
        if shipped == StorageState::Frozen && !dest.stores_frozen && dest.stores_thawed {
            Some(StorageState::Thawed)
        } else if dest.stores(shipped) {
            Some(shipped)
        } else {
            None
        }
    }

    /// Build a petgraph view of the topology for path queries.
    pub fn graph(&self) -> (DiGraph<NodeId, u32>, HashMap<NodeId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for node in &self.nodes {
            let ix = graph.add_node(node.id.clone());
            index.insert(node.id.clone(), ix);
        }
        for route in &self.routes {
            if let (Some(&a), Some(&b)) = (index.get(&route.origin), index.get(&route.destination))
            {
                graph.add_edge(a, b, route.transit_days);
            }
        }
        (graph, index)
    }

    /// Is `to` reachable from `from` over the directed route graph?
    /// A node always reaches itself.
    pub fn is_reachable(&self, from: &NodeId, to: &NodeId) -> bool {
        if from == to {
            return true;
        }
        let (graph, index) = self.graph();
        match (index.get(from), index.get(to)) {
            (Some(&a), Some(&b)) => petgraph::algo::has_path_connecting(&graph, a, b, None),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_network() -> Network {
        let mut net = Network::new();
        net.add_node(Node::manufacturing("mfg", "Plant"));
        net.add_node(Node::frozen_buffer("buf", "Buffer"));
        net.add_node(Node::thawing_breadroom("wa", "Western"));
        net.add_route(Route::new("mfg", "buf", TransportMode::Ambient, 1, 0.05));
        net.add_route(Route::new("buf", "wa", TransportMode::Frozen, 3, 0.30));
        net
    }

    #[test]
    fn test_reachability() {
        let net = small_network();
        assert!(net.is_reachable(&NodeId::new("mfg"), &NodeId::new("wa")));
        assert!(!net.is_reachable(&NodeId::new("wa"), &NodeId::new("mfg")));
    }

    #[test]
    fn test_frozen_route_thaws_on_arrival() {
        let net = small_network();
        let frozen_leg = &net.routes[1];
        assert_eq!(net.arrival_state(frozen_leg), Some(StorageState::Thawed));

        let ambient_leg = &net.routes[0];
        assert_eq!(net.arrival_state(ambient_leg), Some(StorageState::Ambient));
    }

    #[test]
    fn test_arrival_state_rejects_unstorable() {
        let mut net = Network::new();
        net.add_node(Node::manufacturing("mfg", "Plant"));
        // breadroom with ambient-only storage cannot take a frozen arrival
        net.add_node(Node::breadroom("br", "Room"));
        let route = Route::new("mfg", "br", TransportMode::Frozen, 1, 0.1);
        net.add_route(route.clone());
        assert_eq!(net.arrival_state(&route), None);
    }

    #[test]
    fn test_storable_states() {
        let node = Node::frozen_buffer("b", "B");
        let states: Vec<_> = node.storable_states().collect();
        assert_eq!(states, vec![StorageState::Ambient, StorageState::Frozen]);
    }
}
