// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::{earth_distance, Address, Point};

/// Errors returned by [RoadGraph::update_traffic_density].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TrafficError {
    /// The provided density is outside of the permitted [0, 1] interval
    /// (or not a number at all). Rejected rather than clamped, so that
    /// a misbehaving traffic feed is visible instead of silently distorted.
    #[error("traffic density {0} outside of [0, 1]")]
    DensityOutOfRange(f64),

    /// No edge between the two provided nodes exists in the graph.
    #[error("no edge from {0} to {1}")]
    UnknownEdge(i64, i64),
}

/// The tags of a [Node] actually consulted by graph construction,
/// derived once from the raw OSM tag map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeTags {
    pub name: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,

    /// Set when the raw tags carry a `bus` key, regardless of its value.
    pub bus_access: bool,
}

impl NodeTags {
    /// Derives the known tags from a raw OSM tag map. Empty values
    /// count as absent, since map data is inherently noisy.
    pub fn from_raw(tags: &HashMap<String, String>) -> Self {
        let get = |key: &str| tags.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            name: get("name"),
            street: get("addr:street"),
            house_number: get("addr:housenumber"),
            bus_access: tags.contains_key("bus"),
        }
    }
}

/// A tagged OSM node placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub osm_id: i64,
    pub point: Point,
    pub tags: NodeTags,
}

/// A bus-accessible OSM way, retained for edge provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Way {
    pub osm_id: i64,
    pub road_type: String,
    pub max_speed: f64,
    pub oneway: bool,
    pub name: Option<String>,
    pub refs: Vec<i64>,
}

/// A node which buses can stop at, derived from nodes tagged
/// with both a `bus` marker and a name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusStop {
    pub osm_id: i64,
    pub name: String,
    pub point: Point,
}

/// A directed arc of the road network, stored under its `from_node`.
///
/// All fields except the traffic density are immutable once inserted.
/// The density is kept as raw `f64` bits inside an atomic, so that an
/// external traffic feed can update it through a shared reference while
/// queries are running. Stale mid-update reads are tolerated by design.
#[derive(Debug)]
pub struct Edge {
    pub to_node: i64,
    pub max_speed: f64,
    pub road_type: String,
    pub way_id: i64,
    traffic_density_bits: AtomicU64,
}

impl Edge {
    pub fn new(to_node: i64, max_speed: f64, road_type: String, way_id: i64) -> Self {
        Self {
            to_node,
            max_speed,
            road_type,
            way_id,
            traffic_density_bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Current traffic density, a value in [0, 1]. Zero means free flow.
    pub fn traffic_density(&self) -> f64 {
        f64::from_bits(self.traffic_density_bits.load(Ordering::Relaxed))
    }

    fn set_traffic_density(&self, density: f64) {
        self.traffic_density_bits
            .store(density.to_bits(), Ordering::Relaxed);
    }

    /// The speed at which the edge can currently be traversed, in km/h:
    /// `max_speed` attenuated linearly by the traffic density.
    /// A fully congested edge (density 1) is impassable.
    pub fn effective_speed(&self) -> f64 {
        self.max_speed * (1.0 - self.traffic_density())
    }
}

/// A road network assembled from one ingestion pass over raw map data:
/// nodes and directed weighted edges, plus the bus-stop and address
/// indexes used to resolve queries by name.
///
/// Built by a [GraphBuilder](crate::GraphBuilder) and frozen afterwards;
/// the only post-construction mutation is [RoadGraph::update_traffic_density],
/// which goes through a shared reference. Concurrent queries need no
/// further synchronization.
#[derive(Debug, Default)]
pub struct RoadGraph {
    points: BTreeMap<i64, Point>,
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,
    edges: BTreeMap<i64, Vec<Edge>>,
    bus_stops: BTreeMap<i64, BusStop>,
    addresses: BTreeMap<String, Address>,
    speed_ceiling: f64,
}

impl RoadGraph {
    /// Returns the [Point] ingested under the given id, if any.
    pub fn point(&self, osm_id: i64) -> Option<Point> {
        self.points.get(&osm_id).copied()
    }

    /// Returns the tagged [Node] ingested under the given id, if any.
    pub fn node(&self, osm_id: i64) -> Option<&Node> {
        self.nodes.get(&osm_id)
    }

    /// Returns the retained [Way] ingested under the given id, if any.
    pub fn way(&self, osm_id: i64) -> Option<&Way> {
        self.ways.get(&osm_id)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id,
    /// in insertion order.
    pub fn edges_from(&self, from_node: i64) -> &[Edge] {
        self.edges
            .get(&from_node)
            .map(|e| e.as_slice())
            .unwrap_or_default()
    }

    /// Finds the first [Edge] from one node to another, if any.
    pub fn edge(&self, from_node: i64, to_node: i64) -> Option<&Edge> {
        self.edges_from(from_node)
            .iter()
            .find(|e| e.to_node == to_node)
    }

    /// The fastest `max_speed` of any edge in the graph, in km/h.
    /// Traffic only ever slows edges down, so no edge can be traversed
    /// faster than this, which makes it a sound basis for search heuristics.
    pub fn speed_ceiling(&self) -> f64 {
        self.speed_ceiling
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|e| e.len()).sum()
    }

    pub fn bus_stop_count(&self) -> usize {
        self.bus_stops.len()
    }

    /// Iterates over all ingested coordinates, in ascending id order.
    pub fn points(&self) -> impl Iterator<Item = (i64, Point)> + '_ {
        self.points.iter().map(|(&id, &point)| (id, point))
    }

    /// Iterates over all tagged [Nodes](Node), in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterates over all retained [Ways](Way), in ascending id order.
    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.ways.values()
    }

    /// Iterates over all [Edges](Edge) with their `from_node` ids.
    pub fn edges(&self) -> impl Iterator<Item = (i64, &Edge)> {
        self.edges
            .iter()
            .flat_map(|(&from, edges)| edges.iter().map(move |e| (from, e)))
    }

    /// Iterates over all [BusStops](BusStop), in ascending id order.
    pub fn bus_stops(&self) -> impl Iterator<Item = &BusStop> {
        self.bus_stops.values()
    }

    /// Iterates over all [Addresses](Address), in name order.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.addresses.values()
    }

    /// Finds a [BusStop] by name, compared case-insensitively.
    pub fn bus_stop_by_name(&self, name: &str) -> Option<&BusStop> {
        let name = name.to_lowercase();
        self.bus_stops
            .values()
            .find(|stop| stop.name.to_lowercase() == name)
    }

    /// Returns every [BusStop] within `max_distance` meters of the given point.
    pub fn bus_stops_within_distance(&self, point: Point, max_distance: f64) -> Vec<&BusStop> {
        self.bus_stops
            .values()
            .filter(|stop| earth_distance(point, stop.point) <= max_distance)
            .collect()
    }

    /// Finds the [BusStop] closest to the given point.
    ///
    /// This function computes the distance to every bus stop in the graph,
    /// and is not suitable for large graphs.
    pub fn closest_bus_stop(&self, point: Point) -> Option<&BusStop> {
        self.bus_stops.values().min_by(|a, b| {
            earth_distance(point, a.point).total_cmp(&earth_distance(point, b.point))
        })
    }

    /// Finds a registered [Address] by its exact name.
    pub fn address(&self, name: &str) -> Option<&Address> {
        self.addresses.get(name)
    }

    /// Returns the center point of a registered address, or [None]
    /// if no such address name was ever ingested.
    pub fn address_center(&self, name: &str) -> Option<Point> {
        self.addresses.get(name).map(|address| address.center())
    }

    /// Finds the node participating in the edge index (as either endpoint)
    /// whose coordinate is closest to the given point. Useful for snapping
    /// arbitrary coordinates onto the routable part of the network.
    ///
    /// This function computes the distance to every edge endpoint in the
    /// graph, and is not suitable for large graphs.
    pub fn nearest_edge_node(&self, point: Point) -> Option<(i64, Point)> {
        self.edges()
            .flat_map(|(from, edge)| [from, edge.to_node])
            .filter_map(|id| self.point(id).map(|p| (id, p)))
            .min_by(|(_, a), (_, b)| {
                earth_distance(point, *a).total_cmp(&earth_distance(point, *b))
            })
    }

    /// Applies a traffic-feed update to every edge from one node to another.
    ///
    /// Densities outside of [0, 1] (NaN included) and unknown edge identities
    /// are rejected. The store itself is atomic; concurrent queries may
    /// observe either the old or the new value.
    pub fn update_traffic_density(
        &self,
        from_node: i64,
        to_node: i64,
        density: f64,
    ) -> Result<(), TrafficError> {
        if !(0.0..=1.0).contains(&density) {
            return Err(TrafficError::DensityOutOfRange(density));
        }

        let mut found = false;
        for edge in self.edges_from(from_node) {
            if edge.to_node == to_node {
                edge.set_traffic_density(density);
                found = true;
            }
        }

        if found {
            Ok(())
        } else {
            Err(TrafficError::UnknownEdge(from_node, to_node))
        }
    }

    /// Creates or replaces the coordinate under the given id (last write wins).
    pub(crate) fn set_point(&mut self, osm_id: i64, point: Point) {
        self.points.insert(osm_id, point);
    }

    /// Creates or replaces the tagged node under `node.osm_id`.
    pub(crate) fn set_node(&mut self, node: Node) {
        self.nodes.insert(node.osm_id, node);
    }

    /// Creates or replaces the way under `way.osm_id`.
    pub(crate) fn set_way(&mut self, way: Way) {
        self.ways.insert(way.osm_id, way);
    }

    /// Appends an outgoing edge to `from_node`. Edges are never replaced
    /// or removed; insertion order is preserved.
    pub(crate) fn push_edge(&mut self, from_node: i64, edge: Edge) {
        if edge.max_speed > self.speed_ceiling {
            self.speed_ceiling = edge.max_speed;
        }
        self.edges.entry(from_node).or_default().push(edge);
    }

    /// Creates or replaces the bus stop under `stop.osm_id`.
    pub(crate) fn set_bus_stop(&mut self, stop: BusStop) {
        self.bus_stops.insert(stop.osm_id, stop);
    }

    /// Registers a node observation under an address name, creating the
    /// address on first use.
    pub(crate) fn add_address(&mut self, name: &str, node_id: i64, point: Point) {
        match self.addresses.entry(name.to_string()) {
            Entry::Vacant(e) => {
                e.insert(Address::new(name.to_string(), node_id, point));
            }
            Entry::Occupied(mut e) => {
                e.get_mut().add_node(node_id, point);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_edge() -> RoadGraph {
        let mut g = RoadGraph::default();
        g.set_point(1, Point::new(17.0, 59.0));
        g.set_point(2, Point::new(17.001, 59.0));
        g.push_edge(1, Edge::new(2, 50.0, "residential".to_string(), 100));
        g
    }

    #[test]
    fn traffic_density_defaults_to_zero() {
        let g = graph_with_edge();
        let edge = g.edge(1, 2).unwrap();
        assert_eq!(edge.traffic_density(), 0.0);
        assert_eq!(edge.effective_speed(), 50.0);
    }

    #[test]
    fn traffic_update_is_applied() {
        let g = graph_with_edge();
        g.update_traffic_density(1, 2, 0.5).unwrap();

        let edge = g.edge(1, 2).unwrap();
        assert_eq!(edge.traffic_density(), 0.5);
        assert_eq!(edge.effective_speed(), 25.0);
    }

    #[test]
    fn out_of_range_traffic_update_is_rejected() {
        let g = graph_with_edge();
        assert_eq!(
            g.update_traffic_density(1, 2, 1.5),
            Err(TrafficError::DensityOutOfRange(1.5))
        );
        assert_eq!(
            g.update_traffic_density(1, 2, -0.1),
            Err(TrafficError::DensityOutOfRange(-0.1))
        );
        assert!(matches!(
            g.update_traffic_density(1, 2, f64::NAN),
            Err(TrafficError::DensityOutOfRange(_))
        ));

        // The rejected updates must leave the edge untouched
        assert_eq!(g.edge(1, 2).unwrap().traffic_density(), 0.0);
    }

    #[test]
    fn traffic_update_to_unknown_edge_is_rejected() {
        let g = graph_with_edge();
        assert_eq!(
            g.update_traffic_density(2, 1, 0.5),
            Err(TrafficError::UnknownEdge(2, 1))
        );
    }

    #[test]
    fn edges_keep_insertion_order() {
        let mut g = RoadGraph::default();
        g.push_edge(1, Edge::new(5, 50.0, "residential".to_string(), 100));
        g.push_edge(1, Edge::new(3, 50.0, "residential".to_string(), 101));
        g.push_edge(1, Edge::new(4, 50.0, "residential".to_string(), 102));

        let order: Vec<i64> = g.edges_from(1).iter().map(|e| e.to_node).collect();
        assert_eq!(order, [5, 3, 4]);
    }

    #[test]
    fn speed_ceiling_tracks_fastest_edge() {
        let mut g = RoadGraph::default();
        assert_eq!(g.speed_ceiling(), 0.0);

        g.push_edge(1, Edge::new(2, 50.0, "residential".to_string(), 100));
        g.push_edge(2, Edge::new(3, 90.0, "motorway".to_string(), 101));
        g.push_edge(3, Edge::new(4, 30.0, "service".to_string(), 102));
        assert_eq!(g.speed_ceiling(), 90.0);
    }

    #[test]
    fn bus_stop_by_name_is_case_insensitive() {
        let mut g = RoadGraph::default();
        g.set_bus_stop(BusStop {
            osm_id: 7,
            name: "Central Station".to_string(),
            point: Point::new(18.0586, 59.3303),
        });

        assert_eq!(g.bus_stop_by_name("central station").unwrap().osm_id, 7);
        assert_eq!(g.bus_stop_by_name("CENTRAL STATION").unwrap().osm_id, 7);
        assert!(g.bus_stop_by_name("North Station").is_none());
    }

    #[test]
    fn bus_stops_within_distance_filters_by_radius() {
        let mut g = RoadGraph::default();
        g.set_bus_stop(BusStop {
            osm_id: 1,
            name: "Near".to_string(),
            point: Point::new(17.0001, 59.0),
        });
        g.set_bus_stop(BusStop {
            osm_id: 2,
            name: "Far".to_string(),
            point: Point::new(17.1, 59.0),
        });

        let within = g.bus_stops_within_distance(Point::new(17.0, 59.0), 100.0);
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].osm_id, 1);

        let closest = g.closest_bus_stop(Point::new(17.0, 59.0)).unwrap();
        assert_eq!(closest.osm_id, 1);
    }

    #[test]
    fn address_center_aggregates_observations() {
        let mut g = RoadGraph::default();
        g.add_address("Main Street 4", 1, Point::new(17.0, 59.0));
        g.add_address("Main Street 4", 2, Point::new(17.5, 59.5));

        assert_eq!(
            g.address_center("Main Street 4"),
            Some(Point::new(17.25, 59.25))
        );
        assert_eq!(g.address_center("Elm Street 1"), None);
    }

    #[test]
    fn nearest_edge_node_considers_both_endpoints() {
        let mut g = graph_with_edge();
        // A node with a known point but no edges must never be returned.
        g.set_point(3, Point::new(17.0005, 59.0));

        let (id, _) = g.nearest_edge_node(Point::new(17.0009, 59.0)).unwrap();
        assert_eq!(id, 2);
    }
}
