// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::osm::{Primitive, PrimitiveSource};
use crate::{address_range, BusStop, Edge, Node, NodeTags, Point, RoadGraph, Way};

/// Fallback speed (in km/h) for ways without a usable `maxspeed` tag.
pub const STANDARD_SPEED: f64 = 50.0;

/// Road types (values of the `highway` tag) which buses can drive on.
pub const BUS_ROAD_TYPES: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "bus_road",
];

/// Errors detected when validating a [BuilderConfig].
///
/// Raised at build start: an empty road-type set or a nonsensical
/// fallback speed would silently produce an empty, useless graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("the bus-accessible road-type set is empty")]
    NoBusRoadTypes,

    #[error("standard speed {0} is not a positive, finite number")]
    InvalidStandardSpeed(f64),
}

/// Controls how raw map primitives are interpreted during graph construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Values of the `highway` tag for which ways are expanded into edges.
    pub bus_road_types: Vec<String>,

    /// Speed (in km/h) assumed for ways without a usable `maxspeed` tag.
    pub standard_speed: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            bus_road_types: BUS_ROAD_TYPES.iter().map(|s| s.to_string()).collect(),
            standard_speed: STANDARD_SPEED,
        }
    }
}

impl BuilderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_road_types.is_empty() {
            return Err(ConfigError::NoBusRoadTypes);
        }
        if !self.standard_speed.is_finite() || self.standard_speed <= 0.0 {
            return Err(ConfigError::InvalidStandardSpeed(self.standard_speed));
        }
        Ok(())
    }

    fn is_bus_road(&self, road_type: &str) -> bool {
        self.bus_road_types.iter().any(|t| t == road_type)
    }
}

/// Assembles a [RoadGraph] from a stream of raw map primitives.
///
/// The builder is the single-writer funnel of graph construction:
/// concurrent producers hand primitives over through [GraphBuilder::drain_channel],
/// while all mutation happens on this one `&mut self`. Malformed or partial
/// input is skipped, never fatal. Call [GraphBuilder::finish] once the
/// stream is exhausted to obtain the frozen graph.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: RoadGraph,
    config: BuilderConfig,
}

impl GraphBuilder {
    /// Creates a builder after validating the provided configuration.
    pub fn new(config: BuilderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            graph: RoadGraph::default(),
            config,
        })
    }

    /// Inserts a coordinate under the given id. Re-ingesting an id
    /// replaces the previous coordinate (last write wins).
    pub fn ingest_coordinate(&mut self, id: i64, longitude: f64, latitude: f64) {
        self.graph.set_point(id, Point::new(longitude, latitude));
    }

    /// Inserts a tagged node. Nodes carrying both a `bus` marker and a name
    /// additionally register a [BusStop]; name/street/house-number tags
    /// register address entries.
    pub fn ingest_node(
        &mut self,
        id: i64,
        tags: &HashMap<String, String>,
        longitude: f64,
        latitude: f64,
    ) {
        let point = Point::new(longitude, latitude);
        let tags = NodeTags::from_raw(tags);

        if tags.bus_access {
            if let Some(name) = &tags.name {
                self.graph.set_bus_stop(BusStop {
                    osm_id: id,
                    name: name.clone(),
                    point,
                });
            } else {
                log::debug!("node {id} has a bus marker but no name, not a stop");
            }
        }

        self.register_node_addresses(id, &tags, point);

        self.graph.set_node(Node {
            osm_id: id,
            point,
            tags,
        });
    }

    /// Inserts a way. Bus-accessible ways (road type in the configured set,
    /// not closed to motor vehicles) are retained and expanded into edges;
    /// independently of road type, a way name becomes an address alias for
    /// every referenced node whose coordinate is already known.
    pub fn ingest_way(&mut self, id: i64, tags: &HashMap<String, String>, refs: &[i64]) {
        let road_type = tags.get("highway").filter(|v| !v.is_empty());
        let motorcar_allowed = tags.get("motorcar").map(|v| v.as_str()) != Some("no");

        match road_type {
            Some(road_type) if motorcar_allowed && self.config.is_bus_road(road_type) => {
                let max_speed = parse_max_speed(tags.get("maxspeed"), self.config.standard_speed);
                let oneway = is_oneway(tags);

                self.create_edges(id, refs, road_type, max_speed, oneway);
                self.graph.set_way(Way {
                    osm_id: id,
                    road_type: road_type.clone(),
                    max_speed,
                    oneway,
                    name: tags.get("name").filter(|v| !v.is_empty()).cloned(),
                    refs: refs.to_vec(),
                });
            }
            _ => {}
        }

        // Even non-road ways (e.g. buildings) make their name resolvable
        // as an address of every referenced node.
        if let Some(name) = tags.get("name").filter(|v| !v.is_empty()) {
            for &node_id in refs {
                match self.graph.point(node_id) {
                    Some(point) => self.graph.add_address(name, node_id, point),
                    None => log::trace!("way {id} references node {node_id} with no coordinate"),
                }
            }
        }
    }

    /// Dispatches one primitive to the matching ingestion operation.
    pub fn ingest(&mut self, primitive: Primitive) {
        match primitive {
            Primitive::Coordinate {
                id,
                longitude,
                latitude,
            } => self.ingest_coordinate(id, longitude, latitude),
            Primitive::Node(n) => self.ingest_node(n.id, &n.tags, n.longitude, n.latitude),
            Primitive::Way(w) => self.ingest_way(w.id, &w.tags, &w.refs),
        }
    }

    /// Ingests every primitive from the provided [PrimitiveSource].
    pub fn drain<S: PrimitiveSource>(&mut self, mut source: S) -> Result<(), S::Error> {
        while let Some(primitive) = source.next()? {
            self.ingest(primitive);
        }
        Ok(())
    }

    /// Ingests primitives sent by concurrent producers until every sender
    /// has disconnected. This is the bounded-queue funnel serializing
    /// graph mutation when the upstream feed is parallel.
    pub fn drain_channel(&mut self, primitives: crossbeam_channel::Receiver<Primitive>) {
        while let Ok(primitive) = primitives.recv() {
            self.ingest(primitive);
        }
    }

    /// Freezes and returns the assembled graph.
    pub fn finish(self) -> RoadGraph {
        log::info!(
            "built graph: {} points, {} nodes, {} ways, {} edges, {} bus stops",
            self.graph.point_count(),
            self.graph.node_count(),
            self.graph.way_count(),
            self.graph.edge_count(),
            self.graph.bus_stops().count(),
        );
        self.graph
    }

    /// Borrows the graph under construction. Intended for tests and
    /// incremental inspection; queries should run on the result of
    /// [GraphBuilder::finish].
    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    fn create_edges(
        &mut self,
        way_id: i64,
        refs: &[i64],
        road_type: &str,
        max_speed: f64,
        oneway: bool,
    ) {
        for pair in refs.windows(2) {
            self.graph.push_edge(
                pair[0],
                Edge::new(pair[1], max_speed, road_type.to_string(), way_id),
            );

            if !oneway {
                self.graph.push_edge(
                    pair[1],
                    Edge::new(pair[0], max_speed, road_type.to_string(), way_id),
                );
            }
        }
    }

    fn register_node_addresses(&mut self, id: i64, tags: &NodeTags, point: Point) {
        if let Some(name) = &tags.name {
            self.graph.add_address(name, id, point);
        }

        if let (Some(street), Some(house_number)) = (&tags.street, &tags.house_number) {
            for number in address_range(house_number) {
                let address = format!("{street} {number}");
                self.graph.add_address(&address, id, point);
            }
        }
    }
}

/// Parses the value of a `maxspeed` tag: the leading decimal number is
/// accepted ("50", "50 mph"), anything else falls back to `standard_speed`.
fn parse_max_speed(value: Option<&String>, standard_speed: f64) -> f64 {
    let Some(value) = value else {
        return standard_speed;
    };

    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());

    match value[..end].parse::<f64>() {
        Ok(speed) if speed > 0.0 => speed,
        _ => {
            log::debug!("unusable maxspeed value {value:?}, assuming {standard_speed} km/h");
            standard_speed
        }
    }
}

fn is_oneway(tags: &HashMap<String, String>) -> bool {
    matches!(
        tags.get("oneway").map(|v| v.as_str()),
        Some("yes") | Some("true") | Some("1")
    )
}
