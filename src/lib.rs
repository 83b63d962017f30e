// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Transit routing over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! It converts OSM data into a directed road graph for buses, with per-edge
//! speed limits and adjustable traffic densities, and runs time-based A* to
//! find the fastest route between nodes. A breadth-first enumeration of
//! alternative simple paths is also available. Routegen supports one-way
//! streets, motorcar access tags, bus stop lookup and address resolution
//! with house-number ranges.
//!
//! # Example
//!
//! ```no_run
//! let mut builder = routegen::GraphBuilder::new(routegen::BuilderConfig::default())
//!     .expect("default config must be valid");
//! routegen::osm::load_graph_from_file(
//!     &mut builder,
//!     routegen::osm::FileFormat::Xml,
//!     "path/to/city.osm",
//! ).expect("failed to load city.osm");
//! let graph = builder.finish();
//!
//! let from = graph.bus_stop_by_name("Central Station").unwrap().osm_id;
//! let to = graph.bus_stop_by_name("Market Square").unwrap().osm_id;
//! let route = routegen::find_shortest_route(
//!     &graph,
//!     from,
//!     to,
//!     &routegen::SearchBudget::default(),
//! ).expect("failed to find route");
//!
//! println!("Route: {:?}", route);
//! ```

mod address;
mod builder;
mod graph;
pub mod osm;
mod point;
mod route;
mod search;

pub use address::{address_range, Address};
pub use builder::{BuilderConfig, ConfigError, GraphBuilder, BUS_ROAD_TYPES, STANDARD_SPEED};
pub use graph::{BusStop, Edge, Node, NodeTags, RoadGraph, TrafficError, Way};
pub use point::{earth_distance, Point};
pub use route::{Route, RouteEdge, Waypoint};
pub use search::{
    find_shortest_route, find_waypoints, SearchBudget, SearchError, DEFAULT_STEP_LIMIT,
};
