// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::Serialize;

use crate::Point;

/// A single node visited by a route, paired with its coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub osm_id: i64,
    pub point: Point,
}

/// The edge provenance carried inside a [Route], one entry per leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEdge {
    pub from_node: i64,
    pub to_node: i64,
    pub max_speed: f64,
    pub road_type: String,
    pub way_id: i64,
    pub traffic_density: f64,
}

/// A fully reconstructed least-time path.
///
/// Field names are part of the wire contract consumed by timetable
/// generation and client libraries, and must not change. All parallel
/// arrays are aligned with `node_osm_ids`; `edges` has one entry fewer.
/// Distances are in meters, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub total_distance: f64,
    pub total_time: f64,
    pub node_osm_ids: Vec<i64>,
    pub points: Vec<Point>,
    pub edges: Vec<RouteEdge>,
    pub distances_from_starting_node: Vec<f64>,
    pub times_from_starting_node: Vec<f64>,
    pub distances_from_previous_node: Vec<f64>,
    pub times_from_previous_node: Vec<f64>,
}
