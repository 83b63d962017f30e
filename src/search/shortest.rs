// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use crate::{earth_distance, Edge, Point, RoadGraph, Route, RouteEdge};

use super::{SearchBudget, SearchError};

/// Converts a speed in km/h to m/s.
const KMH_TO_MS: f64 = 1.0 / 3.6;

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,

    /// Travel time from the start, in seconds.
    time: f64,

    /// Travelled distance from the start, in meters. Breaks ties
    /// between paths of equal travel time.
    distance: f64,

    /// `time` plus the admissible remaining-time estimate.
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        (self.score, self.distance).eq(&(other.score, other.distance))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        (other.score, other.distance).partial_cmp(&(self.score, self.distance))
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.partial_cmp(self).unwrap()
    }
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the least-time route between two nodes in the provided graph.
///
/// The weight of an edge is the great-circle distance between its endpoints
/// divided by the edge's [effective speed](crate::Edge::effective_speed);
/// fully congested edges are impassable. Ties in total time are broken by
/// preferring the path with the smaller total distance. The search is
/// deterministic for a fixed graph and a fixed traffic snapshot.
///
/// Returns `Ok(None)` if no route between the two nodes exists; an
/// exhausted [SearchBudget] surfaces as an error, never as a missing route.
pub fn find_shortest_route(
    g: &RoadGraph,
    starting_node: i64,
    ending_node: i64,
    budget: &SearchBudget,
) -> Result<Option<Route>, SearchError> {
    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, (i64, usize)> = HashMap::default();
    let mut known_costs: HashMap<i64, (f64, f64)> = HashMap::default();
    let mut steps: usize = 0;

    let ending_point = g
        .point(ending_node)
        .ok_or(SearchError::InvalidReference(ending_node))?;
    let starting_point = g
        .point(starting_node)
        .ok_or(SearchError::InvalidReference(starting_node))?;

    // No edge is ever traversed faster than the graph-wide speed ceiling,
    // which keeps the crow-flies travel-time estimate admissible.
    // Without any edges the search degrades to plain Dijkstra.
    let ceiling = g.speed_ceiling() * KMH_TO_MS;
    let estimate = |point: Point| {
        if ceiling > 0.0 {
            earth_distance(point, ending_point) / ceiling
        } else {
            0.0
        }
    };

    queue.push(QueueItem {
        at: starting_node,
        time: 0.0,
        distance: 0.0,
        score: estimate(starting_point),
    });
    known_costs.insert(starting_node, (0.0, 0.0));

    while let Some(item) = queue.pop() {
        if item.at == ending_node {
            return Ok(Some(reconstruct_route(g, &came_from, ending_node)));
        }

        // Contrary to the wikipedia definition, we might keep multiple items
        // in the queue for the same node.
        let known = known_costs
            .get(&item.at)
            .cloned()
            .unwrap_or((f64::INFINITY, f64::INFINITY));
        if (item.time, item.distance) > known {
            continue;
        }

        budget.charge(&mut steps)?;

        // Only nodes with a known coordinate are ever queued
        let Some(at_point) = g.point(item.at) else {
            continue;
        };

        for (edge_index, edge) in g.edges_from(item.at).iter().enumerate() {
            let speed = edge.effective_speed() * KMH_TO_MS;
            if speed <= 0.0 {
                continue;
            }

            // Edges may point at nodes whose coordinate never arrived;
            // those cannot be routed through.
            let Some(neighbor_point) = g.point(edge.to_node) else {
                continue;
            };

            let leg_distance = earth_distance(at_point, neighbor_point);
            let neighbor_cost = (item.time + leg_distance / speed, item.distance + leg_distance);

            // Strict improvement only: re-relaxing at equal cost would let
            // co-located nodes (zero-length legs) bounce the same cost back
            // and forth forever. An equal-time, shorter path still wins,
            // as the lexicographic pair compares strictly smaller.
            let known = known_costs
                .get(&edge.to_node)
                .cloned()
                .unwrap_or((f64::INFINITY, f64::INFINITY));
            if neighbor_cost >= known {
                continue;
            }

            came_from.insert(edge.to_node, (item.at, edge_index));
            known_costs.insert(edge.to_node, neighbor_cost);
            queue.push(QueueItem {
                at: edge.to_node,
                time: neighbor_cost.0,
                distance: neighbor_cost.1,
                score: neighbor_cost.0 + estimate(neighbor_point),
            });
        }
    }

    Ok(None)
}

/// Walks the predecessor map back from the ending node and assembles the
/// full [Route]: node ids, points, per-leg edge provenance, and the
/// cumulative and incremental distance/time arrays.
fn reconstruct_route(
    g: &RoadGraph,
    came_from: &HashMap<i64, (i64, usize)>,
    ending_node: i64,
) -> Route {
    let mut node_osm_ids = vec![ending_node];
    let mut leg_edges: Vec<&Edge> = Vec::default();
    let mut last = ending_node;
    while let Some(&(node_id, edge_index)) = came_from.get(&last) {
        node_osm_ids.push(node_id);
        leg_edges.push(&g.edges_from(node_id)[edge_index]);
        last = node_id;
    }
    node_osm_ids.reverse();
    leg_edges.reverse();

    let points: Vec<Point> = node_osm_ids
        .iter()
        .filter_map(|&id| g.point(id))
        .collect();

    let mut edges = Vec::with_capacity(leg_edges.len());
    let mut distances_from_starting_node = vec![0.0];
    let mut times_from_starting_node = vec![0.0];
    let mut distances_from_previous_node = vec![0.0];
    let mut times_from_previous_node = vec![0.0];
    let mut total_distance = 0.0;
    let mut total_time = 0.0;

    for (i, edge) in leg_edges.iter().enumerate() {
        let leg_distance = earth_distance(points[i], points[i + 1]);
        let leg_time = leg_distance / (edge.effective_speed() * KMH_TO_MS);
        total_distance += leg_distance;
        total_time += leg_time;

        edges.push(RouteEdge {
            from_node: node_osm_ids[i],
            to_node: node_osm_ids[i + 1],
            max_speed: edge.max_speed,
            road_type: edge.road_type.clone(),
            way_id: edge.way_id,
            traffic_density: edge.traffic_density(),
        });
        distances_from_starting_node.push(total_distance);
        times_from_starting_node.push(total_time);
        distances_from_previous_node.push(leg_distance);
        times_from_previous_node.push(leg_time);
    }

    Route {
        total_distance,
        total_time,
        node_osm_ids,
        points,
        edges,
        distances_from_starting_node,
        times_from_starting_node,
        distances_from_previous_node,
        times_from_previous_node,
    }
}
