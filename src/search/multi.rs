// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashSet, VecDeque};

use crate::{RoadGraph, Waypoint};

use super::{SearchBudget, SearchError};

/// A frontier entry: one node together with every distinct path-prefix
/// by which it has been reached so far.
#[derive(Debug)]
struct FrontierNode {
    waypoint: Waypoint,
    followed_paths: Vec<Vec<Waypoint>>,
}

impl FrontierNode {
    fn new(waypoint: Waypoint) -> Self {
        Self {
            waypoint,
            followed_paths: Vec::new(),
        }
    }

    /// Extends every followed path of the previous node by this node,
    /// skipping duplicates.
    fn extend_paths_of(&mut self, previous: &FrontierNode) {
        for path in &previous.followed_paths {
            let mut followed_path = path.clone();
            followed_path.push(self.waypoint);
            if !self.followed_paths.contains(&followed_path) {
                self.followed_paths.push(followed_path);
            }
        }
    }
}

/// Enumerates simple paths between two nodes by a breadth-first sweep,
/// used to discover distinct route corridors rather than a single optimum.
///
/// Each frontier entry carries the full set of path-prefixes by which its
/// node was reached: arrivals at a node still pending in the FIFO frontier
/// merge into its entry, and entries reaching the ending node surrender
/// their paths to the result. A node id that has been expanded once goes
/// into a closed set and is never expanded again: later, longer arrivals at
/// that node are dropped. This bounds the sweep's cost at the expense of path
/// completeness; paths whose intermediate nodes are only reachable after
/// those nodes closed are absent from the result. Callers are expected to
/// run this over a small bounded neighborhood, e.g. between adjacent bus
/// stops, with a [SearchBudget] as the final backstop.
///
/// Returns an empty collection if the ending node is unreachable; an
/// exhausted budget surfaces as an error, never as an empty result.
pub fn find_waypoints(
    g: &RoadGraph,
    starting_node: i64,
    ending_node: i64,
    budget: &SearchBudget,
) -> Result<Vec<Vec<Waypoint>>, SearchError> {
    let mut waypoints: Vec<Vec<Waypoint>> = Vec::new();
    let mut closed_set: HashSet<i64> = HashSet::default();
    let mut open_set: VecDeque<FrontierNode> = VecDeque::default();
    let mut steps: usize = 0;

    g.point(ending_node)
        .ok_or(SearchError::InvalidReference(ending_node))?;
    let starting_point = g
        .point(starting_node)
        .ok_or(SearchError::InvalidReference(starting_node))?;

    let start = Waypoint {
        osm_id: starting_node,
        point: starting_point,
    };
    let mut first = FrontierNode::new(start);
    first.followed_paths.push(vec![start]);
    open_set.push_back(first);

    while let Some(mut current) = open_set.pop_front() {
        budget.charge(&mut steps)?;

        if current.waypoint.osm_id == ending_node {
            waypoints.append(&mut current.followed_paths);
            continue;
        }

        let edges = g.edges_from(current.waypoint.osm_id);
        if edges.is_empty() || closed_set.contains(&current.waypoint.osm_id) {
            continue;
        }

        for edge in edges {
            if closed_set.contains(&edge.to_node) {
                continue;
            }

            // Edges may point at nodes whose coordinate never arrived;
            // those cannot be part of a waypoint sequence.
            let Some(point) = g.point(edge.to_node) else {
                log::trace!("dropping edge to node {} with no coordinate", edge.to_node);
                continue;
            };

            // A neighbor still pending in the open set accumulates the new
            // path extensions into its existing entry; otherwise a fresh
            // entry joins the back of the frontier.
            match open_set
                .iter_mut()
                .find(|n| n.waypoint.osm_id == edge.to_node)
            {
                Some(pending) => pending.extend_paths_of(&current),
                None => {
                    let mut next = FrontierNode::new(Waypoint {
                        osm_id: edge.to_node,
                        point,
                    });
                    next.extend_paths_of(&current);
                    open_set.push_back(next);
                }
            }
        }

        closed_set.insert(current.waypoint.osm_id);
    }

    Ok(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuilderConfig, GraphBuilder};
    use std::collections::HashMap;

    macro_rules! tags {
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn oneway() -> HashMap<String, String> {
        tags! {"highway": "residential", "oneway": "yes"}
    }

    fn ids(path: &[Waypoint]) -> Vec<i64> {
        path.iter().map(|w| w.osm_id).collect()
    }

    /// A diamond with a tail:
    ///
    /// ```text
    ///   1 → 2 → 4 → 5
    ///    ↘ 3 ↗
    /// ```
    fn diamond_graph() -> crate::RoadGraph {
        let mut b = GraphBuilder::new(BuilderConfig::default()).unwrap();
        b.ingest_coordinate(1, 17.000, 59.0);
        b.ingest_coordinate(2, 17.001, 59.001);
        b.ingest_coordinate(3, 17.001, 58.999);
        b.ingest_coordinate(4, 17.002, 59.0);
        b.ingest_coordinate(5, 17.003, 59.0);
        b.ingest_way(100, &oneway(), &[1, 2, 4]);
        b.ingest_way(101, &oneway(), &[1, 3, 4]);
        b.ingest_way(102, &oneway(), &[4, 5]);
        b.finish()
    }

    #[test]
    fn diamond_yields_both_corridors() {
        let g = diamond_graph();
        let mut paths = find_waypoints(&g, 1, 5, &SearchBudget::default()).unwrap();
        paths.sort_by_key(|p| ids(p));

        assert_eq!(paths.len(), 2);
        assert_eq!(ids(&paths[0]), [1, 2, 4, 5]);
        assert_eq!(ids(&paths[1]), [1, 3, 4, 5]);
    }

    #[test]
    fn second_wave_paths_are_dropped() {
        // Node 4 is reachable in one hop via 2 and in two hops via the
        // 3 → 6 detour. The detour's arrival comes after 4 has already
        // been expanded and closed, so its paths never reach 5.
        // This pins the closed-set-after-first-pop policy; it is a
        // deliberate cost bound, not a defect to fix.
        let mut b = GraphBuilder::new(BuilderConfig::default()).unwrap();
        b.ingest_coordinate(1, 17.000, 59.0);
        b.ingest_coordinate(2, 17.001, 59.001);
        b.ingest_coordinate(3, 17.001, 58.999);
        b.ingest_coordinate(6, 17.002, 58.999);
        b.ingest_coordinate(4, 17.002, 59.0);
        b.ingest_coordinate(5, 17.003, 59.0);
        b.ingest_way(100, &oneway(), &[1, 2, 4]);
        b.ingest_way(101, &oneway(), &[1, 3, 6, 4]);
        b.ingest_way(102, &oneway(), &[4, 5]);
        let g = b.finish();

        let paths = find_waypoints(&g, 1, 5, &SearchBudget::default()).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(ids(&paths[0]), [1, 2, 4, 5]);
        // The detour is provably absent:
        assert!(!paths.iter().any(|p| ids(p).contains(&6)));
    }

    #[test]
    fn unreachable_target_yields_empty_result() {
        let mut b = GraphBuilder::new(BuilderConfig::default()).unwrap();
        b.ingest_coordinate(1, 17.000, 59.0);
        b.ingest_coordinate(2, 17.001, 59.0);
        b.ingest_coordinate(3, 18.000, 59.0);
        b.ingest_way(100, &oneway(), &[1, 2]);
        let g = b.finish();

        let paths = find_waypoints(&g, 1, 3, &SearchBudget::default()).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn cycles_terminate_through_the_closed_set() {
        let mut b = GraphBuilder::new(BuilderConfig::default()).unwrap();
        b.ingest_coordinate(1, 17.000, 59.0);
        b.ingest_coordinate(2, 17.001, 59.0);
        b.ingest_coordinate(3, 17.002, 59.0);
        // A two-way street is the tightest cycle.
        b.ingest_way(100, &tags! {"highway": "residential"}, &[1, 2, 3]);
        let g = b.finish();

        let paths = find_waypoints(&g, 1, 3, &SearchBudget::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(ids(&paths[0]), [1, 2, 3]);
    }

    #[test]
    fn start_equal_to_end_yields_the_trivial_path() {
        let g = diamond_graph();
        let paths = find_waypoints(&g, 1, 1, &SearchBudget::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(ids(&paths[0]), [1]);
    }

    #[test]
    fn unknown_nodes_are_invalid_references() {
        let g = diamond_graph();
        assert_eq!(
            find_waypoints(&g, 1, 999, &SearchBudget::default()),
            Err(SearchError::InvalidReference(999))
        );
        assert_eq!(
            find_waypoints(&g, 999, 5, &SearchBudget::default()),
            Err(SearchError::InvalidReference(999))
        );
    }

    #[test]
    fn exhausted_budget_is_not_an_empty_result() {
        let g = diamond_graph();
        assert_eq!(
            find_waypoints(&g, 1, 5, &SearchBudget::steps(1)),
            Err(SearchError::StepLimitExceeded)
        );
        assert_eq!(
            find_waypoints(
                &g,
                1,
                5,
                &SearchBudget::default().with_time_limit(std::time::Duration::ZERO)
            ),
            Err(SearchError::TimeLimitExceeded)
        );
    }
}
