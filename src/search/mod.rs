// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod error;
mod multi;
mod shortest;

pub use error::{SearchBudget, SearchError, DEFAULT_STEP_LIMIT};
pub use multi::find_waypoints;
pub use shortest::find_shortest_route;
