// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::Serialize;

use crate::{earth_distance, Point};

/// A named address and every map node observed under that name.
///
/// Multiple distinct physical nodes may share one logical address name,
/// e.g. a street-numbered building spanning several way references.
/// Observations are append-only, in ingestion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub name: String,
    pub nodes: Vec<(i64, Point)>,
}

impl Address {
    pub fn new(name: String, node_id: i64, point: Point) -> Self {
        Self {
            name,
            nodes: vec![(node_id, point)],
        }
    }

    /// Records another node observed under this address name.
    pub fn add_node(&mut self, node_id: i64, point: Point) {
        self.nodes.push((node_id, point));
    }

    /// Returns the arithmetic midpoint of all observations.
    pub fn center(&self) -> Point {
        debug_assert!(!self.nodes.is_empty());
        let n = self.nodes.len() as f64;
        let (lon_sum, lat_sum) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(lon, lat), (_, point)| {
                (lon + point.longitude, lat + point.latitude)
            });
        Point::new(lon_sum / n, lat_sum / n)
    }

    /// Returns the observation closest to the provided point.
    pub fn closest_node(&self, point: Point) -> Option<(i64, Point)> {
        self.nodes
            .iter()
            .min_by(|(_, a), (_, b)| {
                earth_distance(point, *a).total_cmp(&earth_distance(point, *b))
            })
            .copied()
    }
}

/// Expands a compact house-number encoding into individual tokens.
///
/// - `"12A-12C"` → `["12A", "12B", "12C"]` (letter range, leading number held fixed),
/// - `"3-7"` → `["3", "4", "5", "6", "7"]` (numeric range),
/// - `"4, 9, 12"` → `["4", "9", "12"]` (comma-separated literals),
/// - `"7"` → `["7"]` (single literal).
///
/// Empty ranges ("12C-12A") expand to nothing. Ranges with a letter on only
/// one bound fall back to the numeric range of their leading numbers.
pub fn address_range(number: &str) -> Vec<String> {
    if let Some(range) = HouseNumberRange::parse(number) {
        return range.expand();
    }

    let literals: Vec<&str> = number.split(',').collect();
    if literals.len() > 1 {
        literals.iter().map(|num| num.trim().to_string()).collect()
    } else {
        vec![number.to_string()]
    }
}

/// A `<num><letter?>-<num><letter?>` pattern found inside a house-number value.
struct HouseNumberRange<'a> {
    starting_number: &'a str,
    starting_letters: &'a str,
    ending_number: &'a str,
    ending_letters: &'a str,
}

impl<'a> HouseNumberRange<'a> {
    /// Finds the first range pattern in `s`, scanning like a regex search would.
    fn parse(s: &'a str) -> Option<Self> {
        let bytes = s.as_bytes();
        let mut at = 0;

        while at < bytes.len() {
            if !bytes[at].is_ascii_digit() {
                at += 1;
                continue;
            }

            if let Some(range) = Self::parse_at(s, at) {
                return Some(range);
            }
            at += 1;
        }

        None
    }

    fn parse_at(s: &'a str, start: usize) -> Option<Self> {
        let (starting_number, rest) = take_while(&s[start..], |c| c.is_ascii_digit());
        let (starting_letters, rest) = take_while(rest, |c| c.is_ascii_alphabetic());

        let rest = rest.trim_start();
        let rest = rest.strip_prefix('-')?;
        let rest = rest.trim_start();

        let (ending_number, rest) = take_while(rest, |c| c.is_ascii_digit());
        if ending_number.is_empty() {
            return None;
        }
        let (ending_letters, _) = take_while(rest, |c| c.is_ascii_alphabetic());

        Some(Self {
            starting_number,
            starting_letters,
            ending_number,
            ending_letters,
        })
    }

    fn expand(&self) -> Vec<String> {
        if !self.starting_letters.is_empty() && !self.ending_letters.is_empty() {
            let from = self.starting_letters.as_bytes()[0];
            let to = self.ending_letters.as_bytes()[0];
            (from..=to)
                .map(|c| format!("{}{}", self.starting_number, c as char))
                .collect()
        } else if let (Ok(from), Ok(to)) = (
            self.starting_number.parse::<i64>(),
            self.ending_number.parse::<i64>(),
        ) {
            (from..=to).map(|n| n.to_string()).collect()
        } else {
            vec![format!("{}{}", self.starting_number, self.starting_letters)]
        }
    }
}

fn take_while(s: &str, predicate: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s
        .char_indices()
        .find_map(|(i, c)| if predicate(c) { None } else { Some(i) })
        .unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(number: &str) -> Vec<String> {
        address_range(number)
    }

    #[test]
    fn letter_range() {
        assert_eq!(expand("12A-12C"), ["12A", "12B", "12C"]);
    }

    #[test]
    fn numeric_range() {
        assert_eq!(expand("3-5"), ["3", "4", "5"]);
        assert_eq!(expand("3-7"), ["3", "4", "5", "6", "7"]);
    }

    #[test]
    fn numeric_range_with_spaces() {
        assert_eq!(expand("3 - 5"), ["3", "4", "5"]);
    }

    #[test]
    fn comma_separated_literals() {
        assert_eq!(expand("4,9,12"), ["4", "9", "12"]);
        assert_eq!(expand("4, 9, 12"), ["4", "9", "12"]);
    }

    #[test]
    fn single_literal() {
        assert_eq!(expand("7"), ["7"]);
        assert_eq!(expand("7B"), ["7B"]);
    }

    #[test]
    fn reversed_range_is_empty() {
        assert_eq!(expand("12C-12A"), Vec::<String>::new());
        assert_eq!(expand("7-3"), Vec::<String>::new());
    }

    #[test]
    fn center_of_observations() {
        let mut address = Address::new("Forno Romano".to_string(), 1, Point::new(17.0, 59.0));
        address.add_node(2, Point::new(19.0, 61.0));

        assert_eq!(address.center(), Point::new(18.0, 60.0));
    }

    #[test]
    fn closest_node_picks_nearest_observation() {
        let mut address = Address::new("Main Street 1".to_string(), 1, Point::new(17.0, 59.0));
        address.add_node(2, Point::new(17.001, 59.001));

        let (node_id, _) = address.closest_node(Point::new(17.0011, 59.0011)).unwrap();
        assert_eq!(node_id, 2);
    }
}
