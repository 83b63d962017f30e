// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// An [OSM node](https://wiki.openstreetmap.org/wiki/Node) carrying tags,
/// exactly as found in the input feed. Raw tag maps only exist at this
/// boundary; graph construction derives the known keys once and drops the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub tags: HashMap<String, String>,
}

/// An [OSM way](https://wiki.openstreetmap.org/wiki/Way): a tagged,
/// ordered chain of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: i64,
    pub tags: HashMap<String, String>,
    pub refs: Vec<i64>,
}

/// One record of the raw map-primitive stream.
///
/// The three kinds may arrive in any order relative to each other;
/// a [GraphBuilder](crate::GraphBuilder) tolerates forward references.
/// Every node in the feed produces a [Primitive::Coordinate]; nodes
/// carrying tags additionally produce a [Primitive::Node].
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Coordinate { id: i64, longitude: f64, latitude: f64 },
    Node(RawNode),
    Way(RawWay),
}

/// Trait for objects which can stream [Primitives](Primitive)
/// from an underlying source.
pub trait PrimitiveSource {
    type Error;
    fn next(&mut self) -> Result<Option<Primitive>, Self::Error>;
}
