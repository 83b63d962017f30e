// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::str::from_utf8;

use super::model::{Primitive, PrimitiveSource, RawNode, RawWay};

pub fn primitives_from_io<R: io::BufRead>(
    reader: R,
) -> impl PrimitiveSource<Error = quick_xml::Error> {
    Reader::from_io(reader)
}

pub fn primitives_from_buffer(
    b: &[u8],
) -> impl PrimitiveSource<Error = quick_xml::Error> + '_ {
    Reader::from_buffer(b)
}

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>> {
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<quick_xml::events::Event<'b>> {
        self.0.read_event()
    }
}

/// The feature currently being accumulated from child elements.
enum OpenFeature {
    Node(RawNode),
    Way(RawWay),
}

/// Reader streams [Primitives](Primitive) out of an OSM XML file.
///
/// Every `<node>` element produces a [Primitive::Coordinate]; nodes
/// carrying tags additionally produce a [Primitive::Node] right after
/// their coordinate, mirroring the dual coordinate/node delivery of
/// the raw feed contract.
struct Reader<P: Parser> {
    parser: P,
    open: Option<OpenFeature>,
    queued: Option<Primitive>,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self {
            parser,
            open: None,
            queued: None,
            eof: false,
        }
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

impl<P: Parser> PrimitiveSource for Reader<P> {
    type Error = quick_xml::Error;

    fn next(&mut self) -> Result<Option<Primitive>, quick_xml::Error> {
        if let Some(p) = self.queued.take() {
            return Ok(Some(p));
        }

        while !self.eof {
            match self.parser.read_event()? {
                quick_xml::events::Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        // A self-closing node can't carry tags
                        if let Some(n) = parse_node(start) {
                            return Ok(Some(Primitive::Coordinate {
                                id: n.id,
                                longitude: n.longitude,
                                latitude: n.latitude,
                            }));
                        }
                    }
                    // "way" can't be self-closing
                    b"tag" => {
                        if let Some((k, v)) = parse_tag(start) {
                            match &mut self.open {
                                Some(OpenFeature::Node(n)) => {
                                    n.tags.insert(k, v);
                                }
                                Some(OpenFeature::Way(w)) => {
                                    w.tags.insert(k, v);
                                }
                                None => {}
                            }
                        }
                    }
                    b"nd" => {
                        if let (Some(OpenFeature::Way(w)), Some(ref_)) =
                            (&mut self.open, parse_nd(start))
                        {
                            w.refs.push(ref_);
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => self.open = parse_node(start).map(OpenFeature::Node),
                    b"way" => self.open = parse_way(start).map(OpenFeature::Way),
                    // "tag" and "nd" must be self-closing
                    _ => {}
                },

                quick_xml::events::Event::End(end) => match end.local_name().as_ref() {
                    b"node" => {
                        if let Some(OpenFeature::Node(n)) = self.open.take() {
                            let coordinate = Primitive::Coordinate {
                                id: n.id,
                                longitude: n.longitude,
                                latitude: n.latitude,
                            };
                            if !n.tags.is_empty() {
                                self.queued = Some(Primitive::Node(n));
                            }
                            return Ok(Some(coordinate));
                        }
                    }
                    b"way" => {
                        if let Some(OpenFeature::Way(w)) = self.open.take() {
                            return Ok(Some(Primitive::Way(w)));
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        Ok(None)
    }
}

fn parse_node(start: quick_xml::events::BytesStart<'_>) -> Option<RawNode> {
    let mut id: i64 = 0;
    let mut latitude = f64::NAN;
    let mut longitude = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lat" => latitude = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lon" => longitude = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 && latitude.is_finite() && longitude.is_finite() {
        Some(RawNode {
            id,
            longitude,
            latitude,
            tags: Default::default(),
        })
    } else {
        log::debug!("skipping node with a missing id or position");
        None
    }
}

fn parse_way(start: quick_xml::events::BytesStart<'_>) -> Option<RawWay> {
    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 {
        Some(RawWay {
            id,
            tags: Default::default(),
            refs: Vec::default(),
        })
    } else {
        log::debug!("skipping way with a missing id");
        None
    }
}

fn parse_tag(start: quick_xml::events::BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            b"v" => v = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: quick_xml::events::BytesStart<'_>) -> Option<i64> {
    let mut ref_: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if ref_ != 0 {
        Some(ref_)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    const SNIPPET: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="59.840" lon="17.590">
    <tag k="bus" v="yes"/>
    <tag k="name" v="Central Station"/>
  </node>
  <node id="2" lat="59.841" lon="17.592"/>
  <node id="3" lat="59.839" lon="17.592">
  </node>
  <way id="100">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="primary"/>
    <tag k="maxspeed" v="70"/>
  </way>
</osm>
"#;

    fn collect_all<S: PrimitiveSource>(mut source: S) -> Result<Vec<Primitive>, S::Error> {
        let mut primitives = Vec::default();
        while let Some(p) = source.next()? {
            primitives.push(p);
        }
        Ok(primitives)
    }

    fn expected_primitives() -> Vec<Primitive> {
        vec![
            Primitive::Coordinate {
                id: 1,
                longitude: 17.590,
                latitude: 59.840,
            },
            Primitive::Node(RawNode {
                id: 1,
                longitude: 17.590,
                latitude: 59.840,
                tags: tags! {"bus": "yes", "name": "Central Station"},
            }),
            Primitive::Coordinate {
                id: 2,
                longitude: 17.592,
                latitude: 59.841,
            },
            Primitive::Coordinate {
                id: 3,
                longitude: 17.592,
                latitude: 59.839,
            },
            Primitive::Way(RawWay {
                id: 100,
                tags: tags! {"highway": "primary", "maxspeed": "70"},
                refs: vec![1, 2],
            }),
        ]
    }

    #[test]
    fn parse_from_buf() -> Result<(), quick_xml::Error> {
        let primitives = collect_all(Reader::from_buffer(SNIPPET))?;
        assert_eq!(primitives, expected_primitives());
        Ok(())
    }

    #[test]
    fn parse_from_io() -> Result<(), quick_xml::Error> {
        let primitives = collect_all(Reader::from_io(io::Cursor::new(SNIPPET)))?;
        assert_eq!(primitives, expected_primitives());
        Ok(())
    }

    #[test]
    fn parse_fixture() -> Result<(), quick_xml::Error> {
        const DATA: &[u8] = include_bytes!("test_fixtures/transit.osm");
        let primitives = collect_all(Reader::from_buffer(DATA))?;

        let coordinates = primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Coordinate { .. }))
            .count();
        let nodes = primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Node(_)))
            .count();
        let ways = primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Way(_)))
            .count();

        assert_eq!(coordinates, 9);
        assert_eq!(nodes, 3);
        assert_eq!(ways, 6);
        Ok(())
    }
}
