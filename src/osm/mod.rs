// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io;
use std::path::Path;

use crate::GraphBuilder;

mod model;
mod xml;

pub use model::{Primitive, PrimitiveSource, RawNode, RawWay};
pub use xml::{primitives_from_buffer, primitives_from_io};

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the extension of the provided path,
    /// assuming uncompressed XML when the extension is unrecognized.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::XmlGz,
            Some("bz2") => Self::XmlBz2,
            _ => Self::Xml,
        }
    }
}

/// Error encountered while streaming OSM primitives into a [GraphBuilder].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Parse OSM primitives from a reader into the provided [GraphBuilder].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn load_graph_from_io<R: io::Read>(
    builder: &mut GraphBuilder,
    file_format: FileFormat,
    reader: R,
) -> Result<(), Error> {
    match file_format {
        FileFormat::Xml => {
            let b = io::BufReader::new(reader);
            builder.drain(primitives_from_io(b))?;
            Ok(())
        }

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            let b = io::BufReader::new(d);
            builder.drain(primitives_from_io(b))?;
            Ok(())
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            let b = io::BufReader::new(d);
            builder.drain(primitives_from_io(b))?;
            Ok(())
        }
    }
}

/// Parse OSM primitives from a file at the provided path into the provided [GraphBuilder].
pub fn load_graph_from_file<P: AsRef<Path>>(
    builder: &mut GraphBuilder,
    file_format: FileFormat,
    path: P,
) -> Result<(), Error> {
    let f = File::open(path)?;
    load_graph_from_io(builder, file_format, f)
}

/// Parse OSM primitives from a static buffer into the provided [GraphBuilder].
pub fn load_graph_from_buffer(
    builder: &mut GraphBuilder,
    file_format: FileFormat,
    data: &[u8],
) -> Result<(), Error> {
    if file_format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        builder.drain(primitives_from_buffer(data))?;
        Ok(())
    } else {
        // Wrap the buffer in a cursor and use the IO path
        let cursor = io::Cursor::new(data);
        load_graph_from_io(builder, file_format, cursor)
    }
}
