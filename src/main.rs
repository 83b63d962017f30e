use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] routegen::osm::Error);

#[derive(Parser)]
struct Cli {
    /// The path to the OSM file (.osm, .osm.gz or .osm.bz2)
    osm_file: PathBuf,

    /// Name of the starting bus stop (case-insensitive)
    from_stop: String,

    /// Name of the ending bus stop (case-insensitive)
    to_stop: String,

    /// Enumerate alternative simple paths instead of the fastest route
    #[arg(short, long)]
    alternatives: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let g = load_graph(&cli.osm_file)?;

    let start = g
        .bus_stop_by_name(&cli.from_stop)
        .expect("no bus stop with the given start name");

    let end = g
        .bus_stop_by_name(&cli.to_stop)
        .expect("no bus stop with the given end name");

    let budget = routegen::SearchBudget::default();

    if cli.alternatives {
        let paths = routegen::find_waypoints(&g, start.osm_id, end.osm_id, &budget)?;
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        let route = routegen::find_shortest_route(&g, start.osm_id, end.osm_id, &budget)?
            .expect("no route between the given bus stops");
        println!("{}", serde_json::to_string_pretty(&route)?);
    }

    Ok(())
}

fn load_graph<P: AsRef<Path>>(path: P) -> Result<routegen::RoadGraph, Box<dyn Error>> {
    let mut builder = routegen::GraphBuilder::new(routegen::BuilderConfig::default())?;
    let file_format = routegen::osm::FileFormat::from_path(path.as_ref());
    match routegen::osm::load_graph_from_file(&mut builder, file_format, path.as_ref()) {
        Ok(()) => Ok(builder.finish()),
        Err(e) => Err(Box::new(GraphLoadError(PathBuf::from(path.as_ref()), e))),
    }
}
