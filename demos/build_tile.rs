use clap::Parser;
use geo_scenery::{AreaType, GeoJsonBoundaryStore, LayeredPolygonSet, Polygon, TileGrid, TileId, TilePipeline};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use std::convert::TryInto;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (Polygons with an "area" property)
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file (one Polygon per triangle)
    #[arg(short, long)]
    output: PathBuf,

    /// Directory holding the boundaries of tiles already built
    #[arg(long, default_value = "boundaries")]
    boundaries: PathBuf,

    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    origin_lon: f64,

    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    origin_lat: f64,

    /// Tile side length in degrees
    #[arg(long, default_value_t = 0.125)]
    tile_size: f64,

    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    col: i32,

    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    row: i32,
}

fn add_feature(set: &mut LayeredPolygonSet, feature: Feature) -> Result<(), Box<dyn std::error::Error>> {
    let area = match feature.property("area").and_then(|v| v.as_str()) {
        Some(name) => AreaType::from_name(name)?,
        None => AreaType::Default,
    };
    let Some(geom) = feature.geometry else {
        return Ok(());
    };
    let geometry: geo_types::Geometry<f64> = geom.try_into()?;
    match geometry {
        geo_types::Geometry::Polygon(p) => set.add(area, Polygon::from(&p)),
        geo_types::Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                set.add(area, Polygon::from(p));
            }
        }
        _ => println!("Skipping non-polygon {area} feature"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Reading input from {:?}", args.input);
    let reader = BufReader::new(File::open(&args.input)?);
    let geojson: GeoJson = serde_json::from_reader(reader)?;

    let mut input = LayeredPolygonSet::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                add_feature(&mut input, feature)?;
            }
        }
        GeoJson::Feature(feature) => add_feature(&mut input, feature)?,
        GeoJson::Geometry(geom) => add_feature(&mut input, Feature::from(geom))?,
    }
    println!("Loaded {} polygons.", input.len());

    let grid = TileGrid::new(
        geo_types::coord! { x: args.origin_lon, y: args.origin_lat },
        args.tile_size,
    );
    let tile = TileId::new(args.col, args.row);
    let mut store = GeoJsonBoundaryStore::new(&args.boundaries)?;
    let pipeline = TilePipeline::new(grid);
    let out = pipeline.run(tile, &input, &mut store)?;

    println!(
        "Tile {}: {} vertices, {} triangles, {} sides matched.",
        tile,
        out.mesh.vertices().len(),
        out.mesh.triangles().len(),
        out.matches.len()
    );

    let features: Vec<Feature> = out
        .mesh
        .triangles()
        .iter()
        .map(|t| {
            let mut ring: Vec<Vec<f64>> = t
                .vertices
                .iter()
                .map(|&id| {
                    let v = out.mesh.vertex(id);
                    vec![v.position.x, v.position.y]
                })
                .collect();
            ring.push(ring[0].clone());
            let mut feature = Feature::from(Geometry::new(Value::Polygon(vec![ring])));
            feature.set_property("area", t.area.name());
            feature
        })
        .collect();

    let output_fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(writer, &GeoJson::FeatureCollection(output_fc))?;

    println!("Wrote output to {:?}", args.output);
    Ok(())
}
