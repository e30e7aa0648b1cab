use std::{fs::File, io::BufReader, path::PathBuf, time::Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_t, App, Arg, ArgMatches};
use lascat_algorithms::{
    catalog::{run, CatalogOptions, MergedProduct, OutputProduct, Target},
    ground::GroundAlgorithm,
};
use lascat_core::points::HEIGHT_ABOVE_GROUND;
use lascat_io::{
    ascii::{AsciiWriter, FORMAT_LITERALS},
    catalog::AsciiCatalog,
    raster::write_ascii_grid,
};
use log::{info, warn};

struct Args {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub format: String,
    pub delimiter: String,
    pub options: CatalogOptions,
}

fn get_matches<'a>() -> ArgMatches<'a> {
    App::new("lascat process")
        .version("0.1")
        .about("Processes a directory of point tiles chunk by chunk and merges the chunk outputs")
        .after_help(FORMAT_LITERALS)
        .arg(Arg::with_name("INPUT").short("i").takes_value(true).value_name("DIR").help("Directory containing the point tiles").required(true))
        .arg(Arg::with_name("OUTPUT").short("o").takes_value(true).value_name("FILE").help("Output file. Points are written as delimited text, rasters as ESRI ASCII grid").required(true))
        .arg(Arg::with_name("FORMAT").short("f").long("format").takes_value(true).default_value("xyzirnc").help("Column layout of the input tiles"))
        .arg(Arg::with_name("DELIMITER").short("d").long("delimiter").takes_value(true).default_value(",").help("Column delimiter of the input tiles"))
        .arg(Arg::with_name("CONFIG").long("config").takes_value(true).value_name("JSON").help("JSON file with catalog options. Command line options take precedence"))
        .arg(Arg::with_name("CHUNK_SIZE").long("chunk-size").takes_value(true).help("Edge length of the chunk cores"))
        .arg(Arg::with_name("BUFFER").long("buffer").takes_value(true).help("Buffer margin around the chunk cores"))
        .arg(Arg::with_name("WORKERS").long("workers").takes_value(true).help("Number of chunks processed concurrently"))
        .arg(Arg::with_name("PRODUCT").long("product").takes_value(true).possible_values(&["points", "chm", "dem"]).help("Merged product"))
        .arg(Arg::with_name("RESOLUTION").long("resolution").takes_value(true).help("Cell size of raster products"))
        .arg(Arg::with_name("NO_NORMALIZE").long("no-normalize").help("Do not compute heights above ground"))
        .arg(Arg::with_name("GROUND").long("ground").takes_value(true).possible_values(&["tin", "knnidw"]).help("Ground interpolation"))
        .arg(Arg::with_name("KNN_K").long("knn-k").takes_value(true).help("Number of neighbours of the knnidw ground interpolation"))
        .arg(Arg::with_name("KNN_POWER").long("knn-power").takes_value(true).help("Distance power of the knnidw ground interpolation"))
        .arg(Arg::with_name("STRICT").long("strict").help("Fail instead of merging a partial product if a chunk fails"))
        .get_matches()
}

fn load_options(matches: &ArgMatches) -> Result<CatalogOptions> {
    let mut options: CatalogOptions = match matches.value_of("CONFIG") {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Could not open {}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Invalid catalog options in {}", path))?
        }
        None => Default::default(),
    };

    if matches.is_present("CHUNK_SIZE") {
        options.chunk_size = value_t!(matches, "CHUNK_SIZE", f64)?;
    }
    if matches.is_present("BUFFER") {
        options.buffer_margin = value_t!(matches, "BUFFER", f64)?;
    }
    if matches.is_present("WORKERS") {
        options.workers = value_t!(matches, "WORKERS", usize)?;
    }
    if matches.is_present("RESOLUTION") {
        options.output_resolution = value_t!(matches, "RESOLUTION", f64)?;
    }
    if matches.is_present("STRICT") {
        options.allow_partial = false;
    }
    match matches.value_of("PRODUCT") {
        Some("points") => options.product = OutputProduct::Points,
        Some("chm") => options.product = OutputProduct::canopy_height(),
        Some("dem") => options.product = OutputProduct::Terrain,
        Some(other) => bail!("Unknown product {}", other),
        None => {}
    }

    if matches.is_present("NO_NORMALIZE") {
        options.normalize = None;
    } else if let Some(normalize) = options.normalize.as_mut() {
        match matches.value_of("GROUND") {
            Some("tin") => normalize.algorithm = Default::default(),
            Some("knnidw") => normalize.algorithm = GroundAlgorithm::knn_idw(),
            Some(other) => bail!("Unknown ground interpolation {}", other),
            None => {}
        }
        if let GroundAlgorithm::KnnIdw { k, power } = &mut normalize.algorithm {
            if matches.is_present("KNN_K") {
                *k = value_t!(matches, "KNN_K", usize)?;
            }
            if matches.is_present("KNN_POWER") {
                *power = value_t!(matches, "KNN_POWER", f64)?;
            }
        }
    }
    Ok(options)
}

fn get_args() -> Result<Args> {
    let matches = get_matches();
    let value = |name: &str| -> Result<String> {
        matches
            .value_of(name)
            .map(String::from)
            .ok_or_else(|| anyhow!("Missing argument {}", name))
    };
    Ok(Args {
        input_dir: PathBuf::from(value("INPUT")?),
        output: PathBuf::from(value("OUTPUT")?),
        format: value("FORMAT")?,
        delimiter: value("DELIMITER")?,
        options: load_options(&matches)?,
    })
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let catalog = AsciiCatalog::from_dir(&args.input_dir, &args.format, &args.delimiter)?;
    info!(
        "Found {} tiles in {}",
        catalog.tile_count(),
        args.input_dir.display()
    );

    let t_start = Instant::now();
    let report = run(&Target::Catalog(catalog.tile_index()), &catalog, &args.options)?;
    info!("Catalog processed in {:.2}s", t_start.elapsed().as_secs_f64());

    match &report.product {
        MergedProduct::Points(points) => {
            let format = if points.has_field(HEIGHT_ABOVE_GROUND) {
                "xyzirnch"
            } else {
                "xyzirnc"
            };
            let mut writer = AsciiWriter::from_path(&args.output, format)?;
            writer.write(points)?;
            writer.flush()?;
        }
        MergedProduct::Raster(raster) => write_ascii_grid(raster, &args.output)?,
    }
    info!("Wrote {}", args.output.display());

    println!("{}", report);
    if !report.is_complete() {
        warn!(
            "{} of {} chunks are missing from the product",
            report.planned - report.succeeded.len(),
            report.planned
        );
    }
    Ok(())
}
