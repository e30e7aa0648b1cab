use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{App, Arg};
use lascat_io::{ascii::FORMAT_LITERALS, catalog::AsciiCatalog};
use log::info;

struct Args {
    pub input_dir: PathBuf,
    pub format: String,
    pub delimiter: String,
    pub crs: String,
}

fn get_args() -> Result<Args> {
    let matches = App::new("lascat info")
        .version("0.1")
        .about("Prints the tile index of a directory of point tiles")
        .after_help(FORMAT_LITERALS)
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .takes_value(true)
                .value_name("DIR")
                .help("Directory containing the point tiles")
                .required(true),
        )
        .arg(
            Arg::with_name("FORMAT")
                .short("f")
                .long("format")
                .takes_value(true)
                .default_value("xyzirnc")
                .help("Column layout of the tiles"),
        )
        .arg(
            Arg::with_name("DELIMITER")
                .short("d")
                .long("delimiter")
                .takes_value(true)
                .default_value(",")
                .help("Column delimiter of the tiles, a single space splits at any whitespace"),
        )
        .arg(
            Arg::with_name("CRS")
                .long("crs")
                .takes_value(true)
                .default_value("unknown")
                .help("Name of the coordinate reference system of the tiles"),
        )
        .get_matches();

    let value = |name: &str| -> Result<String> {
        matches
            .value_of(name)
            .map(String::from)
            .ok_or_else(|| anyhow!("Missing argument {}", name))
    };
    Ok(Args {
        input_dir: PathBuf::from(value("INPUT")?),
        format: value("FORMAT")?,
        delimiter: value("DELIMITER")?,
        crs: value("CRS")?,
    })
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    info!("Indexing {}", args.input_dir.display());
    let catalog =
        AsciiCatalog::from_dir(&args.input_dir, &args.format, &args.delimiter)?.with_crs(args.crs);
    print!("{}", catalog.tile_index());
    Ok(())
}
