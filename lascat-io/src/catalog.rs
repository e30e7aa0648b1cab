use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;

use lascat_core::{
    math::Extent,
    meta::{TileIndex, TileInfo},
    points::PointRecord,
    source::{PointFilter, PointSource},
};

use crate::ascii::AsciiReader;

/// File extensions that [AsciiCatalog::from_dir] picks up
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "csv", "xyz"];

#[derive(Debug, Clone)]
struct AsciiTile {
    path: PathBuf,
    extent: Extent,
    point_count: usize,
}

/// A dataset made up of delimited text tiles in a directory. The extent of every tile is determined once when
/// the catalog is opened; queries re-read the tiles that intersect the queried extent
#[derive(Debug, Clone)]
pub struct AsciiCatalog {
    tiles: Vec<AsciiTile>,
    format: String,
    delimiter: String,
    crs: String,
}

impl AsciiCatalog {
    /// Opens all files with a supported extension in `dir` and its subdirectories, in lexicographic order of their
    /// paths. Files without points are skipped
    pub fn from_dir<P: AsRef<Path>>(dir: P, format: &str, delimiter: &str) -> Result<Self> {
        let mut files = WalkDir::new(dir.as_ref())
            .into_iter()
            .filter_map(|entry| -> Option<Result<PathBuf>> {
                match entry {
                    Ok(entry) => {
                        if entry.path().is_file() && is_supported_file(entry.path()) {
                            Some(Ok(entry.path().to_path_buf()))
                        } else {
                            None
                        }
                    }
                    Err(why) => Some(Err(why.into())),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        files.sort();
        Self::from_files(files, format, delimiter)
    }

    /// Opens the given files as tiles of one dataset, keeping their order. Files without points are skipped
    pub fn from_files<I: IntoIterator<Item = PathBuf>>(
        files: I,
        format: &str,
        delimiter: &str,
    ) -> Result<Self> {
        let mut tiles = vec![];
        for path in files {
            let points = read_file(&path, format, delimiter)?;
            match Extent::from_points(points.iter().map(PointRecord::xy)) {
                Some(extent) => tiles.push(AsciiTile {
                    path,
                    extent,
                    point_count: points.len(),
                }),
                None => warn!("Skipping {} as it contains no points", path.display()),
            }
        }
        Ok(Self {
            tiles,
            format: format.to_string(),
            delimiter: delimiter.to_string(),
            crs: String::new(),
        })
    }

    /// Sets the name of the coordinate reference system that all tiles are given in
    pub fn with_crs<S: Into<String>>(mut self, crs: S) -> Self {
        self.crs = crs.into();
        self
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Describes the tiles of this catalog. Tiles are named by their path
    pub fn tile_index(&self) -> TileIndex {
        TileIndex::new(
            self.crs.clone(),
            self.tiles
                .iter()
                .map(|tile| TileInfo {
                    name: tile.path.display().to_string(),
                    extent: tile.extent,
                    point_count: tile.point_count,
                })
                .collect(),
        )
    }
}

impl PointSource for AsciiCatalog {
    fn read_extent(&self, extent: &Extent, filter: &PointFilter) -> Result<Vec<PointRecord>> {
        let mut points = vec![];
        for tile in self
            .tiles
            .iter()
            .filter(|tile| tile.extent.intersects(extent))
        {
            debug!("Reading {} for {}", tile.path.display(), extent);
            points.extend(
                read_file(&tile.path, &self.format, &self.delimiter)?
                    .into_iter()
                    .filter(|point| extent.contains(point.x(), point.y()) && filter.accepts(point)),
            );
        }
        Ok(points)
    }
}

fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| extension.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn read_file(path: &Path, format: &str, delimiter: &str) -> Result<Vec<PointRecord>> {
    AsciiReader::from_path(path, format, delimiter)?
        .read_all()
        .with_context(|| format!("Failed to read points from {}", path.display()))
}
