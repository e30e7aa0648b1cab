use std::fmt::Display;

use crate::math::Extent;

/// Description of a single tile of a point cloud dataset
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileInfo {
    /// Identifier of the tile, typically its file name
    pub name: String,
    /// Horizontal extent of the points in the tile
    pub extent: Extent,
    /// Number of points in the tile
    pub point_count: usize,
}

/// Enumerates the spatial extents that together cover a point cloud dataset, all given in the same
/// horizontal coordinate reference system
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileIndex {
    crs: String,
    tiles: Vec<TileInfo>,
}

impl TileIndex {
    /// Creates a new `TileIndex` for the given tiles in the coordinate reference system named `crs`
    /// (e.g. `"EPSG:32610"`)
    pub fn new<S: Into<String>>(crs: S, tiles: Vec<TileInfo>) -> Self {
        Self {
            crs: crs.into(),
            tiles,
        }
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn tiles(&self) -> &[TileInfo] {
        &self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Total number of points over all tiles
    pub fn point_count(&self) -> usize {
        self.tiles.iter().map(|tile| tile.point_count).sum()
    }

    /// The smallest extent covering all tiles, or `None` if this index has no tiles
    /// ```
    /// # use lascat_core::math::Extent;
    /// # use lascat_core::meta::{TileIndex, TileInfo};
    /// let index = TileIndex::new(
    ///     "EPSG:32610",
    ///     vec![
    ///         TileInfo { name: "a".into(), extent: Extent::new(0.0, 0.0, 10.0, 10.0).unwrap(), point_count: 5 },
    ///         TileInfo { name: "b".into(), extent: Extent::new(10.0, 0.0, 20.0, 8.0).unwrap(), point_count: 3 },
    ///     ],
    /// );
    /// assert_eq!(index.total_extent(), Some(Extent::new(0.0, 0.0, 20.0, 10.0).unwrap()));
    /// ```
    pub fn total_extent(&self) -> Option<Extent> {
        self.tiles
            .iter()
            .map(|tile| tile.extent)
            .fold(None, |acc: Option<Extent>, extent| match acc {
                None => Some(extent),
                Some(acc) => Some(Extent::union(&acc, &extent)),
            })
    }

    /// Returns all tiles whose extent intersects `extent`
    pub fn tiles_intersecting<'a>(
        &'a self,
        extent: &'a Extent,
    ) -> impl Iterator<Item = (usize, &'a TileInfo)> + 'a {
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, tile)| tile.extent.intersects(extent))
    }
}

impl Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tile index")?;
        writeln!(f, "\tCRS:            {}", self.crs)?;
        writeln!(f, "\tTiles:          {}", self.tiles.len())?;
        writeln!(f, "\tPoints:         {}", self.point_count())?;
        match self.total_extent() {
            Some(extent) => writeln!(f, "\tExtent:         {}", extent)?,
            None => writeln!(f, "\tExtent:         -")?,
        }
        for tile in &self.tiles {
            writeln!(
                f,
                "\t\t{}: {} ({} points)",
                tile.name, tile.extent, tile.point_count
            )?;
        }
        Ok(())
    }
}
