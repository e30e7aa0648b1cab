use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use lascat_core::raster::RasterGrid;

/// Writes `grid` in the ESRI ASCII grid format. Rows are written from north to south
pub fn write_ascii_grid_to<W: Write>(grid: &RasterGrid, mut writer: W) -> Result<()> {
    let extent = grid.extent();
    writeln!(writer, "ncols {}", grid.cols())?;
    writeln!(writer, "nrows {}", grid.rows())?;
    writeln!(writer, "xllcorner {}", extent.xmin())?;
    writeln!(writer, "yllcorner {}", extent.ymin())?;
    writeln!(writer, "cellsize {}", grid.resolution())?;
    writeln!(writer, "NODATA_value {}", grid.nodata())?;
    for row in grid.data().chunks(grid.cols().max(1)) {
        let line = row
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `grid` to a new ESRI ASCII grid file at `path`
pub fn write_ascii_grid<P: AsRef<Path>>(grid: &RasterGrid, path: P) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    write_ascii_grid_to(grid, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lascat_core::{math::Extent, raster::DEFAULT_NODATA};

    #[test]
    fn test_write_ascii_grid() -> Result<()> {
        let extent = Extent::new(10.0, 20.0, 14.0, 22.0)?;
        let mut grid = RasterGrid::covering(&extent, 2.0, DEFAULT_NODATA)?;
        grid.set(0, 1, 3.5);
        let mut out = vec![];
        write_ascii_grid_to(&grid, &mut out)?;
        assert_eq!(
            String::from_utf8(out)?,
            "ncols 2\nnrows 1\nxllcorner 10\nyllcorner 20\ncellsize 2\nNODATA_value -9999\n-9999 3.5\n"
        );
        Ok(())
    }
}
