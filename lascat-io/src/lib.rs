#![warn(clippy::all)]
//! Readers and writers for lascat: delimited ASCII point tiles, a [PointSource](lascat_core::source::PointSource)
//! over a directory of such tiles, and ESRI ASCII grids for raster products.

pub mod ascii;
pub mod catalog;
pub mod raster;
