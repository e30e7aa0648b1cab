use lascat_core::{raster::DEFAULT_NODATA, source::PointFilter};

use crate::{
    denoise::DenoiseParams,
    ground::GroundAlgorithm,
    normalize::{GroundFailurePolicy, NormalizeParams},
    rasterize::{Aggregation, RasterValue},
};

use super::{ProcessingError, ProcessingResult};

/// The product that a catalog run merges from its chunks
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "product", rename_all = "kebab-case")
)]
pub enum OutputProduct {
    /// The cleaned points of all chunk cores, concatenated in chunk order
    Points,
    /// A raster aggregating a per-point value in each cell
    Surface {
        #[cfg_attr(feature = "serde", serde(default))]
        aggregation: Aggregation,
        #[cfg_attr(feature = "serde", serde(default))]
        value: RasterValue,
    },
    /// A digital elevation model sampled from the ground model at the cell centres
    Terrain,
}

impl OutputProduct {
    /// Canopy height model: highest height above ground per cell
    pub fn canopy_height() -> Self {
        OutputProduct::Surface {
            aggregation: Aggregation::Max,
            value: RasterValue::HeightAboveGround,
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, OutputProduct::Points)
    }

    /// Returns true if this product can only be computed from height normalized points
    pub fn needs_ground(&self) -> bool {
        matches!(
            self,
            OutputProduct::Terrain
                | OutputProduct::Surface {
                    value: RasterValue::HeightAboveGround,
                    ..
                }
        )
    }
}

impl Default for OutputProduct {
    fn default() -> Self {
        OutputProduct::Points
    }
}

/// Options of a catalog run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CatalogOptions {
    /// Edge length of the core region of a chunk
    pub chunk_size: f64,
    /// Distance by which the core region of a chunk is grown to obtain its padded region
    pub buffer_margin: f64,
    /// Number of chunks that are processed concurrently
    pub workers: usize,
    /// Filter that the point source applies while loading
    pub filter: PointFilter,
    /// Remove exact duplicate points
    pub deduplicate: bool,
    /// Remove outliers, disabled if `None`
    pub denoise: Option<DenoiseParams>,
    /// Compute height above ground, disabled if `None`
    pub normalize: Option<NormalizeParams>,
    pub product: OutputProduct,
    /// Cell size of raster products
    pub output_resolution: f64,
    /// No-data value of raster products
    pub nodata: f64,
    /// Merge the outputs of the successful chunks even if some chunks failed
    pub allow_partial: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500.0,
            buffer_margin: 30.0,
            workers: 1,
            filter: Default::default(),
            deduplicate: true,
            denoise: Some(Default::default()),
            normalize: Some(Default::default()),
            product: Default::default(),
            output_resolution: 1.0,
            nodata: DEFAULT_NODATA,
            allow_partial: true,
        }
    }
}

fn require(condition: bool, message: impl FnOnce() -> String) -> ProcessingResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProcessingError::InvalidConfiguration(message()))
    }
}

fn is_percent(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

impl CatalogOptions {
    /// Checks all options for consistency. Catalog runs call this before any chunk is processed
    /// ```
    /// # use lascat_algorithms::catalog::{CatalogOptions, OutputProduct};
    /// let options = CatalogOptions {
    ///     normalize: None,
    ///     product: OutputProduct::canopy_height(),
    ///     ..Default::default()
    /// };
    /// assert!(options.validate().is_err());
    /// ```
    pub fn validate(&self) -> ProcessingResult<()> {
        require(self.chunk_size.is_finite() && self.chunk_size > 0.0, || {
            format!("chunk_size must be > 0, but was {}", self.chunk_size)
        })?;
        require(
            self.buffer_margin.is_finite() && self.buffer_margin >= 0.0,
            || format!("buffer_margin must be >= 0, but was {}", self.buffer_margin),
        )?;
        require(self.workers >= 1, || "workers must be at least 1".into())?;

        if let Some(denoise) = &self.denoise {
            require(
                denoise.grid_resolution.is_finite() && denoise.grid_resolution > 0.0,
                || {
                    format!(
                        "Noise grid resolution must be > 0, but was {}",
                        denoise.grid_resolution
                    )
                },
            )?;
            require(
                denoise.above_threshold.is_finite()
                    && denoise.above_threshold >= 0.0
                    && denoise.below_threshold.is_finite()
                    && denoise.below_threshold >= 0.0,
                || {
                    format!(
                        "Noise thresholds must be >= 0, but were {} (above) and {} (below)",
                        denoise.above_threshold, denoise.below_threshold
                    )
                },
            )?;
            require(
                is_percent(denoise.lower_percentile)
                    && is_percent(denoise.upper_percentile)
                    && denoise.lower_percentile <= denoise.upper_percentile,
                || {
                    format!(
                        "Noise percentiles must satisfy 0 <= lower <= upper <= 100, but were {} and {}",
                        denoise.lower_percentile, denoise.upper_percentile
                    )
                },
            )?;
        }

        if let Some(normalize) = &self.normalize {
            if let GroundAlgorithm::KnnIdw { k, power } = normalize.algorithm {
                require(k >= 1, || "knn-idw needs k >= 1".into())?;
                require(power.is_finite() && power >= 0.0, || {
                    format!("knn-idw power must be >= 0, but was {}", power)
                })?;
            }
        }

        if self.product.needs_ground() {
            match &self.normalize {
                None => {
                    return Err(ProcessingError::config(
                        "The output product needs height normalization, but normalization is disabled",
                    ))
                }
                Some(normalize) if normalize.on_failure == GroundFailurePolicy::SkipNormalize => {
                    return Err(ProcessingError::config(
                        "The output product needs a ground model in every chunk, so ground failures can not be skipped",
                    ))
                }
                _ => {}
            }
        }

        if self.product.is_raster() {
            require(
                self.output_resolution.is_finite() && self.output_resolution > 0.0,
                || {
                    format!(
                        "output_resolution must be > 0, but was {}",
                        self.output_resolution
                    )
                },
            )?;
        }
        if let OutputProduct::Surface {
            aggregation: Aggregation::Percentile(percent),
            ..
        } = &self.product
        {
            require(is_percent(*percent), || {
                format!("Aggregation percentile must be in [0, 100], but was {}", percent)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CatalogOptions::default().validate().is_ok());
        let chm = CatalogOptions {
            product: OutputProduct::canopy_height(),
            workers: 4,
            ..Default::default()
        };
        assert!(chm.validate().is_ok());
    }

    #[test]
    fn test_invalid_options() {
        let invalid = vec![
            CatalogOptions {
                chunk_size: 0.0,
                ..Default::default()
            },
            CatalogOptions {
                buffer_margin: -1.0,
                ..Default::default()
            },
            CatalogOptions {
                workers: 0,
                ..Default::default()
            },
            CatalogOptions {
                denoise: Some(DenoiseParams {
                    above_threshold: -5.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
            CatalogOptions {
                denoise: Some(DenoiseParams {
                    lower_percentile: 99.0,
                    upper_percentile: 1.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
            CatalogOptions {
                normalize: Some(NormalizeParams {
                    algorithm: GroundAlgorithm::KnnIdw { k: 0, power: 2.0 },
                    ..Default::default()
                }),
                ..Default::default()
            },
            CatalogOptions {
                product: OutputProduct::Terrain,
                normalize: Some(NormalizeParams {
                    on_failure: GroundFailurePolicy::SkipNormalize,
                    ..Default::default()
                }),
                ..Default::default()
            },
            CatalogOptions {
                product: OutputProduct::Surface {
                    aggregation: Aggregation::Percentile(101.0),
                    value: RasterValue::Elevation,
                },
                ..Default::default()
            },
            CatalogOptions {
                product: OutputProduct::Terrain,
                output_resolution: 0.0,
                ..Default::default()
            },
        ];
        for options in invalid {
            assert!(
                matches!(
                    options.validate(),
                    Err(ProcessingError::InvalidConfiguration(_))
                ),
                "{:?} should be invalid",
                options
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_from_json() {
        let json = r#"{
            "chunk_size": 250.0,
            "workers": 2,
            "normalize": { "algorithm": { "algorithm": "knn-idw", "k": 8, "power": 1.5 } },
            "product": { "product": "surface", "aggregation": { "percentile": 95.0 }, "value": "height-above-ground" }
        }"#;
        let options: CatalogOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.chunk_size, 250.0);
        assert_eq!(options.workers, 2);
        assert_eq!(options.buffer_margin, 30.0);
        assert_eq!(
            options.normalize.unwrap().algorithm,
            GroundAlgorithm::KnnIdw { k: 8, power: 1.5 }
        );
        assert!(options.product.needs_ground());
    }
}
