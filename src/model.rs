use crate::error::{PrintError, PrintResult};

/// A structured print job, as handed over by the spec parser. Immutable for
/// the lifetime of one print operation.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub srs: String,
    pub units: Units,
    pub dpi: f64,
    pub output_format: OutputFormat,
    pub layers: Vec<Layer>,
    pub pages: Vec<Page>,
}

/// One page of the job: the requested world extent plus the map scale
/// denominator that, together with the job DPI, fixes the ground resolution.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Page {
    pub bbox: Extent,
    pub scale: f64,
}

/// World-space rectangle in job SRS units. Serialized as
/// `[minX, minY, maxX, maxY]`, matching the wire form of print specs.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.min_x < self.max_x && self.min_y < self.max_y)
            || !self.min_x.is_finite()
            || !self.min_y.is_finite()
            || !self.max_x.is_finite()
            || !self.max_y.is_finite()
    }

    /// `None` when the two extents do not overlap (edge contact counts as
    /// empty overlap).
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let out = Extent::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        if out.min_x < out.max_x && out.min_y < out.max_y {
            Some(out)
        } else {
            None
        }
    }
}

impl From<[f64; 4]> for Extent {
    fn from(v: [f64; 4]) -> Self {
        Extent::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Extent> for [f64; 4] {
    fn from(e: Extent) -> Self {
        [e.min_x, e.min_y, e.max_x, e.max_y]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Meters,
    Degrees,
    Feet,
    Inches,
}

impl Units {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Units::Meters => 1.0,
            // Mean length of one degree of latitude on the WGS84 sphere.
            Units::Degrees => 111_319.490_793_273_58,
            Units::Feet => 0.3048,
            Units::Inches => 0.0254,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

/// A map layer. Closed set of variants sharing the "produce pixel data for a
/// requested extent at a requested resolution" capability; new kinds (single
/// image overlays, vectors) slot in without touching the pipeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "OSM", alias = "XYZ", alias = "WMTS")]
    Tiled(TiledLayer),
}

impl Layer {
    pub fn validate(&self) -> PrintResult<()> {
        match self {
            Layer::Tiled(layer) => layer.validate(),
        }
    }
}

/// A tiled raster source with a fixed resolution pyramid, addressed
/// `{baseURL}/{z}/{x}/{y}.{extension}`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiledLayer {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub max_extent: Extent,
    pub tile_size: [u32; 2],
    /// Ground resolution per pyramid level, strictly decreasing (level 0 is
    /// the coarsest).
    pub resolutions: Vec<f64>,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_extension() -> String {
    "png".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

impl TiledLayer {
    pub fn validate(&self) -> PrintResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(PrintError::layer_configuration("baseURL must be non-empty"));
        }
        if self.max_extent.is_degenerate() {
            return Err(PrintError::layer_configuration(
                "maxExtent must be a non-degenerate extent",
            ));
        }
        if self.tile_size[0] == 0 || self.tile_size[1] == 0 {
            return Err(PrintError::layer_configuration(
                "tileSize must be positive in both dimensions",
            ));
        }
        if self.resolutions.is_empty() {
            return Err(PrintError::layer_configuration(
                "resolutions must be non-empty",
            ));
        }
        for pair in self.resolutions.windows(2) {
            if !(pair[1] < pair[0]) {
                return Err(PrintError::layer_configuration(
                    "resolutions must be strictly decreasing",
                ));
            }
        }
        if self.resolutions.iter().any(|r| !(*r > 0.0) || !r.is_finite()) {
            return Err(PrintError::layer_configuration(
                "resolutions must be positive and finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(PrintError::layer_configuration(
                "opacity must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Page {
    pub fn validate(&self) -> PrintResult<()> {
        if self.bbox.is_degenerate() {
            return Err(PrintError::invalid_geometry(
                "page bbox must satisfy minX < maxX and minY < maxY",
            ));
        }
        if !(self.scale > 0.0) || !self.scale.is_finite() {
            return Err(PrintError::invalid_geometry("page scale must be > 0"));
        }
        Ok(())
    }
}

impl PrintJob {
    pub fn validate(&self) -> PrintResult<()> {
        if !(self.dpi > 0.0) || !self.dpi.is_finite() {
            return Err(PrintError::invalid_geometry("dpi must be > 0"));
        }
        if self.pages.is_empty() {
            return Err(PrintError::invalid_geometry(
                "job must declare at least one page",
            ));
        }
        for page in &self.pages {
            page.validate()?;
        }
        for layer in &self.layers {
            layer.validate()?;
        }
        Ok(())
    }
}
