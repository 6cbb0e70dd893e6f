#![forbid(unsafe_code)]

pub mod canvas;
pub mod composite;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod grid;
pub mod model;
pub mod output;
pub mod pipeline;

pub use canvas::Canvas;
pub use composite::{Resampling, Rgba8};
pub use decode::DecodedTile;
pub use error::{PrintError, PrintResult, TileFetchError};
pub use fetch::{FetchPolicy, FileTileSource, HttpTileSource, TileSource, tile_locator};
pub use geometry::PageGeometry;
pub use grid::{TileGrid, TileRequest, select_level};
pub use model::{Extent, Layer, OutputFormat, Page, PrintJob, TiledLayer, Units};
pub use output::write_canvas;
pub use pipeline::{LayerStats, RenderOptions, RenderReport, print_page, render_page};
