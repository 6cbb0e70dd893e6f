use std::io::Write;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::canvas::Canvas;
use crate::composite::{Resampling, Rgba8};
use crate::decode::{self, DecodedTile};
use crate::error::{PrintError, PrintResult, TileFetchError};
use crate::fetch::{self, FetchPolicy, TileSource};
use crate::geometry::PageGeometry;
use crate::grid::{TileGrid, TileRequest};
use crate::model::{Layer, PrintJob, TiledLayer};
use crate::output;

/// Engine configuration for one render. Explicit startup state; the engine
/// keeps no ambient globals.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub fetch: FetchPolicy,
    pub resampling: Resampling,
    pub background: Rgba8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fetch: FetchPolicy::default(),
            resampling: Resampling::default(),
            background: [255, 255, 255, 255],
        }
    }
}

/// Per-layer fetch outcome, for observability. A failed tile degrades the
/// image but never the job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerStats {
    pub requested: usize,
    pub fetched: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RenderReport {
    pub layers: Vec<LayerStats>,
}

/// Render one page of the job to a canvas. Layers are composited strictly
/// in declared order; within a layer, tiles are fetched concurrently and
/// blended by this task as results arrive (the canvas has exactly one
/// writer).
#[tracing::instrument(skip_all, fields(page = page_index))]
pub async fn render_page(
    job: &PrintJob,
    page_index: usize,
    source: Arc<dyn TileSource>,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> PrintResult<(Canvas, RenderReport)> {
    job.validate()?;
    let page = job.pages.get(page_index).ok_or_else(|| {
        PrintError::invalid_geometry(format!("page index {page_index} out of range"))
    })?;
    let geometry = PageGeometry::resolve(page, job.dpi, job.units)?;
    let mut canvas = Canvas::new(geometry.width, geometry.height, options.background);
    let mut report = RenderReport::default();

    for (index, layer) in job.layers.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PrintError::Cancelled);
        }
        let stats = match layer {
            Layer::Tiled(tiled) => {
                render_tiled_layer(tiled, &geometry, &mut canvas, source.clone(), options, cancel)
                    .await?
            }
        };
        tracing::debug!(
            layer = index,
            requested = stats.requested,
            failed = stats.failed,
            "layer composited"
        );
        report.layers.push(stats);
    }

    if cancel.is_cancelled() {
        return Err(PrintError::Cancelled);
    }
    Ok((canvas, report))
}

/// Render one page and hand the encoded canvas to the caller's sink.
pub async fn print_page(
    job: &PrintJob,
    page_index: usize,
    source: Arc<dyn TileSource>,
    options: &RenderOptions,
    cancel: &CancellationToken,
    sink: &mut dyn Write,
) -> PrintResult<RenderReport> {
    let (canvas, report) = render_page(job, page_index, source, options, cancel).await?;
    output::write_canvas(&canvas, job.output_format, sink)?;
    Ok(report)
}

async fn render_tiled_layer(
    layer: &TiledLayer,
    geometry: &PageGeometry,
    canvas: &mut Canvas,
    source: Arc<dyn TileSource>,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> PrintResult<LayerStats> {
    let grid = TileGrid::covering(layer, geometry.ground_resolution, &geometry.bbox);
    let mut stats = LayerStats::default();
    if grid.is_empty() {
        return Ok(stats);
    }

    let semaphore = Arc::new(Semaphore::new(options.fetch.concurrency.max(1)));
    let mut workers: JoinSet<(TileRequest, Option<DecodedTile>)> = JoinSet::new();

    for request in grid.clone() {
        stats.requested += 1;
        let locator = fetch::tile_locator(layer, &request);
        let source = source.clone();
        let semaphore = semaphore.clone();
        let policy = options.fetch.clone();
        let cancel = cancel.clone();
        workers.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (request, None);
            };
            match fetch::fetch_with_retry(source.as_ref(), &locator, &policy, &cancel).await {
                Ok(bytes) => match decode::decode_tile(&bytes) {
                    Ok(tile) => (request, Some(tile)),
                    Err(err) => {
                        tracing::warn!(%locator, %err, "tile decode failed, leaving placeholder");
                        (request, None)
                    }
                },
                Err(TileFetchError::Cancelled) => (request, None),
                Err(err) => {
                    tracing::warn!(%locator, %err, "tile fetch failed, leaving placeholder");
                    (request, None)
                }
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        let (request, tile) = joined
            .map_err(|e| PrintError::compositing(format!("tile worker panicked: {e}")))?;
        if cancel.is_cancelled() {
            workers.abort_all();
            return Err(PrintError::Cancelled);
        }
        match tile {
            Some(tile) => {
                let footprint = grid.tile_extent(&request);
                canvas.draw_tile(
                    geometry,
                    footprint,
                    &tile,
                    layer.opacity as f32,
                    options.resampling,
                )?;
                stats.fetched += 1;
            }
            None => stats.failed += 1,
        }
    }

    if cancel.is_cancelled() {
        return Err(PrintError::Cancelled);
    }
    Ok(stats)
}
