// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The per-connection pipeline: receive an image, fan the work out across
// the shared pools in four stages (grayscale, Canny, contours,
// quadrilateral), crop to the winning contour's bounding box, and reply.
//
// For each stage the handler opens a dedicated result channel, dispatches
// one task per band (or slice), then collects exactly that many results
// before moving on. The handler is the sole reader of its result
// channels; the pools are the sole writers.

use std::net::SocketAddr;
use std::sync::Arc;

use image::{imageops, RgbaImage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument};

use papercrop_core::{Contour, ContourWithArea, PapercropError, Rect, Result, ServerConfig};
use papercrop_vision as vision;

use crate::codec;
use crate::tile::{self, Band, GrayBand};
use crate::worker::{start_pool, Task, TaskFn, QUEUE_DEPTH};

/// Input to the shared image pool: either a color band awaiting grayscale
/// conversion or a gray band awaiting edge detection. Both stage
/// functions run on the same pool, so the input is a tagged union and
/// each function checks it received the variant it expects.
pub enum TileInput {
    /// A view into the shared source image.
    Color { image: Arc<RgbaImage>, band: Band },
    /// A luminance band produced by the grayscale stage.
    Gray(GrayBand),
}

/// Senders into the three long-lived worker pools shared by every
/// connection.
#[derive(Clone)]
pub struct WorkerPools {
    pub image: mpsc::Sender<Task<TileInput, GrayBand>>,
    pub contour: mpsc::Sender<Task<Rect, Vec<Contour>>>,
    pub quad: mpsc::Sender<Task<Vec<Contour>, ContourWithArea>>,
}

impl WorkerPools {
    /// Start the three pools, each with `num_workers` workers.
    ///
    /// The pools run until every `WorkerPools` clone is dropped; workers
    /// then drain their queues and stop.
    pub fn start(num_workers: usize) -> Self {
        let (image_tx, image_rx) = mpsc::channel(QUEUE_DEPTH);
        let (contour_tx, contour_rx) = mpsc::channel(QUEUE_DEPTH);
        let (quad_tx, quad_rx) = mpsc::channel(QUEUE_DEPTH);

        start_pool("image", num_workers, image_rx);
        start_pool("contour", num_workers, contour_rx);
        start_pool("quad", num_workers, quad_rx);

        Self {
            image: image_tx,
            contour: contour_tx,
            quad: quad_tx,
        }
    }
}

/// Grayscale stage: convert a color band of the shared image to luminance.
fn grayscale_stage(input: TileInput) -> Result<GrayBand> {
    match input {
        TileInput::Color { image, band } => Ok(GrayBand {
            rect: band.rect,
            overlap_rows: band.overlap_rows,
            pixels: vision::grayscale_band(&image, band.rect),
        }),
        TileInput::Gray(_) => Err(PapercropError::Worker(
            "grayscale stage expects a color band".into(),
        )),
    }
}

/// Canny stage: edge-detect a gray band, preserving its placement.
fn canny_stage(input: TileInput) -> Result<GrayBand> {
    match input {
        TileInput::Gray(band) => Ok(GrayBand {
            pixels: vision::canny(&band.pixels),
            rect: band.rect,
            overlap_rows: band.overlap_rows,
        }),
        TileInput::Color { .. } => Err(PapercropError::Worker(
            "edge-detection stage expects a gray band".into(),
        )),
    }
}

/// Handle one connection end to end.
///
/// On success the cropped image has been written back and the stream shut
/// down. On error the stream is left as-is; the caller drops it, which the
/// client observes as a reply-less close.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn handle<S>(
    stream: &mut S,
    peer: SocketAddr,
    pools: &WorkerPools,
    config: &ServerConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (source, kind) = codec::read_image(stream, config.buffer_size).await?;
    let bounds = Rect::new(0, 0, source.width() as i32, source.height() as i32);
    let center = bounds.center();
    let source = Arc::new(source);

    // -- Stage 1: grayscale, one task per overlapped band -------------------
    let bands = tile::color_bands(bounds, config.num_workers, config.overlap_size);
    let (gray_tx, mut gray_rx) = mpsc::channel(QUEUE_DEPTH);
    let gray_fn: TaskFn<TileInput, GrayBand> = Arc::new(grayscale_stage);

    for &band in &bands {
        let task = Task {
            peer,
            input: TileInput::Color {
                image: Arc::clone(&source),
                band,
            },
            func: Some(Arc::clone(&gray_fn)),
            reply: gray_tx.clone(),
        };
        dispatch(&pools.image, task).await?;
    }
    drop(gray_tx);

    // -- Stage 2: Canny, resubmitting each gray band as it lands ------------
    let (canny_tx, mut canny_rx) = mpsc::channel(QUEUE_DEPTH);
    let canny_fn: TaskFn<TileInput, GrayBand> = Arc::new(canny_stage);

    for _ in 0..bands.len() {
        let gray_band = collect(&mut gray_rx, shutdown, "grayscale").await?;
        let task = Task {
            peer,
            input: TileInput::Gray(gray_band),
            func: Some(Arc::clone(&canny_fn)),
            reply: canny_tx.clone(),
        };
        dispatch(&pools.image, task).await?;
    }
    drop(canny_tx);

    let mut edge_bands = Vec::with_capacity(bands.len());
    for _ in 0..bands.len() {
        edge_bands.push(collect(&mut canny_rx, shutdown, "canny").await?);
    }

    let edge_map = Arc::new(tile::stitch(bounds, edge_bands));
    debug!("edge map stitched");

    // -- Stage 3: contours over non-overlapping bands of the edge map -------
    let contour_rects = tile::contour_bands(bounds, config.num_workers);
    let (contour_tx, mut contour_rx) = mpsc::channel(QUEUE_DEPTH);
    let contour_fn: TaskFn<Rect, Vec<Contour>> = {
        let edge_map = Arc::clone(&edge_map);
        Arc::new(move |rect| Ok(vision::find_contours(&edge_map, rect)))
    };

    for &rect in &contour_rects {
        let task = Task {
            peer,
            input: rect,
            func: Some(Arc::clone(&contour_fn)),
            reply: contour_tx.clone(),
        };
        dispatch(&pools.contour, task).await?;
    }
    drop(contour_tx);

    let mut contours: Vec<Contour> = Vec::new();
    for _ in 0..contour_rects.len() {
        contours.extend(collect(&mut contour_rx, shutdown, "contour").await?);
    }
    debug!(contours = contours.len(), "contours extracted");

    // -- Stage 4: largest quadrilateral over index-partitioned slices -------
    let slices = tile::partition_slices(contours.len(), config.num_workers);
    let mut parts: Vec<Vec<Contour>> = Vec::with_capacity(slices.len());
    for range in slices.iter().rev() {
        parts.push(contours.split_off(range.start));
    }
    parts.reverse();

    let (quad_tx, mut quad_rx) = mpsc::channel(QUEUE_DEPTH);
    let quad_fn: TaskFn<Vec<Contour>, ContourWithArea> =
        Arc::new(|slice| Ok(vision::largest_quadrilateral(slice)));

    let slice_count = parts.len();
    for part in parts {
        let task = Task {
            peer,
            input: part,
            func: Some(Arc::clone(&quad_fn)),
            reply: quad_tx.clone(),
        };
        dispatch(&pools.quad, task).await?;
    }
    drop(quad_tx);

    let mut best = ContourWithArea::default();
    for _ in 0..slice_count {
        let candidate = collect(&mut quad_rx, shutdown, "quadrilateral").await?;
        if candidate.area > best.area {
            best = candidate;
        }
    }
    info!(area = best.area, "largest quadrilateral selected");

    // -- Crop and reply ------------------------------------------------------
    let crop = crop_rect(&best, center);
    let cropped = imageops::crop_imm(
        source.as_ref(),
        crop.min.x as u32,
        crop.min.y as u32,
        crop.width() as u32,
        crop.height() as u32,
    )
    .to_image();

    info!(crop = %crop, "sending cropped image");
    codec::write_image(stream, &cropped, kind, config.buffer_size).await
}

/// Bounding box of the winning contour, centre-initialized.
///
/// A best area of 0 means no quadrilateral was found; the crop then
/// degenerates to a single pixel at the image centre so the reply remains
/// encodable.
fn crop_rect(best: &ContourWithArea, center: papercrop_core::Point) -> Rect {
    let corners = vision::find_corner(&best.contour, center);
    if best.area == 0.0 || corners.is_empty() {
        Rect::new(center.x, center.y, center.x + 1, center.y + 1)
    } else {
        corners
    }
}

/// Send a task into a pool. A closed pool means the server is tearing
/// down, which a handler reports as shutdown.
async fn dispatch<T, R>(pool: &mpsc::Sender<Task<T, R>>, task: Task<T, R>) -> Result<()> {
    pool.send(task)
        .await
        .map_err(|_| PapercropError::ShuttingDown)
}

/// Wait for the next result of a stage, aborting if the shutdown signal
/// fires first.
async fn collect<R>(
    results: &mut mpsc::Receiver<Result<R>>,
    shutdown: &mut watch::Receiver<bool>,
    stage: &'static str,
) -> Result<R> {
    tokio::select! {
        outcome = results.recv() => match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err),
            None => Err(PapercropError::ChannelClosed(stage)),
        },
        _ = shutdown.wait_for(|&stop| stop) => Err(PapercropError::ShuttingDown),
    }
}
