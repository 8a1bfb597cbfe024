//! Progressive renderer for Fractal Refinery.
//!
//! The frame is split into a grid of cells, and each cell is refined from coarse
//! chunks down to single pixels. Every visit to a cell evaluates only the pixels the
//! coarser levels haven't, and paints each one across the chunk it stands for, so
//! the image sharpens in place without redoing work.
//!
//! Rendering happens in these steps:
//! -   `initialize` allocates the frame and installs the palette.
//! -   `configure` builds the engine (backend, algorithm, point mapper) and the worker pool.
//! -   Each `render_frame` advances one cell (gradual) or every cell (full) and
//!     reports the result on the event channel.
//!
//! Within a cell, pixel columns run in parallel on the pool. A [`RenderHandle`] can
//! stop a pass or queue new settings from another thread; both take effect
//! cooperatively, between pixels.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::{Receiver, Sender},
    Arc, Mutex, MutexGuard,
};

use fr_core::{
    engine::{self, Engine},
    image::Colorizer,
    settings::RenderSettings,
    Complex, Size,
};
use image::{Rgb, RgbImage};
use num::BigRational;
use rayon::prelude::*;

mod cancel;
mod frame;
mod schedule;

pub use cancel::CancellationToken;
pub use fr_core::Error;
pub use frame::Frame;
pub use schedule::{cells, Cell, ChunkState};

/// Notifications about render progress.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
    FrameStarted,
    /// A pass completed; the frame as it stands.
    FrameFinished(RgbImage),
    /// The session stopped before finishing: explicit stop, replaced settings,
    /// or a view that lies entirely inside the set.
    RenderHalted,
}

/// What a call to [`ProgressiveRenderer::render_frame`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum PassOutcome {
    Finished(RgbImage),
    /// Cancelled mid-pass. Pixels written before the cancellation stay.
    Halted,
    /// Nothing left to refine until the settings change.
    Settled,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking worker can't leave these half-updated.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// State shared between the renderer and its handles.
struct Control {
    session: Mutex<Option<Arc<CancellationToken>>>,
    pending: Mutex<Option<RenderSettings>>,
    events: Mutex<Sender<RenderEvent>>,
}

impl Control {
    fn emit(&self, event: RenderEvent) {
        // Nobody listening is fine.
        let _ = lock(&self.events).send(event);
    }

    /// The live session's token, or a fresh one.
    fn begin_session(&self) -> Arc<CancellationToken> {
        let mut session = lock(&self.session);
        match session.as_ref() {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                tracing::info!("render session started");
                let token = Arc::new(CancellationToken::new());
                *session = Some(token.clone());
                token
            }
        }
    }

    /// Cancels the live session, if any. Emits `RenderHalted` exactly once per session.
    fn halt(&self) -> bool {
        let mut session = lock(&self.session);
        match session.take() {
            Some(token) if token.cancel() => {
                tracing::info!("render session halted");
                self.emit(RenderEvent::RenderHalted);
                true
            }
            _ => false,
        }
    }

    /// Ends the session without a halt: nothing is left to do.
    fn end_session(&self) {
        if lock(&self.session).take().is_some() {
            tracing::info!("render session complete");
        }
    }

    /// Emits `FrameFinished` unless `token` was cancelled first.
    fn finish_frame(&self, token: &CancellationToken, image: RgbImage) -> bool {
        // Holding the session lock orders this against `halt`.
        let _session = lock(&self.session);
        if token.is_cancelled() {
            return false;
        }
        self.emit(RenderEvent::FrameFinished(image));
        true
    }
}

/// Controls a renderer from other threads.
#[derive(Clone)]
pub struct RenderHandle {
    control: Arc<Control>,
}

impl RenderHandle {
    /// Cancels the pass in flight. Without a live session this does nothing.
    pub fn stop(&self) -> bool {
        self.control.halt()
    }

    /// Queues `settings` for the next frame and halts the current pass.
    ///
    /// Settings are checked here, so a bad tag fails now rather than mid-render.
    pub fn replace_settings(&self, settings: RenderSettings) -> Result<(), Error> {
        engine::check(&settings)?;
        *lock(&self.control.pending) = Some(settings);
        self.control.halt();
        Ok(())
    }
}

/// Output resolution and palette.
struct Canvas {
    frame: Frame,
    colorizer: Colorizer,
}

/// Work done within one sweep over all cells.
#[derive(Copy, Clone, Debug, Default)]
struct Sweep {
    open: bool,
    evaluated: usize,
    in_set: usize,
}

/// Everything derived from the current settings.
struct View {
    settings: RenderSettings,
    engine: Box<dyn Engine>,
    pool: rayon::ThreadPool,
    cells: Vec<Cell>,
    chunks: Vec<ChunkState>,
    next_cell: usize,
    sweep: Sweep,
    sweeps: usize,
    settled: bool,
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool, Error> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Config(format!("error creating thread pool: {}", e)))
}

/// Cell bounds sit on the grid of the largest chunk size, so no coarse level
/// leaves a strip at a cell's edge unpainted.
fn layout(size: Size, settings: &RenderSettings) -> Vec<Cell> {
    let align = settings.max_chunk_sizes.iter().copied().max().unwrap_or(1);
    cells(size, settings.cells, align)
}

fn fresh_chunks(settings: &RenderSettings, cells: &[Cell]) -> Vec<ChunkState> {
    settings
        .max_chunk_sizes
        .iter()
        .zip(cells)
        .map(|(max, cell)| {
            let mut chunk = ChunkState::new(*max);
            if cell.is_empty() {
                chunk.finish();
            }
            chunk
        })
        .collect()
}

impl View {
    fn new(settings: RenderSettings, size: Size) -> Result<Self, Error> {
        let engine = engine::build(&settings, size)?;
        let pool = build_pool(settings.threads)?;
        let cells = layout(size, &settings);
        Ok(View {
            chunks: fresh_chunks(&settings, &cells),
            cells,
            settings,
            engine,
            pool,
            next_cell: 0,
            sweep: Sweep::default(),
            sweeps: 0,
            settled: false,
        })
    }

    /// Applies new settings, rebuilding only what they invalidate.
    fn update(&mut self, settings: RenderSettings, size: Size) -> Result<(), Error> {
        let diff = settings.diff(&self.settings);
        if diff.is_empty() {
            return Ok(());
        }
        tracing::debug!("settings changed: {:?}", diff);
        // Build everything fallible first, so an error leaves the view as it was.
        let engine = if diff.rebuild {
            Some(engine::build(&settings, size)?)
        } else {
            None
        };
        let viewport = if diff.viewport && !diff.rebuild {
            Some(settings.viewport(size)?)
        } else {
            None
        };
        let pool = if diff.threads {
            Some(build_pool(settings.threads)?)
        } else {
            None
        };

        if let Some(viewport) = viewport {
            self.engine.set_viewport(&viewport)?;
        }
        if diff.resets_chunks() {
            self.abandon_sweep();
        }
        if let Some(engine) = engine {
            self.engine = engine;
        }
        if let Some(pool) = pool {
            self.pool = pool;
        }
        if diff.layout {
            self.cells = layout(size, &settings);
        }
        if diff.resets_chunks() {
            self.reset(&settings);
        }
        self.settings = settings;
        Ok(())
    }

    fn reset(&mut self, settings: &RenderSettings) {
        self.chunks = fresh_chunks(settings, &self.cells);
        self.next_cell = 0;
        self.sweep = Sweep::default();
        self.settled = false;
    }

    fn open_sweep(&mut self) {
        if !self.sweep.open {
            tracing::debug!("sweep {} start", self.sweeps);
            self.engine.frame_start();
            self.sweep = Sweep {
                open: true,
                ..Sweep::default()
            };
        }
    }

    /// Ends an open sweep early, keeping `frame_start` and `frame_end` paired.
    fn abandon_sweep(&mut self) {
        if self.sweep.open {
            tracing::debug!("sweep {} abandoned", self.sweeps);
            self.engine.frame_end();
            self.sweep = Sweep::default();
        }
    }

    fn close_sweep(&mut self) -> Sweep {
        self.engine.frame_end();
        let done = self.sweep;
        tracing::debug!(
            "sweep {} end: {} evaluated, {} in set",
            self.sweeps,
            done.evaluated,
            done.in_set
        );
        self.sweep = Sweep::default();
        self.sweeps += 1;
        done
    }

    /// Refines one cell by one level. False if cancelled, in which case the cell
    /// stays at its level.
    fn visit(&mut self, index: usize, canvas: &Canvas, token: &CancellationToken) -> bool {
        let chunk = self.chunks[index];
        if chunk.is_finished() {
            return true;
        }
        let cell = &self.cells[index];
        let size = chunk.size();
        let evaluated = AtomicUsize::new(0);
        let in_set = AtomicUsize::new(0);
        let engine = &*self.engine;
        tracing::debug!(
            "cell {} ({:?} x {:?}) at chunk size {}",
            index,
            cell.x,
            cell.y,
            size
        );

        let columns: Vec<usize> = cell.x.clone().filter(|x| x % size == 0).collect();
        self.pool.install(|| {
            columns.par_iter().for_each(|&px| {
                for py in cell.y.clone().filter(|y| y % size == 0) {
                    if token.is_cancelled() {
                        return;
                    }
                    if !chunk.samples(px, py) {
                        continue;
                    }
                    let result = engine.evaluate(px, py);
                    if token.is_cancelled() {
                        return;
                    }
                    evaluated.fetch_add(1, Ordering::Relaxed);
                    if !result.escaped {
                        in_set.fetch_add(1, Ordering::Relaxed);
                    }
                    // Clipped to the cell, so a coarse block never covers a neighbor's
                    // finer samples.
                    let x_end = std::cmp::min(px + size, cell.x.end);
                    let y_end = std::cmp::min(py + size, cell.y.end);
                    canvas
                        .frame
                        .fill(px..x_end, py..y_end, canvas.colorizer.color(&result));
                }
            })
        });

        if token.is_cancelled() {
            return false;
        }
        self.sweep.evaluated += evaluated.into_inner();
        self.sweep.in_set += in_set.into_inner();
        self.chunks[index].advance();
        true
    }

    /// Advances cells from `next_cell`: one of them when gradual, all the rest otherwise.
    /// Returns the finished sweep, if this pass closed one, or `None` when cancelled.
    fn pass(&mut self, canvas: &Canvas, token: &CancellationToken) -> Option<Option<Sweep>> {
        self.open_sweep();
        loop {
            let index = self.next_cell;
            // Finished cells don't use up a gradual tick.
            let worked = !self.chunks[index].is_finished();
            if !self.visit(index, canvas, token) {
                return None;
            }
            self.next_cell = (index + 1) % self.cells.len();
            if self.next_cell == 0 {
                return Some(Some(self.close_sweep()));
            }
            if self.settings.gradual && worked {
                return Some(None);
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.chunks.iter().all(ChunkState::is_finished)
    }
}

/// Renders a fractal progressively into a frame.
pub struct ProgressiveRenderer {
    control: Arc<Control>,
    canvas: Option<Canvas>,
    view: Option<View>,
}

impl ProgressiveRenderer {
    /// A renderer, and the receiving end of its events.
    pub fn new() -> (Self, Receiver<RenderEvent>) {
        let (events, receiver) = std::sync::mpsc::channel();
        let control = Arc::new(Control {
            session: Mutex::new(None),
            pending: Mutex::new(None),
            events: Mutex::new(events),
        });
        let renderer = ProgressiveRenderer {
            control,
            canvas: None,
            view: None,
        };
        (renderer, receiver)
    }

    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            control: self.control.clone(),
        }
    }

    /// Allocates a frame of `size` pixels and installs `palette`.
    ///
    /// Re-initializing with a new size keeps the settings but starts refinement over.
    pub fn initialize(&mut self, size: Size, palette: Vec<Rgb<u8>>) -> Result<(), Error> {
        if size.width == 0 || size.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "empty frame {}x{}",
                size.width, size.height
            )));
        }
        if u32::try_from(size.width).is_err()
            || u32::try_from(size.height).is_err()
            || size.checked_area().is_none()
        {
            return Err(Error::InvalidArgument(format!(
                "frame {}x{} is too large",
                size.width, size.height
            )));
        }
        let colorizer = Colorizer::new(palette)?;
        let view = match &self.view {
            Some(view) => Some(View::new(view.settings.clone(), size)?),
            None => None,
        };
        if let Some(old) = &mut self.view {
            old.abandon_sweep();
        }
        self.control.halt();
        tracing::info!("initialized {}x{} frame", size.width, size.height);
        self.canvas = Some(Canvas {
            frame: Frame::new(size),
            colorizer,
        });
        self.view = view;
        Ok(())
    }

    /// Applies settings.
    ///
    /// Fails with `InvalidState` before `initialize`, and with `Config` for settings
    /// that can't be rendered; in both cases nothing changes. A live session is halted.
    pub fn configure(&mut self, settings: RenderSettings) -> Result<(), Error> {
        let size = match &self.canvas {
            Some(canvas) => canvas.frame.size(),
            None => {
                tracing::error!("configure called before initialize");
                return Err(Error::InvalidState(
                    "renderer is not initialized".to_string(),
                ));
            }
        };
        if let Err(e) = engine::check(&settings) {
            tracing::error!("configuration rejected: {}", e);
            return Err(e);
        }
        let result = match &mut self.view {
            Some(view) => {
                if settings.diff(&view.settings).is_empty() {
                    return Ok(());
                }
                view.update(settings, size)
            }
            None => View::new(settings, size).map(|view| {
                self.view = Some(view);
            }),
        };
        if let Err(e) = &result {
            tracing::error!("configuration rejected: {}", e);
            return result;
        }
        self.control.halt();
        if let Some(view) = &self.view {
            tracing::info!(
                "configured {} over {}, {} iterations, magnification {}",
                view.settings.algorithm,
                view.settings.numeric,
                view.settings.max_iterations,
                view.settings.magnification
            );
        }
        Ok(())
    }

    /// Runs one pass.
    ///
    /// Settings queued through a handle are applied first. Emits `FrameStarted`, then
    /// either `FrameFinished` or, if the pass is stopped, nothing further for it
    /// (the stop itself emits `RenderHalted`).
    pub fn render_frame(&mut self) -> Result<PassOutcome, Error> {
        let pending = lock(&self.control.pending).take();
        if let Some(settings) = pending {
            self.configure(settings)?;
        }
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| Error::InvalidState("renderer is not initialized".to_string()))?;
        let view = self
            .view
            .as_mut()
            .ok_or_else(|| Error::InvalidState("renderer is not configured".to_string()))?;
        if view.settled {
            return Ok(PassOutcome::Settled);
        }

        let token = self.control.begin_session();
        let span = tracing::info_span!(
            "render-pass",
            numeric = view.settings.numeric.as_str(),
            algorithm = view.settings.algorithm.as_str()
        );
        let _guard = span.enter();
        self.control.emit(RenderEvent::FrameStarted);

        let sweep = match view.pass(canvas, &token) {
            Some(sweep) => sweep,
            None => {
                tracing::debug!("pass halted");
                return Ok(PassOutcome::Halted);
            }
        };
        let image = canvas.frame.snapshot();
        if !self.control.finish_frame(&token, image.clone()) {
            return Ok(PassOutcome::Halted);
        }

        let all_in_set = matches!(sweep, Some(s) if s.evaluated > 0 && s.in_set == s.evaluated);
        if all_in_set {
            tracing::info!("every sample is inside the set; settling");
            view.settled = true;
            self.control.halt();
        } else if view.is_complete() {
            tracing::info!("refinement complete after {} sweeps", view.sweeps);
            view.settled = true;
            self.control.end_session();
        }
        Ok(PassOutcome::Finished(image))
    }

    /// Cancels the pass in flight, as [`RenderHandle::stop`].
    pub fn stop(&self) -> bool {
        self.control.halt()
    }

    /// The exact plane coordinate of pixel (x, y), for `0 <= x <= width`, `0 <= y <= height`.
    pub fn get_coordinate_for_pixel(
        &self,
        x: usize,
        y: usize,
    ) -> Result<Complex<BigRational>, Error> {
        match (&self.canvas, &self.view) {
            (Some(canvas), Some(view)) => {
                view.settings
                    .pixel_coordinate(canvas.frame.size(), x, y)
            }
            _ => Err(Error::InvalidState(
                "renderer is not configured".to_string(),
            )),
        }
    }

    pub fn settings(&self) -> Option<&RenderSettings> {
        self.view.as_ref().map(|v| &v.settings)
    }

    /// Current chunk size of each cell, row-major.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.view
            .as_ref()
            .map(|v| v.chunks.iter().map(ChunkState::size).collect())
            .unwrap_or_default()
    }

    pub fn is_settled(&self) -> bool {
        self.view.as_ref().map_or(false, |v| v.settled)
    }

    /// Completed sweeps over the whole grid since the last reset.
    pub fn sweeps(&self) -> usize {
        self.view.as_ref().map_or(0, |v| v.sweeps)
    }

    /// The frame as it stands.
    pub fn snapshot(&self) -> Option<RgbImage> {
        self.canvas.as_ref().map(|c| c.frame.snapshot())
    }
}
