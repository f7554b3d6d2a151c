use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::WgpuDevice;
use crate::gradient::{FrameRequest, FrameScheduler, Gradient};
use crate::runtime::{SystemTimeSource, TimeSource};
use crate::types::RendererConfig;

/// Bookkeeping for frames requested through the window.
///
/// winit cannot retract a redraw once requested, so cancellation is recorded
/// here and the next redraw is treated as an expose instead of an animation
/// frame.
#[derive(Debug, Default)]
struct FrameQueue {
    issued: u64,
    pending: Option<FrameRequest>,
}

impl FrameQueue {
    fn request(&mut self) -> FrameRequest {
        let request = FrameRequest(self.issued);
        self.issued += 1;
        self.pending = Some(request);
        request
    }

    fn cancel(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    /// Whether the redraw being handled delivers a requested frame.
    fn take_due(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

/// [`FrameScheduler`] that turns frame requests into window redraws.
struct RedrawScheduler {
    window: Arc<Window>,
    queue: FrameQueue,
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let request = self.queue.request();
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.queue.cancel(request);
    }
}

/// Window plus the gradient painted into it.
///
/// `gradient` is `None` when construction failed or after teardown; the
/// window then stays up without a background.
struct WindowState {
    window: Arc<Window>,
    gradient: Option<Gradient<WgpuDevice>>,
    scheduler: RedrawScheduler,
    clock: SystemTimeSource,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Self {
        let mut scheduler = RedrawScheduler {
            window: window.clone(),
            queue: FrameQueue::default(),
        };
        let gradient = match build_gradient(window.clone(), config, &mut scheduler) {
            Ok(gradient) => Some(gradient),
            Err(err) => {
                error!("failed to initialise gradient: {err:#}");
                None
            }
        };
        Self {
            window,
            gradient,
            scheduler,
            clock: SystemTimeSource::new(),
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(gradient) = self.gradient.as_mut() else {
            return;
        };
        if let Err(err) = gradient.resize(new_size.width, new_size.height) {
            warn!(error = %err, "gradient resize failed");
        }
        if !gradient.is_playing() {
            self.window.request_redraw();
        }
    }

    fn toggle_playback(&mut self) {
        let Some(gradient) = self.gradient.as_mut() else {
            return;
        };
        if gradient.is_playing() {
            gradient.stop(&mut self.scheduler);
            info!(time_ms = gradient.time(), "animation paused");
        } else {
            gradient.start(&mut self.scheduler);
            info!(time_ms = gradient.time(), "animation resumed");
        }
    }

    /// Advances the animation when the redraw was requested by it; otherwise
    /// re-renders the current frame.
    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(gradient) = self.gradient.as_mut() else {
            return Ok(());
        };
        if self.scheduler.queue.take_due() {
            let timestamp = self.clock.timestamp();
            gradient.animate(timestamp, &mut self.scheduler)
        } else {
            gradient.redraw()
        }
    }

    fn reconfigure(&mut self) {
        if let Some(gradient) = self.gradient.as_mut() {
            gradient.device_mut().reconfigure();
        }
    }

    fn teardown(&mut self) {
        if let Some(gradient) = self.gradient.take() {
            drop(gradient.teardown(&mut self.scheduler));
        }
    }
}

fn build_gradient(
    window: Arc<Window>,
    config: &RendererConfig,
    scheduler: &mut RedrawScheduler,
) -> Result<Gradient<WgpuDevice>> {
    let size = window.inner_size();
    let device = WgpuDevice::new(window, size, config.antialiasing)
        .context("failed to open a drawing surface")?;
    debug!(
        sample_count = device.sample_count(),
        width = device.surface_size().width,
        height = device.surface_size().height,
        "drawing surface ready"
    );

    let settings = &config.settings;
    let mut gradient = Gradient::new(device, settings.colors.as_slice(), (size.width, size.height))
        .context("failed to build gradient")?;
    gradient
        .apply(settings)
        .context("failed to apply gradient settings")?;
    if settings.playing {
        gradient.start(scheduler);
    }
    Ok(gradient)
}

fn is_named(event: &KeyEvent, key: NamedKey) -> bool {
    matches!(&event.logical_key, Key::Named(named) if *named == key)
}

/// Opens the window and drives the winit event loop until it closes.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);
    info!(
        title = %config.title,
        width = window_size.width,
        height = window_size.height,
        "window opened"
    );

    let mut state = WindowState::new(window, config);
    // First paint; while paused this is the only frame until an expose.
    state.window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        state.teardown();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed || event.repeat {
                            return;
                        }
                        if is_named(&event, NamedKey::Escape) {
                            state.teardown();
                            elwt.exit();
                        } else if is_named(&event, NamedKey::Space)
                            || matches!(event.logical_key, Key::Character(ref value) if value.as_str() == " ")
                        {
                            state.toggle_playback();
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::RedrawRequested => match state.render_frame() {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.reconfigure();
                            state.window.request_redraw();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            state.teardown();
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!("surface error: {other:?}; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::LoopExiting => {
                state.teardown();
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
