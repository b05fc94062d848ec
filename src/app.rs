use crate::experiment::Experiment;
use anyhow::{anyhow, Result};
use pixels::{Pixels, SurfaceTexture};
use std::path::PathBuf;
use std::sync::Arc;
use study_render::SkiaSurface;
use study_timing::HighPrecisionTimer;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

/// Fullscreen host window presenting the experiment timeline
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    experiment: Experiment,
    surface: SkiaSurface,
    timer: HighPrecisionTimer,
    output: PathBuf,
    saved: bool,
}

impl App {
    pub fn new(experiment: Experiment, surface: SkiaSurface, output: PathBuf) -> Self {
        Self {
            window: None,
            pixels: None,
            experiment,
            surface,
            timer: HighPrecisionTimer::new(),
            output,
            saved: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting experiment; press ESC to abort"
        );
        event_loop.run_app(&mut self)?;
        if !self.saved {
            self.save();
        }
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;
        let refresh_hz = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("Study items")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz,
            "display configured"
        );

        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, texture)?);
        self.surface.resize(size.width, size.height)?;

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        self.experiment.poll(&mut self.timer, &mut self.surface)?;

        let Some(pixels) = self.pixels.as_mut() else {
            return Ok(());
        };
        if self.surface.is_dirty() {
            let canvas = self.surface.compose();
            let frame = pixels.frame_mut();
            if frame.len() == canvas.data().len() {
                frame.copy_from_slice(canvas.data());
            } else {
                warn!("canvas and frame buffer sizes differ; frame skipped");
            }
        }
        pixels.render()?;
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = self.pixels.as_mut() {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                error!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                error!(error = %e, "failed to resize buffer");
            }
        }
        if let Err(e) = self.surface.resize(size.width, size.height) {
            error!(error = %e, "failed to resize canvas");
        }
        info!(width = size.width, height = size.height, "display resized");
    }

    fn save(&mut self) {
        self.saved = true;
        if let Err(e) = self.experiment.save_results(&self.output) {
            error!(error = %format!("{e:#}"), "could not save results");
        }
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop) {
        if !self.experiment.is_complete() {
            self.experiment.abort(&mut self.surface);
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        info!(
            trials = self.experiment.results().len(),
            "experiment ended"
        );
        if !self.saved {
            self.save();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %format!("{e:#}"), "failed to create window");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.finish(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    error!(error = %format!("{e:#}"), "experiment failed");
                    self.finish(event_loop);
                    return;
                }
                if self.experiment.is_complete() {
                    self.finish(event_loop);
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    warn!("aborted by keyboard");
                    self.finish(event_loop);
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}
