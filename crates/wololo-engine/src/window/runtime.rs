use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, InitCtx};
use crate::device::RendererConfig;
use crate::render::Renderer;
use crate::time::FixedStep;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Fixed logical tick rate passed to [`App::update`].
    pub updates_per_sec: f64,
}

impl RuntimeConfig {
    pub fn init_ctx(&self) -> InitCtx {
        InitCtx {
            width: self.width,
            height: self.height,
            title: self.title.clone(),
            target_frame_time_sec: 1.0 / self.updates_per_sec,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "wololo".to_string(),
            width: 600,
            height: 450,
            updates_per_sec: 60.0,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens a non-resizable window, builds the renderer on it and runs the
    /// loop until the window is closed or something fails.
    ///
    /// Per displayed frame, [`App::update`] runs once for every whole tick
    /// elapsed, then one frame is drawn. The first error from `init` or
    /// `draw_frame` stops the loop and is returned.
    pub fn run<A>(config: RuntimeConfig, renderer: RendererConfig, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        anyhow::ensure!(
            config.updates_per_sec.is_finite() && config.updates_per_sec > 0.0,
            "updates_per_sec must be positive, got {}",
            config.updates_per_sec
        );

        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, renderer, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FixedStep,

    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: Renderer<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    renderer_config: RendererConfig,
    app: A,

    entry: Option<WindowEntry>,
    initialized: bool,
    error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, renderer_config: RendererConfig, app: A) -> Self {
        Self {
            config,
            renderer_config,
            app,
            entry: None,
            initialized: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let renderer_config = self.renderer_config.clone();
        let mut entry = WindowEntryTryBuilder {
            clock: FixedStep::new(self.config.updates_per_sec),
            window,
            renderer_builder: |w| Renderer::with_config(w, renderer_config),
        }
        .try_build()
        .context("renderer initialization failed")?;

        let ctx = self.config.init_ctx();
        log::info!(
            "initializing '{}' {{w={}, h={}}} @ {:.4} s/tick",
            ctx.title,
            ctx.width,
            ctx.height,
            ctx.target_frame_time_sec
        );

        let app = &mut self.app;
        entry
            .with_renderer_mut(|renderer| app.init(&ctx, renderer))
            .context("application init failed")?;
        self.initialized = true;

        // Init time does not count towards the first frame's ticks.
        entry.with_clock_mut(|clock| clock.reset(std::time::Instant::now()));
        entry.with_window(|w| w.request_redraw());

        self.entry = Some(entry);
        Ok(())
    }

    fn frame(&mut self) -> Result<()> {
        let (app, entry) = (&mut self.app, &mut self.entry);
        let Some(entry) = entry else {
            return Ok(());
        };

        entry.with_mut(|fields| {
            let ticks = fields.clock.advance();
            let dt_sec = fields.clock.step().as_secs_f64();
            for _ in 0..ticks {
                app.update(dt_sec);
            }

            fields.window.pre_present_notify();
            fields.renderer.draw_frame()
        })
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.error.is_some() {
            return;
        }

        if let Err(e) = self.create_entry(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    self.fail(event_loop, e.context("frame failed"));
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.initialized {
            self.app.quit();
            self.initialized = false;
        }
        // Renderer before window.
        self.entry = None;
    }
}
