use anyhow::Result;

use wololo_engine::coords::{Quaternion, Vec3};
use wololo_engine::core::{App, InitCtx};
use wololo_engine::device::RendererConfig;
use wololo_engine::logging::{init_logging, LoggingConfig};
use wololo_engine::render::Renderer;
use wololo_engine::scene::NodeArgument;
use wololo_engine::window::{Runtime, RuntimeConfig};

/// Two unioned spheres with a half-space carved out of them.
#[derive(Default)]
struct Test1 {
    elapsed_sec: f64,
    ticks: u64,
}

impl App for Test1 {
    fn init(&mut self, ctx: &InitCtx, renderer: &mut Renderer<'_>) -> Result<()> {
        log::info!(
            "Initializing '{}' {{w={}, h={}}} @ {} s/update",
            ctx.title,
            ctx.width,
            ctx.height,
            ctx.target_frame_time_sec
        );

        let s1 = renderer.try_add_sphere(1.0)?;
        let s2 = renderer.try_add_sphere(1.0)?;
        let blob = renderer.try_add_union(
            NodeArgument::new(s1).with_offset(Vec3::new(-0.6, 0.0, 0.0)),
            NodeArgument::new(s2).with_offset(Vec3::new(0.6, 0.0, 0.0)),
        )?;

        let cut = renderer.try_add_infinite_plane(Vec3::new(0.0, -1.0, 0.0))?;
        let tilt = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 0.1);
        let carved = renderer.try_add_difference(
            NodeArgument::new(blob),
            NodeArgument::new(cut)
                .with_orientation(tilt)
                .with_offset(Vec3::new(0.0, 0.4, 0.0)),
        )?;

        let scene = renderer.scene();
        let roots: Vec<_> = scene.roots().collect();
        log::info!(
            "scene: {}/{} nodes, roots {:?} (expected [{carved}])",
            scene.len(),
            scene.capacity(),
            roots
        );
        log::info!(
            "swapchain: {} images {:?}, {}x{}",
            renderer.swapchain_image_count(),
            renderer.surface_format().format,
            renderer.extent().width,
            renderer.extent().height
        );
        Ok(())
    }

    fn update(&mut self, dt_sec: f64) {
        self.elapsed_sec += dt_sec;
        self.ticks += 1;
        if self.ticks % 600 == 0 {
            log::debug!("{} updates, {:.1}s simulated", self.ticks, self.elapsed_sec);
        }
    }

    fn quit(&mut self) {
        log::info!("Quitting after {} updates ({:.2}s)", self.ticks, self.elapsed_sec);
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "Test 1".to_string(),
        width: 600,
        height: 450,
        updates_per_sec: 60.0,
    };
    let renderer = RendererConfig::new("Test 1", 8);

    Runtime::run(runtime, renderer, Test1::default())
}
