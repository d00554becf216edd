use std::marker::PhantomData;
use std::time::Instant;

use anyhow::{Context, Result};
use ash::vk;
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use crate::coords::{Scalar, Vec3};
use crate::device::{create_surface, DeviceContext, InstanceContext, RendererConfig, Swapchain, Teardown};
use crate::scene::{Arena, ArenaError, NodeArgument, NodeId};

use super::{FrameResources, FrameSync, FrameUniforms, InstanceGuard, Pipeline};

/// CSG renderer bound to one window.
///
/// Owns the scene arena and every Vulkan object needed to draw it. Only one
/// renderer may exist per process at a time.
///
/// Lifetimes:
/// - `'w` is the window borrow; the surface must not outlive the window.
pub struct Renderer<'w> {
    scene: Arena,

    dev: DeviceContext,
    swapchain: Swapchain,
    frames: FrameResources,
    sync: FrameSync,
    started: Instant,

    teardown: Teardown,
    // Released after `teardown` has run.
    _guard: InstanceGuard,
    _window: PhantomData<&'w Window>,
}

impl<'w> Renderer<'w> {
    /// Creates a renderer with default settings and an arena of `max_node_count` nodes.
    pub fn new(window: &'w Window, name: &str, max_node_count: usize) -> Result<Self> {
        Self::with_config(window, RendererConfig::new(name, max_node_count))
    }

    /// Builds the whole GPU context.
    ///
    /// On failure every object created so far is destroyed in reverse order
    /// before the error is returned.
    pub fn with_config(window: &'w Window, config: RendererConfig) -> Result<Self> {
        let guard = InstanceGuard::acquire()?;

        let scene = Arena::new(config.max_node_count, &config.app_name)
            .context("failed to create the scene arena")?;

        let display = window
            .display_handle()
            .context("window has no display handle")?
            .as_raw();
        let window_handle = window
            .window_handle()
            .context("window has no native handle")?
            .as_raw();
        let size = window.inner_size();

        let mut teardown = Teardown::new();

        let instance = InstanceContext::new(&config, display, &mut teardown)?;
        let surface = create_surface(&instance, display, window_handle, &mut teardown)?;
        let dev = DeviceContext::new(&instance, surface, &config, &mut teardown)?;
        let swapchain = Swapchain::new(
            &instance,
            &dev,
            surface,
            (size.width, size.height),
            &mut teardown,
        )?;
        let pipeline = Pipeline::new(
            &dev.device,
            swapchain.format.format,
            swapchain.extent,
            &config,
            &mut teardown,
        )?;
        let frames = FrameResources::new(&dev, &swapchain, &pipeline, &mut teardown)?;
        let sync = FrameSync::new(&dev.device, swapchain.image_count(), &mut teardown)?;

        log::info!(
            "renderer \"{}\" ready on {}: {} objects, arena capacity {}",
            config.app_name,
            dev.device_name,
            teardown.len(),
            scene.capacity()
        );

        Ok(Self {
            scene,
            dev,
            swapchain,
            frames,
            sync,
            started: Instant::now(),
            teardown,
            _guard: guard,
            _window: PhantomData,
        })
    }

    /// Renders and presents one frame.
    ///
    /// Blocks on the current slot's fence, on the previous owner of the
    /// acquired image, and on the present queue going idle. Any error is
    /// unrecoverable.
    pub fn draw_frame(&mut self) -> Result<()> {
        let device = &self.dev.device;
        let slot = *self.sync.current();

        unsafe { device.wait_for_fences(&[slot.in_flight], true, u64::MAX) }
            .context("failed to wait for the in-flight fence")?;

        let (image_index, suboptimal) = unsafe {
            self.swapchain.loader.acquire_next_image(
                self.swapchain.handle,
                u64::MAX,
                slot.image_available,
                vk::Fence::null(),
            )
        }
        .context("failed to acquire a swapchain image")?;
        if suboptimal {
            log::trace!("swapchain is suboptimal for the surface");
        }
        let image = image_index as usize;

        if let Some(previous) = self.sync.images.claim(image, slot.in_flight) {
            unsafe { device.wait_for_fences(&[previous], true, u64::MAX) }
                .context("failed to wait for the image's previous fence")?;
        }

        let uniforms = FrameUniforms::new(self.started.elapsed().as_secs_f32(), self.swapchain.extent);
        self.frames.write_uniforms(device, image, &uniforms)?;

        let wait_semaphores = [slot.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.frames.command_buffers[image]];
        let signal_semaphores = [slot.render_finished];
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .reset_fences(&[slot.in_flight])
                .context("failed to reset the in-flight fence")?;
            device
                .queue_submit(self.dev.graphics_queue, &[submit], slot.in_flight)
                .context("failed to submit the draw command buffer")?;
        }

        let swapchains = [self.swapchain.handle];
        let image_indices = [image_index];
        let present = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain
                .loader
                .queue_present(self.dev.present_queue, &present)
                .context("failed to present the swapchain image")?;
            // Host and device are serialized here on purpose.
            device
                .queue_wait_idle(self.dev.present_queue)
                .context("failed to wait for the present queue")?;
        }

        self.sync.cursor.advance();
        Ok(())
    }

    /// Frame-in-flight slot used by the next `draw_frame`.
    #[inline]
    pub fn current_frame_index(&self) -> usize {
        self.sync.cursor.current()
    }

    #[inline]
    pub fn swapchain_image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    #[inline]
    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        self.swapchain.format
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.present_mode
    }

    /// Read-only view of the scene.
    #[inline]
    pub fn scene(&self) -> &Arena {
        &self.scene
    }

    // ── scene construction ────────────────────────────────────────────────

    pub fn try_add_sphere(&mut self, radius: Scalar) -> Result<NodeId, ArenaError> {
        self.scene.add_sphere(radius)
    }

    pub fn try_add_infinite_plane(&mut self, outward_normal: Vec3) -> Result<NodeId, ArenaError> {
        self.scene.add_infinite_plane(outward_normal)
    }

    pub fn try_add_union(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.scene.add_union(left, right)
    }

    pub fn try_add_intersection(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.scene.add_intersection(left, right)
    }

    pub fn try_add_difference(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.scene.add_difference(left, right)
    }

    /// `radius` must be positive and finite.
    ///
    /// # Panics
    /// Panics if the arena is full or `radius` is out of range.
    pub fn add_sphere(&mut self, radius: Scalar) -> NodeId {
        fatal(self.try_add_sphere(radius))
    }

    /// # Panics
    /// Panics if the arena is full.
    pub fn add_infinite_plane(&mut self, outward_normal: Vec3) -> NodeId {
        fatal(self.try_add_infinite_plane(outward_normal))
    }

    /// # Panics
    /// Panics if the arena is full or a child does not exist.
    pub fn add_union(&mut self, left: NodeArgument, right: NodeArgument) -> NodeId {
        fatal(self.try_add_union(left, right))
    }

    /// # Panics
    /// Panics if the arena is full or a child does not exist.
    pub fn add_intersection(&mut self, left: NodeArgument, right: NodeArgument) -> NodeId {
        fatal(self.try_add_intersection(left, right))
    }

    /// # Panics
    /// Panics if the arena is full or a child does not exist.
    pub fn add_difference(&mut self, left: NodeArgument, right: NodeArgument) -> NodeId {
        fatal(self.try_add_difference(left, right))
    }

    #[inline]
    pub fn is_root(&self, node: NodeId) -> bool {
        self.scene.is_root(node)
    }
}

impl Drop for Renderer<'_> {
    fn drop(&mut self) {
        if let Err(err) = unsafe { self.dev.device.device_wait_idle() } {
            log::error!("device_wait_idle failed during teardown: {err}");
        }
        self.teardown.run();
        log::info!("renderer destroyed");
    }
}

#[track_caller]
fn fatal(result: Result<NodeId, ArenaError>) -> NodeId {
    match result {
        Ok(node) => node,
        Err(err) => panic!("failed to add scene node: {err}"),
    }
}
