use anyhow::{Context, Result};
use ash::vk;

use crate::device::Teardown;

/// How many frames the host may record ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Synchronization objects of one frame-in-flight slot.
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    /// Created signalled so the first wait returns immediately.
    pub in_flight: vk::Fence,
}

/// Cycles over the frame-in-flight slots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    current: usize,
}

impl FrameCursor {
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % FRAMES_IN_FLIGHT;
    }
}

/// For each swapchain image, the fence of the last submission that rendered
/// into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFenceTable {
    owners: Vec<Option<vk::Fence>>,
}

impl ImageFenceTable {
    pub fn new(image_count: usize) -> Self {
        Self { owners: vec![None; image_count] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    #[inline]
    pub fn owner(&self, image: usize) -> Option<vk::Fence> {
        self.owners[image]
    }

    /// Makes `fence` the owner of `image`, returning the previous owner if it
    /// was a different fence that must be waited on first.
    pub fn claim(&mut self, image: usize, fence: vk::Fence) -> Option<vk::Fence> {
        let previous = self.owners[image].replace(fence);
        previous.filter(|&f| f != fence)
    }
}

/// Per-slot semaphores and fences plus the image ownership table.
pub struct FrameSync {
    pub slots: [FrameSlot; FRAMES_IN_FLIGHT],
    pub images: ImageFenceTable,
    pub cursor: FrameCursor,
}

impl FrameSync {
    pub fn new(device: &ash::Device, image_count: usize, teardown: &mut Teardown) -> Result<Self> {
        let mut slots = [FrameSlot {
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
        }; FRAMES_IN_FLIGHT];

        for slot in &mut slots {
            slot.image_available = create_semaphore(device, teardown)?;
            slot.render_finished = create_semaphore(device, teardown)?;
            slot.in_flight = create_fence(device, teardown)?;
        }
        log::debug!("created {FRAMES_IN_FLIGHT} frame slots for {image_count} images");

        Ok(Self {
            slots,
            images: ImageFenceTable::new(image_count),
            cursor: FrameCursor::default(),
        })
    }

    #[inline]
    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.cursor.current()]
    }
}

fn create_semaphore(device: &ash::Device, teardown: &mut Teardown) -> Result<vk::Semaphore> {
    let semaphore = unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
        .context("failed to create semaphore")?;
    let device = device.clone();
    teardown.push("semaphore", move || unsafe { device.destroy_semaphore(semaphore, None) });
    Ok(semaphore)
}

fn create_fence(device: &ash::Device, teardown: &mut Teardown) -> Result<vk::Fence> {
    let info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
    let fence = unsafe { device.create_fence(&info, None) }.context("failed to create fence")?;
    let device = device.clone();
    teardown.push("fence", move || unsafe { device.destroy_fence(fence, None) });
    Ok(fence)
}
