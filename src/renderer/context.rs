//! Graphics Context
//!
//! The [`GraphicsContext`] owns the one device handle bound to a drawing
//! surface. Components never store a device of their own; they borrow it
//! from the context for the duration of a call.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::errors::Result;
use crate::renderer::device::GraphicsDevice;
use crate::renderer::headless::HeadlessDevice;
use crate::renderer::settings::WgpuSettings;
use crate::renderer::wgpu_device::WgpuDevice;

pub struct GraphicsContext {
    device: Box<dyn GraphicsDevice>,
}

impl GraphicsContext {
    /// Binds a context to an already created device.
    #[must_use]
    pub fn new(device: Box<dyn GraphicsDevice>) -> Self {
        let (width, height) = device.size();
        log::info!("Graphics context initialized ({width}x{height})");
        Self { device }
    }

    /// Creates a wgpu device presenting to `window`.
    pub fn for_window<W>(
        window: W,
        width: u32,
        height: u32,
        settings: &WgpuSettings,
        transparent: bool,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let device = pollster::block_on(WgpuDevice::new(window, width, height, settings, transparent))?;
        Ok(Self::new(Box::new(device)))
    }

    /// Creates a context over a [`HeadlessDevice`].
    #[must_use]
    pub fn headless(width: u32, height: u32) -> Self {
        Self::new(Box::new(HeadlessDevice::new(width, height)))
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// The device as its concrete backend type, if it is one.
    #[must_use]
    pub fn backend<T: GraphicsDevice>(&self) -> Option<&T> {
        self.device.as_ref().downcast_ref::<T>()
    }

    pub fn backend_mut<T: GraphicsDevice>(&mut self) -> Option<&mut T> {
        self.device.as_mut().downcast_mut::<T>()
    }

    /// Returns the current surface dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.device.size()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.device.resize_surface(width, height);
    }
}
