//! Headless backend.
//!
//! Performs full object bookkeeping, shader compilation, linking and draw
//! validation without touching a GPU, and records frame-level commands.
//! Used by the test suite and for offscreen validation of a scene.
//!
//! Only the latest frame is kept: a `Clear` drops the commands of frames
//! already presented. [`HeadlessDevice::keep_history`] keeps all of them.

use std::any::Any;

use crate::errors::Result;
use crate::renderer::device::{
    BufferId, BufferTarget, GraphicsDevice, ProgramId, RenderState, Viewport,
};
use crate::renderer::objects::{DeviceLimits, ObjectTable};

/// A frame-level command recorded by [`HeadlessDevice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetRenderState(RenderState),
    SetViewport(Viewport),
    Clear(wgpu::Color),
    DrawArrays {
        program: ProgramId,
        count: u32,
    },
    DrawElements {
        program: ProgramId,
        count: u32,
        format: wgpu::IndexFormat,
    },
    Present,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    objects: ObjectTable,
    width: u32,
    height: u32,
    commands: Vec<Command>,
    keep_history: bool,
    frames: u64,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            objects: ObjectTable::new(),
            width,
            height,
            commands: Vec::new(),
            keep_history: false,
            frames: 0,
        }
    }

    /// A device with the given shader capabilities and uniform limit.
    #[must_use]
    pub fn with_limits(width: u32, height: u32, limits: DeviceLimits) -> Self {
        Self {
            objects: ObjectTable::with_limits(limits),
            ..Self::new(width, height)
        }
    }

    /// Keeps the commands of every frame instead of only the latest.
    pub fn keep_history(&mut self, keep: bool) {
        self.keep_history = keep;
    }

    /// The latest frame's commands and anything recorded after it. With
    /// history kept, everything since creation (or the last
    /// [`take_commands`](Self::take_commands)).
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// The draw commands among [`commands`](Self::commands).
    pub fn draw_calls(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawArrays { .. } | Command::DrawElements { .. }))
    }

    /// Number of presented frames.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId {
        self.objects.insert_buffer(target, contents.len() as u64)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> bool {
        self.objects.remove_buffer(buffer)
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.commands.push(Command::SetRenderState(state));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    fn clear(&mut self, color: wgpu::Color) {
        if !self.keep_history
            && let Some(last) = self.commands.iter().rposition(|c| *c == Command::Present)
        {
            self.commands.drain(..=last);
        }
        self.commands.push(Command::Clear(color));
    }

    fn draw_arrays(&mut self, count: u32) -> Result<()> {
        let call = self.objects.draw_call(count, None)?;
        self.commands.push(Command::DrawArrays {
            program: call.program,
            count,
        });
        Ok(())
    }

    fn draw_elements(&mut self, count: u32, format: wgpu::IndexFormat) -> Result<()> {
        let call = self.objects.draw_call(count, Some(format))?;
        self.commands.push(Command::DrawElements {
            program: call.program,
            count,
            format,
        });
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn present(&mut self) -> Result<()> {
        self.commands.push(Command::Present);
        self.frames += 1;
        Ok(())
    }
}
