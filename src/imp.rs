// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The native backend seam.

The binding engine never talks to a driver directly.  Everything it needs is five bind verbs,
each addressed by stage and taking a start slot plus a contiguous handle array; the count is
the slice length.  A real backend forwards these to its immediate context.  Two backends ship
with the crate: [`nop::NopContext`] discards every call, and [`recording::RecordingContext`]
keeps them for inspection.
*/

use crate::bindings::handle::RawHandle;
use crate::bindings::parameter::ShaderStage;

pub mod nop;
pub mod recording;

/**
Native bind verbs for one immediate context.

Calls for one context arrive from one thread at a time.  A `None` entry detaches the slot.
*/
pub trait BindContext {
    fn set_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    );

    fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    );

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, handles: &[Option<RawHandle>]);

    /**
    Binds unordered-access views.

    `initial_counts` runs parallel to `handles`.  `u32::MAX` keeps the view's current
    append/consume counter.
    */
    fn set_unordered_access_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
        initial_counts: &[u32],
    );

    /// Replaces the contents of the constant buffer bound at `slot`.
    fn update_constant_buffer(&mut self, stage: ShaderStage, slot: u32, bytes: &[u8]);
}

impl<C: BindContext + ?Sized> BindContext for &mut C {
    fn set_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    ) {
        (**self).set_constant_buffers(stage, start_slot, handles)
    }

    fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    ) {
        (**self).set_shader_resources(stage, start_slot, handles)
    }

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, handles: &[Option<RawHandle>]) {
        (**self).set_samplers(stage, start_slot, handles)
    }

    fn set_unordered_access_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
        initial_counts: &[u32],
    ) {
        (**self).set_unordered_access_views(stage, start_slot, handles, initial_counts)
    }

    fn update_constant_buffer(&mut self, stage: ShaderStage, slot: u32, bytes: &[u8]) {
        (**self).update_constant_buffer(stage, slot, bytes)
    }
}
