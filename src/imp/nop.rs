// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A backend that does nothing.

use crate::bindings::handle::RawHandle;
use crate::bindings::parameter::ShaderStage;
use crate::imp::BindContext;

/// Discards every bind call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopContext;

impl BindContext for NopContext {
    fn set_constant_buffers(&mut self, _stage: ShaderStage, _start: u32, _h: &[Option<RawHandle>]) {}

    fn set_shader_resources(&mut self, _stage: ShaderStage, _start: u32, _h: &[Option<RawHandle>]) {}

    fn set_samplers(&mut self, _stage: ShaderStage, _start: u32, _h: &[Option<RawHandle>]) {}

    fn set_unordered_access_views(
        &mut self,
        _stage: ShaderStage,
        _start: u32,
        _h: &[Option<RawHandle>],
        _initial_counts: &[u32],
    ) {
    }

    fn update_constant_buffer(&mut self, _stage: ShaderStage, _slot: u32, _bytes: &[u8]) {}
}
