// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A backend that records calls instead of issuing them.

Useful for tests and for capturing the exact call stream a frame produces.
*/

use crate::bindings::handle::RawHandle;
use crate::bindings::parameter::{ParameterCategory, ShaderStage};
use crate::imp::BindContext;

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindCall {
    Bind {
        stage: ShaderStage,
        category: ParameterCategory,
        start_slot: u32,
        handles: Vec<Option<RawHandle>>,
        /// Empty except for unordered-access views.
        initial_counts: Vec<u32>,
    },
    UpdateConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        bytes: Vec<u8>,
    },
}

impl BindCall {
    /// Number of slots a bind call covers.  Zero for constant-buffer updates.
    pub fn width(&self) -> usize {
        match self {
            BindCall::Bind { handles, .. } => handles.len(),
            BindCall::UpdateConstantBuffer { .. } => 0,
        }
    }

    pub fn is_unbind(&self) -> bool {
        match self {
            BindCall::Bind { handles, .. } => handles.iter().all(Option::is_none),
            BindCall::UpdateConstantBuffer { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    calls: Vec<BindCall>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BindCall] {
        &self.calls
    }

    /// Returns the recorded calls and starts over.
    pub fn take(&mut self) -> Vec<BindCall> {
        std::mem::take(&mut self.calls)
    }

    /// Bind calls (not updates) for one category.
    pub fn binds_for(&self, category: ParameterCategory) -> impl Iterator<Item = &BindCall> {
        self.calls.iter().filter(move |c| {
            matches!(c, BindCall::Bind { category: recorded, .. } if *recorded == category)
        })
    }

    fn push_bind(
        &mut self,
        stage: ShaderStage,
        category: ParameterCategory,
        start_slot: u32,
        handles: &[Option<RawHandle>],
        initial_counts: &[u32],
    ) {
        self.calls.push(BindCall::Bind {
            stage,
            category,
            start_slot,
            handles: handles.to_vec(),
            initial_counts: initial_counts.to_vec(),
        });
    }
}

impl BindContext for RecordingContext {
    fn set_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    ) {
        self.push_bind(stage, ParameterCategory::ConstantBuffer, start_slot, handles, &[]);
    }

    fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
    ) {
        self.push_bind(stage, ParameterCategory::ShaderResource, start_slot, handles, &[]);
    }

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, handles: &[Option<RawHandle>]) {
        self.push_bind(stage, ParameterCategory::Sampler, start_slot, handles, &[]);
    }

    fn set_unordered_access_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        handles: &[Option<RawHandle>],
        initial_counts: &[u32],
    ) {
        self.push_bind(
            stage,
            ParameterCategory::UnorderedAccess,
            start_slot,
            handles,
            initial_counts,
        );
    }

    fn update_constant_buffer(&mut self, stage: ShaderStage, slot: u32, bytes: &[u8]) {
        self.calls.push(BindCall::UpdateConstantBuffer {
            stage,
            slot,
            bytes: bytes.to_vec(),
        });
    }
}
