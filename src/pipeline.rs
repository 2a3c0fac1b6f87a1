// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Pipelines and pipeline states.

A pipeline owns the compiled binary for each of its stages.  Recompiling swaps those binaries
and fires the pipeline's `on_compile` event, which tells every binding list built from it to
rebuild before its next use.

A pipeline *state* pairs a pipeline with a [`BindingList`].  Many states may share a pipeline;
each keeps its own bindings.
*/

use std::fmt::Debug;

use wasm_safe_mutex::Mutex;

use crate::bindings::binding_list::BindingList;
use crate::bindings::parameter::ShaderStage;
use crate::event_list::EventList;
use crate::imp::BindContext;
use crate::object::{GpuObject, Shared};

/// A compiled shader binary.  The contents are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlob {
    identifier: String,
    bytes: Box<[u8]>,
}

impl ShaderBlob {
    pub fn new(identifier: &str, bytes: impl Into<Vec<u8>>) -> Self {
        ShaderBlob {
            identifier: identifier.to_string(),
            bytes: bytes.into().into_boxed_slice(),
        }
    }

    /// Names the shader, e.g. its entry point or cache key.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl GpuObject for ShaderBlob {
    fn debug_label(&self) -> &str {
        &self.identifier
    }
}

/// Binaries for the five graphics stages.  Any of them may be absent.
#[derive(Debug, Clone, Default)]
pub struct GraphicsShaders {
    pub vertex: Option<Shared<ShaderBlob>>,
    pub hull: Option<Shared<ShaderBlob>>,
    pub domain: Option<Shared<ShaderBlob>>,
    pub geometry: Option<Shared<ShaderBlob>>,
    pub pixel: Option<Shared<ShaderBlob>>,
}

impl GraphicsShaders {
    fn stage(&self, stage: ShaderStage) -> Option<&Shared<ShaderBlob>> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_ref(),
            ShaderStage::Hull => self.hull.as_ref(),
            ShaderStage::Domain => self.domain.as_ref(),
            ShaderStage::Geometry => self.geometry.as_ref(),
            ShaderStage::Pixel => self.pixel.as_ref(),
            ShaderStage::Compute => None,
        }
    }
}

pub struct GraphicsPipeline {
    label: String,
    shaders: Mutex<GraphicsShaders>,
    on_compile: EventList<()>,
}

impl GraphicsPipeline {
    pub fn new(label: &str, shaders: GraphicsShaders) -> Self {
        GraphicsPipeline {
            label: label.to_string(),
            shaders: Mutex::new(shaders),
            on_compile: EventList::new(),
        }
    }

    /// The current binary for `stage`.
    pub fn stage_blob(&self, stage: ShaderStage) -> Option<Shared<ShaderBlob>> {
        self.shaders.lock_sync().stage(stage).cloned()
    }

    /// Replaces every stage binary and notifies dependent binding lists.
    pub fn recompile(&self, shaders: GraphicsShaders) {
        *self.shaders.lock_sync() = shaders;
        logwise::info_sync!(
            "graphics pipeline {label} recompiled",
            label = logwise::privacy::LogIt(&self.label)
        );
        self.on_compile.invoke(&());
    }

    pub fn on_compile(&self) -> &EventList<()> {
        &self.on_compile
    }
}

impl Debug for GraphicsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsPipeline")
            .field("label", &self.label)
            .field("on_compile", &self.on_compile)
            .finish_non_exhaustive()
    }
}

impl GpuObject for GraphicsPipeline {
    fn debug_label(&self) -> &str {
        &self.label
    }
}

pub struct ComputePipeline {
    label: String,
    shader: Mutex<Option<Shared<ShaderBlob>>>,
    on_compile: EventList<()>,
}

impl ComputePipeline {
    pub fn new(label: &str, shader: Option<Shared<ShaderBlob>>) -> Self {
        ComputePipeline {
            label: label.to_string(),
            shader: Mutex::new(shader),
            on_compile: EventList::new(),
        }
    }

    pub fn stage_blob(&self, stage: ShaderStage) -> Option<Shared<ShaderBlob>> {
        match stage {
            ShaderStage::Compute => self.shader.lock_sync().clone(),
            _ => None,
        }
    }

    pub fn recompile(&self, shader: Option<Shared<ShaderBlob>>) {
        *self.shader.lock_sync() = shader;
        logwise::info_sync!(
            "compute pipeline {label} recompiled",
            label = logwise::privacy::LogIt(&self.label)
        );
        self.on_compile.invoke(&());
    }

    pub fn on_compile(&self) -> &EventList<()> {
        &self.on_compile
    }
}

impl Debug for ComputePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("label", &self.label)
            .field("on_compile", &self.on_compile)
            .finish_non_exhaustive()
    }
}

impl GpuObject for ComputePipeline {
    fn debug_label(&self) -> &str {
        &self.label
    }
}

/// The pipeline a binding list reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineRef {
    Graphics(Shared<GraphicsPipeline>),
    Compute(Shared<ComputePipeline>),
}

impl PipelineRef {
    /// Stages in binding order.
    pub fn stages(&self) -> &'static [ShaderStage] {
        match self {
            PipelineRef::Graphics(_) => &ShaderStage::GRAPHICS,
            PipelineRef::Compute(_) => &ShaderStage::COMPUTE,
        }
    }

    pub fn stage_blob(&self, stage: ShaderStage) -> Option<Shared<ShaderBlob>> {
        match self {
            PipelineRef::Graphics(p) => p.stage_blob(stage),
            PipelineRef::Compute(p) => p.stage_blob(stage),
        }
    }

    pub fn on_compile(&self) -> &EventList<()> {
        match self {
            PipelineRef::Graphics(p) => p.on_compile(),
            PipelineRef::Compute(p) => p.on_compile(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineRef::Graphics(_) => "graphics",
            PipelineRef::Compute(_) => "compute",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PipelineRef::Graphics(p) => p.debug_label(),
            PipelineRef::Compute(p) => p.debug_label(),
        }
    }

    /// Number of live handles to the underlying pipeline.
    pub fn ref_count(&self) -> usize {
        match self {
            PipelineRef::Graphics(p) => p.ref_count(),
            PipelineRef::Compute(p) => p.ref_count(),
        }
    }
}

/**
A graphics pipeline together with its resource bindings.

The bindings sit behind a lock only because the state is shared-owned; a state driven from one
thread at a time never contends on it.
*/
pub struct GraphicsPipelineState {
    label: String,
    bindings: Mutex<BindingList>,
}

/// A compute pipeline together with its resource bindings.
pub struct ComputePipelineState {
    label: String,
    bindings: Mutex<BindingList>,
}

macro_rules! pipeline_state_impl {
    ($ty:ident) => {
        impl $ty {
            pub fn new(label: &str, bindings: BindingList) -> Self {
                $ty {
                    label: label.to_string(),
                    bindings: Mutex::new(bindings),
                }
            }

            /// Binds every occupied slot for a draw or dispatch.
            pub fn set_state<C: BindContext + ?Sized>(&self, ctx: &mut C) {
                self.bindings.lock_sync().bind(ctx);
            }

            /// Detaches everything [`Self::set_state`] bound.
            pub fn unset_state<C: BindContext + ?Sized>(&self, ctx: &mut C) {
                self.bindings.lock_sync().unbind(ctx);
            }

            /// Pushes dirty constant-buffer variables.
            pub fn upload_state<C: BindContext + ?Sized>(&self, ctx: &mut C) {
                self.bindings.lock_sync().upload_state(ctx);
            }

            /// Runs `f` with exclusive access to the bindings.
            pub fn with_bindings<R>(&self, f: impl FnOnce(&mut BindingList) -> R) -> R {
                let mut bindings = self.bindings.lock_sync();
                f(&mut *bindings)
            }
        }

        impl Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("label", &self.label)
                    .finish_non_exhaustive()
            }
        }

        impl GpuObject for $ty {
            fn debug_label(&self) -> &str {
                &self.label
            }
        }
    };
}

pipeline_state_impl!(GraphicsPipelineState);
pipeline_state_impl!(ComputePipelineState);
