// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The device: the scope that pipelines and their bindings live in.

A [`Device`] owns the [`GlobalResourceRegistry`] its binding lists share and the
[`ShaderReflector`] they reflect with.  There is no process-wide registry; two devices never see
each other's global resources.
*/

use std::sync::Arc;

use crate::bindings::binding_list::{BindingList, PipelineStateFlags};
use crate::bindings::global_registry::GlobalResourceRegistry;
use crate::object::Shared;
use crate::pipeline::{
    ComputePipeline, ComputePipelineState, GraphicsPipeline, GraphicsPipelineState,
    GraphicsShaders, ShaderBlob,
};
use crate::reflection::ShaderReflector;

#[derive(Debug)]
pub struct Device {
    registry: Arc<GlobalResourceRegistry>,
    reflector: Arc<dyn ShaderReflector>,
}

impl Device {
    pub fn new(reflector: Arc<dyn ShaderReflector>) -> Self {
        logwise::info_sync!("device created");
        Device {
            registry: Arc::new(GlobalResourceRegistry::new()),
            reflector,
        }
    }

    /// Resources set here reach every pipeline state created from this device.
    pub fn registry(&self) -> &Arc<GlobalResourceRegistry> {
        &self.registry
    }

    pub fn reflector(&self) -> &Arc<dyn ShaderReflector> {
        &self.reflector
    }

    pub fn create_graphics_pipeline(
        &self,
        label: &str,
        shaders: GraphicsShaders,
    ) -> Shared<GraphicsPipeline> {
        Shared::new(GraphicsPipeline::new(label, shaders))
    }

    pub fn create_compute_pipeline(
        &self,
        label: &str,
        shader: Option<Shared<ShaderBlob>>,
    ) -> Shared<ComputePipeline> {
        Shared::new(ComputePipeline::new(label, shader))
    }

    /**
    Creates a state with its own bindings for `pipeline`.

    The state keeps the pipeline alive and follows its recompiles.
    */
    pub fn create_graphics_pipeline_state(
        &self,
        label: &str,
        pipeline: &Shared<GraphicsPipeline>,
        flags: PipelineStateFlags,
    ) -> Shared<GraphicsPipelineState> {
        let bindings = BindingList::for_graphics(
            pipeline.clone(),
            flags,
            self.registry.clone(),
            self.reflector.clone(),
        );
        Shared::new(GraphicsPipelineState::new(label, bindings))
    }

    pub fn create_compute_pipeline_state(
        &self,
        label: &str,
        pipeline: &Shared<ComputePipeline>,
        flags: PipelineStateFlags,
    ) -> Shared<ComputePipelineState> {
        let bindings = BindingList::for_compute(
            pipeline.clone(),
            flags,
            self.registry.clone(),
            self.reflector.clone(),
        );
        Shared::new(ComputePipelineState::new(label, bindings))
    }
}
