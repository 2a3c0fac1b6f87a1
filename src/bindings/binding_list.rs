// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Name-addressed bindings for one pipeline.

A [`BindingList`] owns one [`DescriptorRange`] per (stage, category) of its pipeline.  Graphics
pipelines have five stages and compute pipelines have one, so every list has either 20 or 4
ranges.  An absent stage, or one whose reflection failed, gets empty ranges, so stage indexing
is uniform and setting a name on that stage finds nothing.

# Names, not slots

Callers bind by name.  `set_srv("shadow_map", h)` writes `h` into every stage that declares
`shadow_map` as a shader-read view, wherever reflection put it.  The stage-qualified forms
restrict the write to one stage.  The `try_` forms report with a `bool` and never fail; the plain
forms return [`BindingError`] when nothing declares the name.

# Outside influences

Two things can change a list without its owner calling it: the device's
[`GlobalResourceRegistry`] broadcasting a named resource, and the pipeline being recompiled.
Both can happen on other threads.  The list subscribes to both, and the callbacks only push a
message into the list's inbox.  The owner drains the inbox at the start of every set, bind,
unbind or enumeration, so the list itself never needs a lock.

Broadcasts are applied conditionally.  A slot that follows the registry takes a change only if
its generation is newer than the last one the slot saw, so broadcasts that arrive out of order
still end on the registry's latest value.  A slot the owner bound locally takes a change only if
it still holds the handle the registry held before the change, so a local binding to something
else survives.  A recompile rebuilds every range from fresh reflection, then reapplies the
registry's current state.  Bindings made locally before the recompile are lost.
*/

use std::sync::Arc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::bindings::descriptor_range::{BindingValue, DescriptorRange, KEEP_COUNTER};
use crate::bindings::error::BindingError;
use crate::bindings::global_registry::{GlobalResourceRegistry, StateChange};
use crate::bindings::handle::RawHandle;
use crate::bindings::parameter::{ParameterCategory, ShaderStage};
use crate::bindings::variables::VariableRange;
use crate::event_list::Subscription;
use crate::imp::BindContext;
use crate::object::Shared;
use crate::pipeline::{ComputePipeline, GraphicsPipeline, PipelineRef, ShaderBlob};
use crate::reflection::{ReflectionError, ShaderReflector};

bitflags! {
    /// Options for building a pipeline state's bindings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStateFlags: u32 {
        /// Also reflect constant-buffer layouts, enabling the variable API.
        const REFLECT_VARIABLES = 1 << 0;
    }
}

/// Messages from other threads.
enum Inbox {
    GlobalStateChanged(StateChange),
    PipelineCompiled,
}

#[derive(Debug)]
struct StageRanges {
    stage: ShaderStage,
    //indexed by ParameterCategory::index
    ranges: [DescriptorRange; 4],
    variables: VariableRange,
}

impl StageRanges {
    fn empty(stage: ShaderStage) -> Self {
        StageRanges {
            stage,
            ranges: ParameterCategory::ALL.map(|c| DescriptorRange::empty(stage, c)),
            variables: VariableRange::empty(stage),
        }
    }

    fn range(&self, category: ParameterCategory) -> &DescriptorRange {
        &self.ranges[category.index()]
    }

    fn range_mut(&mut self, category: ParameterCategory) -> &mut DescriptorRange {
        &mut self.ranges[category.index()]
    }
}

pub struct BindingList {
    //declared first so they are dropped before the pipeline reference
    _registry_subscription: Subscription,
    _compile_subscription: Subscription,
    inbox: flume::Receiver<Inbox>,
    pipeline: PipelineRef,
    flags: PipelineStateFlags,
    registry: Arc<GlobalResourceRegistry>,
    reflector: Arc<dyn ShaderReflector>,
    stages: SmallVec<[StageRanges; 5]>,
    failures: SmallVec<[ShaderStage; 5]>,
}

impl BindingList {
    pub fn for_graphics(
        pipeline: Shared<GraphicsPipeline>,
        flags: PipelineStateFlags,
        registry: Arc<GlobalResourceRegistry>,
        reflector: Arc<dyn ShaderReflector>,
    ) -> Self {
        Self::new(PipelineRef::Graphics(pipeline), flags, registry, reflector)
    }

    pub fn for_compute(
        pipeline: Shared<ComputePipeline>,
        flags: PipelineStateFlags,
        registry: Arc<GlobalResourceRegistry>,
        reflector: Arc<dyn ShaderReflector>,
    ) -> Self {
        Self::new(PipelineRef::Compute(pipeline), flags, registry, reflector)
    }

    /**
    Subscribes to the registry and the pipeline, then builds from the pipeline's current binaries.

    A pipeline that fails reflection on every stage still yields a usable list; every range is
    empty and the failure is logged.  [`Self::stage_failures`] reports which stages failed.
    */
    pub fn new(
        pipeline: PipelineRef,
        flags: PipelineStateFlags,
        registry: Arc<GlobalResourceRegistry>,
        reflector: Arc<dyn ShaderReflector>,
    ) -> Self {
        let (sender, inbox) = flume::unbounded();
        let registry_sender = sender.clone();
        let registry_subscription = registry.subscribe(move |change| {
            //a disconnected inbox means the list is being dropped
            let _ = registry_sender.send(Inbox::GlobalStateChanged(change.clone()));
        });
        let compile_subscription = pipeline.on_compile().subscribe(move |_| {
            let _ = sender.send(Inbox::PipelineCompiled);
        });

        let mut list = BindingList {
            _registry_subscription: registry_subscription,
            _compile_subscription: compile_subscription,
            inbox,
            stages: pipeline
                .stages()
                .iter()
                .map(|s| StageRanges::empty(*s))
                .collect(),
            pipeline,
            flags,
            registry,
            reflector,
            failures: SmallVec::new(),
        };
        if let Err(error) = list.rebuild() {
            logwise::warn_sync!(
                "binding list for {label} has no usable stages: {error}",
                label = logwise::privacy::LogIt(list.pipeline.label()),
                error = logwise::privacy::LogIt(&error)
            );
        }
        list
    }

    /**
    Rebuilds every range from the pipeline's current binaries, then applies the registry's state.

    Local bindings are discarded.  Returns [`BindingError::NoUsableStages`] when the pipeline has
    at least one binary and reflection failed for all of them; the list is still usable, with
    empty ranges.
    */
    pub fn rebuild(&mut self) -> Result<(), BindingError> {
        let reflect_variables = self.flags.contains(PipelineStateFlags::REFLECT_VARIABLES);
        let mut stages = SmallVec::new();
        let mut failures = SmallVec::new();
        let mut present = 0usize;

        for &stage in self.pipeline.stages() {
            let Some(blob) = self.pipeline.stage_blob(stage) else {
                stages.push(StageRanges::empty(stage));
                continue;
            };
            present += 1;
            match self.reflect_stage(stage, &blob, reflect_variables) {
                Ok(built) => stages.push(built),
                Err(error) => {
                    logwise::warn_sync!(
                        "reflection failed for {stage} stage of {label}: {error}",
                        stage = logwise::privacy::LogIt(stage),
                        label = logwise::privacy::LogIt(self.pipeline.label()),
                        error = logwise::privacy::LogIt(&error)
                    );
                    failures.push(stage);
                    stages.push(StageRanges::empty(stage));
                }
            }
        }
        self.stages = stages;
        self.failures = failures;
        self.apply_registry_snapshot();

        logwise::info_sync!(
            "built {kind} binding list for {label}: {present} stages, {failed} failed",
            kind = self.pipeline.kind(),
            label = logwise::privacy::LogIt(self.pipeline.label()),
            present = present,
            failed = self.failures.len()
        );
        if present > 0 && self.failures.len() == present {
            Err(BindingError::NoUsableStages {
                failed: self.failures.to_vec(),
            })
        } else {
            Ok(())
        }
    }

    fn reflect_stage(
        &self,
        stage: ShaderStage,
        blob: &ShaderBlob,
        reflect_variables: bool,
    ) -> Result<StageRanges, ReflectionError> {
        let reflection = self.reflector.reflect(stage, blob, reflect_variables)?;
        let routed = reflection.route(stage)?;
        logwise::debuginternal_sync!(
            "{stage} stage of {label} declares {count} parameters",
            stage = logwise::privacy::LogIt(stage),
            label = logwise::privacy::LogIt(self.pipeline.label()),
            count = reflection.parameters.len()
        );
        let variables = if reflect_variables {
            VariableRange::new(stage, &reflection.constant_buffers)
        } else {
            VariableRange::empty(stage)
        };
        Ok(StageRanges {
            stage,
            ranges: ParameterCategory::ALL
                .map(|c| DescriptorRange::new(stage, c, &routed[c.index()])),
            variables,
        })
    }

    fn apply_registry_snapshot(&mut self) {
        for (name, state) in self.registry.snapshot() {
            for stage in &mut self.stages {
                stage.range_mut(state.category).apply_global(
                    &name,
                    None,
                    state.resource,
                    state.initial_count,
                    state.generation,
                );
            }
        }
    }

    /**
    Applies pending registry broadcasts and pipeline recompiles.

    Every other operation does this first; calling it directly is only needed to observe
    propagated state through read-only accessors such as [`Self::range`], or to learn whether a
    recompile left the list without usable stages.  In that case this returns the error from
    [`Self::rebuild`], and the list stays usable with empty ranges.
    */
    pub fn process_pending(&mut self) -> Result<(), BindingError> {
        let mut recompiled = false;
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                Inbox::GlobalStateChanged(change) => self.apply_global(&change),
                Inbox::PipelineCompiled => recompiled = true,
            }
        }
        if recompiled {
            self.rebuild()
        } else {
            Ok(())
        }
    }

    fn drain_inbox(&mut self) {
        //rebuild logs its failure and stage_failures reports it
        let _ = self.process_pending();
    }

    fn apply_global(&mut self, change: &StateChange) {
        let category = change.new.category;
        for stage in &mut self.stages {
            let range = stage.range_mut(category);
            if range.try_get_by_name(&change.name).is_none() {
                continue;
            }
            let applied = range.apply_global(
                &change.name,
                change.old.resource,
                change.new.resource,
                change.new.initial_count,
                change.new.generation,
            );
            if !applied {
                logwise::trace_sync!(
                    "dropped global update {generation} of {name} on {stage} stage",
                    generation = logwise::privacy::LogIt(change.new.generation),
                    name = logwise::privacy::LogIt(&change.name),
                    stage = logwise::privacy::LogIt(stage.stage)
                );
            }
        }
    }

    fn check_stage(&self, stage: ShaderStage) -> Result<usize, BindingError> {
        self.pipeline
            .stages()
            .iter()
            .position(|s| *s == stage)
            .ok_or(BindingError::StageMismatch {
                stage,
                pipeline: self.pipeline.kind(),
            })
    }

    /**
    Binds `resource` to `name` in `category`, on `stage` or on every stage declaring `name`.

    Returns whether anything declared the name.  Never fails; a stage this pipeline doesn't have
    is logged and ignored.
    */
    pub fn try_set_resource(
        &mut self,
        category: ParameterCategory,
        stage: Option<ShaderStage>,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> bool {
        self.drain_inbox();
        match stage {
            None => {
                let mut found = false;
                for stage in &mut self.stages {
                    found |= stage
                        .range_mut(category)
                        .try_set_by_name(name, resource, initial_count);
                }
                found
            }
            Some(stage) => match self.check_stage(stage) {
                Ok(index) => self.stages[index]
                    .range_mut(category)
                    .try_set_by_name(name, resource, initial_count),
                Err(error) => {
                    logwise::warn_sync!(
                        "ignoring set of {name}: {error}",
                        name = logwise::privacy::LogIt(name),
                        error = logwise::privacy::LogIt(&error)
                    );
                    false
                }
            },
        }
    }

    /// Like [`Self::try_set_resource`], but reports an unknown name or stage.
    pub fn set_resource(
        &mut self,
        category: ParameterCategory,
        stage: Option<ShaderStage>,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> Result<(), BindingError> {
        if let Some(stage) = stage {
            self.check_stage(stage)?;
        }
        if self.try_set_resource(category, stage, name, resource, initial_count) {
            Ok(())
        } else {
            Err(BindingError::NameNotFound {
                name: name.to_string(),
                category,
                stage,
            })
        }
    }

    pub fn set_cbv(&mut self, name: &str, resource: Option<RawHandle>) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::ConstantBuffer, None, name, resource, KEEP_COUNTER)
    }

    pub fn try_set_cbv(&mut self, name: &str, resource: Option<RawHandle>) -> bool {
        self.try_set_resource(ParameterCategory::ConstantBuffer, None, name, resource, KEEP_COUNTER)
    }

    pub fn set_srv(&mut self, name: &str, resource: Option<RawHandle>) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::ShaderResource, None, name, resource, KEEP_COUNTER)
    }

    pub fn try_set_srv(&mut self, name: &str, resource: Option<RawHandle>) -> bool {
        self.try_set_resource(ParameterCategory::ShaderResource, None, name, resource, KEEP_COUNTER)
    }

    /// `initial_count` seeds append/consume counters; [`KEEP_COUNTER`] leaves them alone.
    pub fn set_uav(
        &mut self,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::UnorderedAccess, None, name, resource, initial_count)
    }

    pub fn try_set_uav(&mut self, name: &str, resource: Option<RawHandle>, initial_count: u32) -> bool {
        self.try_set_resource(ParameterCategory::UnorderedAccess, None, name, resource, initial_count)
    }

    pub fn set_sampler(&mut self, name: &str, resource: Option<RawHandle>) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::Sampler, None, name, resource, KEEP_COUNTER)
    }

    pub fn try_set_sampler(&mut self, name: &str, resource: Option<RawHandle>) -> bool {
        self.try_set_resource(ParameterCategory::Sampler, None, name, resource, KEEP_COUNTER)
    }

    /// Binds a shader-read view on one stage only.
    pub fn set_stage_srv(
        &mut self,
        stage: ShaderStage,
        name: &str,
        resource: Option<RawHandle>,
    ) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::ShaderResource, Some(stage), name, resource, KEEP_COUNTER)
    }

    pub fn set_stage_cbv(
        &mut self,
        stage: ShaderStage,
        name: &str,
        resource: Option<RawHandle>,
    ) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::ConstantBuffer, Some(stage), name, resource, KEEP_COUNTER)
    }

    pub fn set_stage_uav(
        &mut self,
        stage: ShaderStage,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::UnorderedAccess, Some(stage), name, resource, initial_count)
    }

    pub fn set_stage_sampler(
        &mut self,
        stage: ShaderStage,
        name: &str,
        resource: Option<RawHandle>,
    ) -> Result<(), BindingError> {
        self.set_resource(ParameterCategory::Sampler, Some(stage), name, resource, KEEP_COUNTER)
    }

    /**
    Writes `value` into the constant-buffer variable `name` on every stage that declares it.

    Needs [`PipelineStateFlags::REFLECT_VARIABLES`]; without it no variables exist.  If any
    declaring stage reflects a different size, nothing is written.
    */
    pub fn set_variable<T: bytemuck::Pod>(&mut self, name: &str, value: &T) -> Result<(), BindingError> {
        self.drain_inbox();
        let bytes = bytemuck::bytes_of(value);
        let mut found = false;
        for stage in &self.stages {
            let Some(expected) = stage.variables.variable_size(name) else {
                continue;
            };
            if expected != bytes.len() {
                return Err(BindingError::VariableSizeMismatch {
                    name: name.to_string(),
                    expected,
                    actual: bytes.len(),
                });
            }
            found = true;
        }
        if !found {
            return Err(BindingError::VariableNotFound {
                name: name.to_string(),
            });
        }
        for stage in &mut self.stages {
            if stage.variables.contains(name) {
                stage.variables.set_bytes(name, bytes)?;
            }
        }
        Ok(())
    }

    pub fn try_set_variable<T: bytemuck::Pod>(&mut self, name: &str, value: &T) -> bool {
        self.set_variable(name, value).is_ok()
    }

    /// Pushes dirty constant-buffer variables to `ctx`.
    pub fn upload_state<C: BindContext + ?Sized>(&mut self, ctx: &mut C) {
        self.drain_inbox();
        for stage in &mut self.stages {
            stage.variables.upload(ctx);
        }
    }

    /**
    Binds every occupied interval of every range.

    Categories go in the order of [`ParameterCategory::ALL`], each across all stages.  One native
    call per interval.
    */
    pub fn bind<C: BindContext + ?Sized>(&mut self, ctx: &mut C) {
        self.drain_inbox();
        for category in ParameterCategory::ALL {
            for stage in &self.stages {
                stage.range(category).bind(ctx);
            }
        }
    }

    /// Detaches everything [`Self::bind`] would bind.
    pub fn unbind<C: BindContext + ?Sized>(&mut self, ctx: &mut C) {
        self.drain_inbox();
        for category in ParameterCategory::ALL {
            for stage in &self.stages {
                stage.range(category).unbind(ctx);
            }
        }
    }

    fn enumerate(&mut self, category: ParameterCategory) -> impl Iterator<Item = BindingValue<'_>> {
        self.drain_inbox();
        self.stages
            .iter()
            .flat_map(move |stage| stage.range(category).iter())
    }

    pub fn srvs(&mut self) -> impl Iterator<Item = BindingValue<'_>> {
        self.enumerate(ParameterCategory::ShaderResource)
    }

    pub fn cbvs(&mut self) -> impl Iterator<Item = BindingValue<'_>> {
        self.enumerate(ParameterCategory::ConstantBuffer)
    }

    pub fn uavs(&mut self) -> impl Iterator<Item = BindingValue<'_>> {
        self.enumerate(ParameterCategory::UnorderedAccess)
    }

    pub fn samplers(&mut self) -> impl Iterator<Item = BindingValue<'_>> {
        self.enumerate(ParameterCategory::Sampler)
    }

    /// The range for `stage` and `category`, if the pipeline has that stage.
    pub fn range(&self, stage: ShaderStage, category: ParameterCategory) -> Option<&DescriptorRange> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.range(category))
    }

    /// What is bound to `name` on `stage`.
    pub fn handle(&self, stage: ShaderStage, category: ParameterCategory, name: &str) -> Option<RawHandle> {
        self.range(stage, category)?.handle_by_name(name)
    }

    pub fn variables(&self, stage: ShaderStage) -> Option<&VariableRange> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| &s.variables)
    }

    /// Stages whose reflection failed in the last build.
    pub fn stage_failures(&self) -> &[ShaderStage] {
        &self.failures
    }

    pub fn pipeline(&self) -> &PipelineRef {
        &self.pipeline
    }

    pub fn flags(&self) -> PipelineStateFlags {
        self.flags
    }
}

impl std::fmt::Debug for BindingList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingList")
            .field("pipeline", &self.pipeline.label())
            .field("flags", &self.flags)
            .field("stages", &self.stages)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}
