// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
One (stage, category) unit of a binding list.

A [`DescriptorRange`] combines three things:

* a [`ParameterTable`] mapping parameter names to reflected slots,
* a slot array holding the handle currently bound at each slot, indexed by
  `slot - base_slot`, where `base_slot` is the lowest declared slot,
* an [`IntervalList`] recording which slot-array indices are occupied.

Each slot also remembers its [`SlotSource`]: whether the owner set it locally, or which registry
generation last wrote it.  [`DescriptorRange::apply_global`] uses that to order broadcasts.

The slot array spans from the lowest to the highest declared slot, so unused slots in between
are simply never occupied.  Binding walks the interval list and issues one native call per
interval, so a fully packed range costs one call no matter how wide it is.
*/

use crate::bindings::error::BindingError;
use crate::bindings::handle::RawHandle;
use crate::bindings::interval_list::{Interval, IntervalList};
use crate::bindings::parameter::{ParameterCategory, ShaderParameter, ShaderStage};
use crate::bindings::parameter_table::ParameterTable;
use crate::imp::BindContext;

/// Per-stage input slot limit of the target hardware class.
const SCRATCH_WIDTH: usize = 128;

/// Unbinding binds from here.
static NULL_HANDLES: [Option<RawHandle>; SCRATCH_WIDTH] = [None; SCRATCH_WIDTH];
static KEEP_COUNTS: [u32; SCRATCH_WIDTH] = [KEEP_COUNTER; SCRATCH_WIDTH];

/// Initial count meaning "leave the append/consume counter alone".
pub const KEEP_COUNTER: u32 = u32::MAX;

/// Who last wrote a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// The range's owner.
    Local,
    /// The global registry, at this generation.  Fresh slots start at generation 0.
    Global(u64),
}

#[derive(Debug, Clone)]
pub struct DescriptorRange {
    stage: ShaderStage,
    category: ParameterCategory,
    base_slot: u32,
    table: ParameterTable,
    slots: Box<[Option<RawHandle>]>,
    sources: Box<[SlotSource]>,
    //unordered-access ranges only
    initial_counts: Option<Box<[u32]>>,
    intervals: IntervalList,
}

impl DescriptorRange {
    /**
    Builds a range from the parameters one stage declares for `category`.

    Every parameter must belong to `stage` and `category`.
    */
    pub fn new(stage: ShaderStage, category: ParameterCategory, parameters: &[ShaderParameter]) -> Self {
        debug_assert!(
            parameters
                .iter()
                .all(|p| p.stage() == stage && p.category() == category),
            "parameter routed to the wrong range"
        );
        let Some(base_slot) = parameters.iter().map(ShaderParameter::slot).min() else {
            return Self::empty(stage, category);
        };
        let max_slot = parameters
            .iter()
            .map(ShaderParameter::slot)
            .max()
            .unwrap_or(base_slot);
        let width = (max_slot - base_slot) as usize + 1;

        let initial_counts = (category == ParameterCategory::UnorderedAccess)
            .then(|| vec![KEEP_COUNTER; width].into_boxed_slice());

        DescriptorRange {
            stage,
            category,
            base_slot,
            table: ParameterTable::build(parameters.iter().cloned()),
            slots: vec![None; width].into_boxed_slice(),
            sources: vec![SlotSource::Global(0); width].into_boxed_slice(),
            initial_counts,
            intervals: IntervalList::new(),
        }
    }

    /// A range with no parameters.  Used for absent stages and stages whose reflection failed.
    pub fn empty(stage: ShaderStage, category: ParameterCategory) -> Self {
        DescriptorRange {
            stage,
            category,
            base_slot: 0,
            table: ParameterTable::build(std::iter::empty()),
            slots: Vec::new().into_boxed_slice(),
            sources: Vec::new().into_boxed_slice(),
            initial_counts: None,
            intervals: IntervalList::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn category(&self) -> ParameterCategory {
        self.category
    }

    pub fn base_slot(&self) -> u32 {
        self.base_slot
    }

    /// Length of the slot array.
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// Number of declared parameters.
    pub fn parameter_count(&self) -> usize {
        self.table.capacity()
    }

    pub fn intervals(&self) -> &IntervalList {
        &self.intervals
    }

    /// The handle at slot-array `index`.  `None` when unbound or out of range.
    pub fn slot(&self, index: usize) -> Option<RawHandle> {
        self.slots.get(index).copied().flatten()
    }

    pub fn source(&self, index: usize) -> Option<SlotSource> {
        self.sources.get(index).copied()
    }

    /// The initial count recorded for slot-array `index`, for unordered-access ranges.
    pub fn initial_count(&self, index: usize) -> Option<u32> {
        self.initial_counts
            .as_ref()
            .and_then(|counts| counts.get(index).copied())
    }

    pub fn get_by_name(&self, name: &str) -> Result<&ShaderParameter, BindingError> {
        self.try_get_by_name(name)
            .ok_or_else(|| BindingError::NameNotFound {
                name: name.to_string(),
                category: self.category,
                stage: Some(self.stage),
            })
    }

    pub fn try_get_by_name(&self, name: &str) -> Option<&ShaderParameter> {
        self.table.get(name)
    }

    /// The handle currently bound to `name`.
    pub fn handle_by_name(&self, name: &str) -> Option<RawHandle> {
        let index = self.index_of(self.try_get_by_name(name)?);
        self.slots[index]
    }

    /**
    Binds `resource` to `name`.

    `initial_count` is recorded only for unordered-access ranges.
    */
    pub fn set_by_name(
        &mut self,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> Result<(), BindingError> {
        let index = self.index_of(self.get_by_name(name)?);
        self.write(index, resource, initial_count, SlotSource::Local);
        Ok(())
    }

    /// Like [`Self::set_by_name`], but an unknown name is ignored.  Returns whether `name` exists.
    pub fn try_set_by_name(
        &mut self,
        name: &str,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> bool {
        let Some(parameter) = self.try_get_by_name(name) else {
            return false;
        };
        let index = self.index_of(parameter);
        self.write(index, resource, initial_count, SlotSource::Local);
        true
    }

    /**
    Binds `resource` to `name` only if the slot currently holds `expected`.

    Returns whether the write happened.  An unknown name or a stale `expected` leaves the range
    untouched.
    */
    pub fn update_by_name(
        &mut self,
        name: &str,
        expected: Option<RawHandle>,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) -> bool {
        let Some(parameter) = self.try_get_by_name(name) else {
            return false;
        };
        let index = self.index_of(parameter);
        if self.slots[index] != expected {
            return false;
        }
        self.write(index, resource, initial_count, SlotSource::Local);
        true
    }

    /**
    Applies a registry write of generation `generation` to `name`.

    A slot last written by the registry takes the write only if `generation` is newer than the
    one it holds, so broadcasts delivered out of order settle on the registry's latest value.  A
    slot set locally takes it only if it still holds `expected`, the registry's prior value.
    Returns whether the write happened.
    */
    pub fn apply_global(
        &mut self,
        name: &str,
        expected: Option<RawHandle>,
        resource: Option<RawHandle>,
        initial_count: u32,
        generation: u64,
    ) -> bool {
        let Some(parameter) = self.try_get_by_name(name) else {
            return false;
        };
        let index = self.index_of(parameter);
        let current = match self.sources[index] {
            SlotSource::Local => self.slots[index] == expected,
            SlotSource::Global(seen) => generation > seen,
        };
        if !current {
            return false;
        }
        self.write(index, resource, initial_count, SlotSource::Global(generation));
        true
    }

    fn index_of(&self, parameter: &ShaderParameter) -> usize {
        debug_assert!(parameter.slot() >= self.base_slot);
        (parameter.slot() - self.base_slot) as usize
    }

    fn write(
        &mut self,
        index: usize,
        resource: Option<RawHandle>,
        initial_count: u32,
        source: SlotSource,
    ) {
        let old = std::mem::replace(&mut self.slots[index], resource);
        self.sources[index] = source;
        if let Some(counts) = self.initial_counts.as_mut() {
            counts[index] = initial_count;
        }
        match (old.is_some(), resource.is_some()) {
            (false, true) => self.intervals.occupy(index as u32),
            (true, false) => self.intervals.vacate(index as u32),
            _ => {}
        }
    }

    /// Issues one native call per occupied interval.
    pub fn bind<C: BindContext + ?Sized>(&self, ctx: &mut C) {
        for interval in self.intervals.as_slice() {
            let span = span(*interval);
            let counts = self.initial_counts.as_ref().map(|c| &c[span.clone()]);
            self.issue(ctx, interval.start, &self.slots[span], counts);
        }
    }

    /// Detaches every occupied interval, using the same call shape as [`Self::bind`].
    pub fn unbind<C: BindContext + ?Sized>(&self, ctx: &mut C) {
        for interval in self.intervals.as_slice() {
            let mut start = interval.start as usize;
            let end = interval.end() as usize;
            while start < end {
                let len = (end - start).min(SCRATCH_WIDTH);
                let counts = self.initial_counts.as_ref().map(|_| &KEEP_COUNTS[..len]);
                self.issue(ctx, start as u32, &NULL_HANDLES[..len], counts);
                start += len;
            }
        }
    }

    fn issue<C: BindContext + ?Sized>(
        &self,
        ctx: &mut C,
        index: u32,
        handles: &[Option<RawHandle>],
        initial_counts: Option<&[u32]>,
    ) {
        let start_slot = self.base_slot + index;
        match self.category {
            ParameterCategory::ConstantBuffer => {
                ctx.set_constant_buffers(self.stage, start_slot, handles)
            }
            ParameterCategory::ShaderResource => {
                ctx.set_shader_resources(self.stage, start_slot, handles)
            }
            ParameterCategory::Sampler => ctx.set_samplers(self.stage, start_slot, handles),
            ParameterCategory::UnorderedAccess => ctx.set_unordered_access_views(
                self.stage,
                start_slot,
                handles,
                initial_counts.unwrap_or(&KEEP_COUNTS[..handles.len()]),
            ),
        }
    }

    /// Enumerates every declared parameter with its current binding.
    pub fn iter(&self) -> BindingEnumerator<'_> {
        BindingEnumerator {
            range: self,
            bucket: 0,
        }
    }
}

fn span(interval: Interval) -> std::ops::Range<usize> {
    interval.start as usize..interval.end() as usize
}

/// A declared parameter and what is bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingValue<'a> {
    pub name: &'a str,
    pub stage: ShaderStage,
    pub category: ParameterCategory,
    pub handle: Option<RawHandle>,
}

/**
Walks the parameters of one [`DescriptorRange`], bound or not.

Forward-only; [`Self::reset`] starts the walk over.
*/
#[derive(Debug, Clone)]
pub struct BindingEnumerator<'a> {
    range: &'a DescriptorRange,
    bucket: usize,
}

impl BindingEnumerator<'_> {
    pub fn reset(&mut self) {
        self.bucket = 0;
    }
}

impl<'a> Iterator for BindingEnumerator<'a> {
    type Item = BindingValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.range;
        while self.bucket < range.table.capacity() {
            let bucket = self.bucket;
            self.bucket += 1;
            if let Some(parameter) = range.table.bucket(bucket) {
                return Some(BindingValue {
                    name: parameter.name(),
                    stage: range.stage,
                    category: range.category,
                    handle: range.slots[range.index_of(parameter)],
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::recording::{BindCall, RecordingContext};

    fn handle(raw: usize) -> Option<RawHandle> {
        RawHandle::from_raw(raw)
    }

    fn srv(name: &str, slot: u32) -> ShaderParameter {
        ShaderParameter::new(
            name,
            slot,
            1,
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
        )
    }

    fn spans(range: &DescriptorRange) -> Vec<(u32, u32)> {
        range
            .intervals()
            .as_slice()
            .iter()
            .map(|i| (i.start, i.len))
            .collect()
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn width_from_slot_extremes() {
        let range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("tex", 2), srv("buf", 5)],
        );
        assert_eq!(range.base_slot(), 2);
        assert_eq!(range.width(), 4);
        assert_eq!(range.parameter_count(), 2);
        assert!(range.intervals().is_empty());
        assert!(range.initial_count(0).is_none());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn set_get_round_trip() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("tex", 2), srv("buf", 5)],
        );
        range.set_by_name("buf", handle(0x10), KEEP_COUNTER).unwrap();
        let parameter = range.get_by_name("buf").unwrap();
        assert_eq!(parameter.slot(), 5);
        assert_eq!(range.slot(3), handle(0x10));
        assert_eq!(range.handle_by_name("buf"), handle(0x10));
        assert_eq!(spans(&range), vec![(3, 1)]);

        range.set_by_name("buf", None, KEEP_COUNTER).unwrap();
        assert!(range.intervals().is_empty());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn rebinding_occupied_slot_keeps_intervals() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("tex", 0)],
        );
        assert!(range.try_set_by_name("tex", handle(1), KEEP_COUNTER));
        assert!(range.try_set_by_name("tex", handle(2), KEEP_COUNTER));
        assert_eq!(spans(&range), vec![(0, 1)]);
        assert_eq!(range.slot(0), handle(2));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn unknown_name() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("tex", 0)],
        );
        assert!(!range.try_set_by_name("nope", handle(1), KEEP_COUNTER));
        assert_eq!(
            range.set_by_name("nope", handle(1), KEEP_COUNTER),
            Err(BindingError::NameNotFound {
                name: "nope".to_string(),
                category: ParameterCategory::ShaderResource,
                stage: Some(ShaderStage::Pixel),
            })
        );
        assert!(range.intervals().is_empty());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn uav_initial_counts() {
        let uav = |name: &str, slot| {
            ShaderParameter::new(
                name,
                slot,
                1,
                ShaderStage::Compute,
                ParameterCategory::UnorderedAccess,
            )
        };
        let mut range = DescriptorRange::new(
            ShaderStage::Compute,
            ParameterCategory::UnorderedAccess,
            &[uav("append", 0), uav("out", 1)],
        );
        assert_eq!(range.initial_count(1), Some(KEEP_COUNTER));
        range.set_by_name("append", handle(7), 0).unwrap();
        range.set_by_name("out", handle(8), KEEP_COUNTER).unwrap();

        let mut ctx = RecordingContext::new();
        range.bind(&mut ctx);
        assert_eq!(
            ctx.take(),
            vec![BindCall::Bind {
                stage: ShaderStage::Compute,
                category: ParameterCategory::UnorderedAccess,
                start_slot: 0,
                handles: vec![handle(7), handle(8)],
                initial_counts: vec![0, KEEP_COUNTER],
            }]
        );

        range.unbind(&mut ctx);
        let calls = ctx.take();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_unbind());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn unbind_splits_wide_spans() {
        let parameters: Vec<ShaderParameter> =
            (0..200).map(|i| srv(&format!("t{i}"), i)).collect();
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &parameters,
        );
        for i in 0..200 {
            range.set_by_name(&format!("t{i}"), handle(i + 1), KEEP_COUNTER).unwrap();
        }
        assert_eq!(spans(&range), vec![(0, 200)]);

        let mut ctx = RecordingContext::new();
        range.bind(&mut ctx);
        assert_eq!(ctx.take().len(), 1);

        range.unbind(&mut ctx);
        let calls = ctx.take();
        let widths: Vec<usize> = calls.iter().map(BindCall::width).collect();
        assert_eq!(widths, vec![128, 72]);
        assert!(calls.iter().all(BindCall::is_unbind));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn enumerator_restarts() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("a", 0), srv("b", 1), srv("c", 3)],
        );
        range.set_by_name("b", handle(9), KEEP_COUNTER).unwrap();

        let mut walk = range.iter();
        let mut seen: Vec<(&str, Option<RawHandle>)> =
            walk.by_ref().map(|v| (v.name, v.handle)).collect();
        seen.sort();
        assert_eq!(seen, vec![("a", None), ("b", handle(9)), ("c", None)]);
        assert!(walk.next().is_none());

        walk.reset();
        assert_eq!(walk.count(), 3);
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn global_writes_ordered_by_generation() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("sky", 0)],
        );
        assert_eq!(range.source(0), Some(SlotSource::Global(0)));
        assert!(range.apply_global("sky", None, handle(0xa), KEEP_COUNTER, 1));
        //generation 3 arrives before generation 2
        assert!(range.apply_global("sky", handle(0xb), handle(0xc), KEEP_COUNTER, 3));
        assert!(!range.apply_global("sky", handle(0xa), handle(0xb), KEEP_COUNTER, 2));
        assert_eq!(range.handle_by_name("sky"), handle(0xc));
        assert_eq!(range.source(0), Some(SlotSource::Global(3)));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn local_binding_needs_matching_prior() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("sky", 0)],
        );
        range.set_by_name("sky", handle(0x1), KEEP_COUNTER).unwrap();
        assert_eq!(range.source(0), Some(SlotSource::Local));
        assert!(!range.apply_global("sky", handle(0xa), handle(0xb), KEEP_COUNTER, 9));
        assert_eq!(range.handle_by_name("sky"), handle(0x1));

        //a local binding equal to the registry's prior value follows the registry again
        assert!(range.apply_global("sky", handle(0x1), handle(0x2), KEEP_COUNTER, 10));
        assert_eq!(range.source(0), Some(SlotSource::Global(10)));
        assert!(!range.apply_global("sky", handle(0x2), handle(0x3), KEEP_COUNTER, 10));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn slot_at_top_of_slot_space() {
        let mut range = DescriptorRange::new(
            ShaderStage::Pixel,
            ParameterCategory::ShaderResource,
            &[srv("last", u32::MAX - 1), srv("edge", u32::MAX)],
        );
        assert_eq!(range.base_slot(), u32::MAX - 1);
        assert_eq!(range.width(), 2);
        range.set_by_name("edge", handle(4), KEEP_COUNTER).unwrap();

        let mut ctx = RecordingContext::new();
        range.bind(&mut ctx);
        assert!(matches!(
            &ctx.calls()[..],
            [BindCall::Bind { start_slot, .. }] if *start_slot == u32::MAX
        ));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn empty_range_is_inert() {
        let mut range = DescriptorRange::empty(ShaderStage::Hull, ParameterCategory::Sampler);
        assert_eq!(range.width(), 0);
        assert!(range.intervals().is_empty());
        assert!(range.get_by_name("s").is_err());
        assert!(!range.try_set_by_name("s", handle(1), KEEP_COUNTER));
        assert!(!range.update_by_name("s", None, handle(1), KEEP_COUNTER));
        assert!(!range.apply_global("s", None, handle(1), KEEP_COUNTER, 1));
        assert_eq!(range.iter().count(), 0);

        let mut ctx = RecordingContext::new();
        range.bind(&mut ctx);
        range.unbind(&mut ctx);
        assert!(ctx.calls().is_empty());
    }
}
