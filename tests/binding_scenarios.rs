// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Slot tracking and bind-call shape for a single descriptor range.

use slots_and_names::bindings::{
    BindingError, DescriptorRange, Interval, KEEP_COUNTER, ParameterCategory, RawHandle,
    ShaderParameter, ShaderStage,
};
use slots_and_names::imp::recording::{BindCall, RecordingContext};

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

/// tex at slot 2, buf at slot 5, and two parameters filling the gap.
fn sample_range() -> DescriptorRange {
    DescriptorRange::new(
        ShaderStage::Pixel,
        ParameterCategory::ShaderResource,
        &[srv("tex", 2), srv("lo", 3), srv("hi", 4), srv("buf", 5)],
    )
}

fn spans(range: &DescriptorRange) -> Vec<Interval> {
    range.intervals().as_slice().to_vec()
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn separated_slots_bind_separately() {
    let mut range = sample_range();
    assert_eq!(range.base_slot(), 2);
    assert_eq!(range.width(), 4);

    range.set_by_name("tex", handle(0xa), KEEP_COUNTER).unwrap();
    range.set_by_name("buf", handle(0xb), KEEP_COUNTER).unwrap();
    assert_eq!(spans(&range), vec![Interval::new(0, 1), Interval::new(3, 1)]);

    let mut ctx = RecordingContext::new();
    range.bind(&mut ctx);
    assert_eq!(
        ctx.take(),
        vec![
            BindCall::Bind {
                stage: ShaderStage::Pixel,
                category: ParameterCategory::ShaderResource,
                start_slot: 2,
                handles: vec![handle(0xa)],
                initial_counts: vec![],
            },
            BindCall::Bind {
                stage: ShaderStage::Pixel,
                category: ParameterCategory::ShaderResource,
                start_slot: 5,
                handles: vec![handle(0xb)],
                initial_counts: vec![],
            },
        ]
    );
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn filling_the_gap_coalesces() {
    let mut range = sample_range();
    range.set_by_name("tex", handle(0xa), KEEP_COUNTER).unwrap();
    range.set_by_name("buf", handle(0xb), KEEP_COUNTER).unwrap();
    range.set_by_name("lo", handle(0xc), KEEP_COUNTER).unwrap();
    range.set_by_name("hi", handle(0xd), KEEP_COUNTER).unwrap();
    assert_eq!(spans(&range), vec![Interval::new(0, 4)]);

    let mut ctx = RecordingContext::new();
    range.bind(&mut ctx);
    let calls = ctx.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        BindCall::Bind {
            stage: ShaderStage::Pixel,
            category: ParameterCategory::ShaderResource,
            start_slot: 2,
            handles: vec![handle(0xa), handle(0xc), handle(0xd), handle(0xb)],
            initial_counts: vec![],
        }
    );
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn clearing_the_first_slot_shrinks() {
    let mut range = sample_range();
    for name in ["tex", "lo", "hi", "buf"] {
        range.set_by_name(name, handle(1), KEEP_COUNTER).unwrap();
    }
    range.set_by_name("tex", None, KEEP_COUNTER).unwrap();
    assert_eq!(spans(&range), vec![Interval::new(1, 3)]);

    //clearing an interior slot splits
    range.set_by_name("hi", None, KEEP_COUNTER).unwrap();
    assert_eq!(spans(&range), vec![Interval::new(1, 1), Interval::new(3, 1)]);
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn stale_conditional_update_is_dropped() {
    let mut range = sample_range();
    range.set_by_name("tex", handle(0x1), KEEP_COUNTER).unwrap();
    assert!(!range.update_by_name("tex", handle(0x2), handle(0x3), KEEP_COUNTER));
    assert_eq!(range.handle_by_name("tex"), handle(0x1));

    assert!(range.update_by_name("tex", handle(0x1), handle(0x3), KEEP_COUNTER));
    assert_eq!(range.handle_by_name("tex"), handle(0x3));

    //an absent name is a silent no-op
    assert!(!range.update_by_name("absent", None, handle(0x3), KEEP_COUNTER));
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn setting_twice_is_idempotent() {
    let mut once = sample_range();
    once.set_by_name("lo", handle(7), KEEP_COUNTER).unwrap();

    let mut twice = sample_range();
    twice.set_by_name("lo", handle(7), KEEP_COUNTER).unwrap();
    twice.set_by_name("lo", handle(7), KEEP_COUNTER).unwrap();

    assert_eq!(once.intervals(), twice.intervals());
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn zero_parameter_range() {
    let mut range = DescriptorRange::new(ShaderStage::Vertex, ParameterCategory::ConstantBuffer, &[]);
    assert_eq!(range.width(), 0);
    assert!(range.intervals().is_empty());
    assert!(matches!(
        range.get_by_name("anything"),
        Err(BindingError::NameNotFound { .. })
    ));
    assert!(range.set_by_name("anything", handle(1), KEEP_COUNTER).is_err());
    assert!(!range.try_set_by_name("anything", handle(1), KEEP_COUNTER));
    assert!(range.intervals().is_empty());
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn intervals_track_occupancy_under_random_sets() {
    //sparse slots, so some adjacent parameters are not adjacent in the slot array
    let slots: Vec<u32> = (0..24).map(|i| i * 3 / 2).collect();
    let parameters: Vec<ShaderParameter> = slots
        .iter()
        .enumerate()
        .map(|(i, slot)| srv(&format!("p{i}"), *slot))
        .collect();
    let mut range = DescriptorRange::new(
        ShaderStage::Pixel,
        ParameterCategory::ShaderResource,
        &parameters,
    );

    let mut state = 0x2545_f491_u32;
    for step in 0..3000usize {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let which = (state % parameters.len() as u32) as usize;
        let value = if state & 0x100 == 0 { None } else { handle(step + 1) };
        range
            .set_by_name(parameters[which].name(), value, KEEP_COUNTER)
            .unwrap();

        let intervals = range.intervals().as_slice();
        for pair in intervals.windows(2) {
            assert!(pair[0].start + pair[0].len < pair[1].start, "adjacent: {pair:?}");
        }
        for index in 0..range.width() {
            let occupied = range.slot(index).is_some();
            let covered = intervals.iter().any(|i| i.contains(index as u32));
            assert_eq!(occupied, covered, "index {index}");
        }
    }
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn unbind_mirrors_bind_with_nulls() {
    let mut range = sample_range();
    range.set_by_name("tex", handle(0xa), KEEP_COUNTER).unwrap();
    range.set_by_name("hi", handle(0xb), KEEP_COUNTER).unwrap();
    range.set_by_name("buf", handle(0xc), KEEP_COUNTER).unwrap();

    let mut ctx = RecordingContext::new();
    range.bind(&mut ctx);
    let bound = ctx.take();
    range.unbind(&mut ctx);
    let unbound = ctx.take();

    assert_eq!(bound.len(), 2);
    assert_eq!(unbound.len(), bound.len());
    for (b, u) in bound.iter().zip(&unbound) {
        assert_eq!(b.width(), u.width());
        assert!(u.is_unbind());
        let (BindCall::Bind { start_slot: bs, .. }, BindCall::Bind { start_slot: us, .. }) = (b, u)
        else {
            panic!("unexpected call kinds");
        };
        assert_eq!(bs, us);
    }
    //unbinding does not forget what was bound
    assert_eq!(range.handle_by_name("hi"), handle(0xb));
}
