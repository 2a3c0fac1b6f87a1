// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! slots_and_names is the resource-binding engine of a GPU abstraction layer.

Shaders declare their inputs by name.  Hardware binds them by slot.  This crate sits in between:
reflection tells us which names live in which slots for each stage of a pipeline, callers bind
resources by name, and at draw or dispatch time we issue as few native bind calls as the slot
layout allows.

Here is how it compares with the usual ways of getting resources to a shader:

| Strategy                 | Caller addresses by | Calls per draw                 | Cross-pipeline sharing           | Cost of a recompile        |
|--------------------------|---------------------|--------------------------------|----------------------------------|----------------------------|
| Slot-by-slot             | Slot                | One per slot                   | Manual                           | Caller must re-derive slots |
| Whole-table rebind       | Slot                | One per stage and category     | Manual                           | Caller must re-derive slots |
| Descriptor sets          | Set + binding       | One per set                    | Shared sets                      | Layouts must match         |
| slots_and_names          | Name                | One per contiguous occupied span | Global registry, local override wins | Automatic rebuild       |

# Pieces

* [`object`]: shared ownership for long-lived GPU objects, with checked downcasts.
* [`event_list`]: scoped publish/subscribe, safe to unsubscribe from inside a callback.
* [`bindings`]: the engine itself.  A [`bindings::DescriptorRange`] tracks one stage's resources
  of one category; a [`bindings::BindingList`] aggregates them for a pipeline; the
  [`bindings::GlobalResourceRegistry`] mirrors named resources into every live list.
* [`reflection`]: the seam to whatever reads compiled shaders.
* [`pipeline`] and [`device`]: pipelines, pipeline states, and the scope they live in.
* [`imp`]: the seam to the native driver, with a do-nothing and a recording backend.

# Interval coalescing

Each range keeps a sorted list of occupied spans that never touch.  Binding slots 2, 3, 4 and 5
leaves one span, so the draw costs one native call.  Clearing slot 3 splits it into two spans
and two calls.  Keeping the list coalesced costs time proportional to the number of spans, which
is small in practice.

# Threads

A binding list is driven from one thread at a time and takes no locks.  The registry and the
event lists it broadcasts through can be used from anywhere; a broadcast reaches a binding list
as a message that list applies the next time its owner touches it.

```
use std::sync::Arc;
use slots_and_names::bindings::{ParameterCategory, PipelineStateFlags, RawHandle};
use slots_and_names::device::Device;
use slots_and_names::imp::recording::RecordingContext;
use slots_and_names::object::Shared;
use slots_and_names::pipeline::{GraphicsShaders, ShaderBlob};
use slots_and_names::reflection::{ReflectedParameter, ShaderInputType, StageReflection, TableReflector};

let reflector = Arc::new(TableReflector::new());
reflector.register("sky_ps", StageReflection::new(vec![
    ReflectedParameter::new("sky", 3, ShaderInputType::Texture),
    ReflectedParameter::new("stars", 4, ShaderInputType::Texture),
]));
let device = Device::new(reflector);
let pipeline = device.create_graphics_pipeline("sky", GraphicsShaders {
    pixel: Some(Shared::new(ShaderBlob::new("sky_ps", vec![0u8; 16]))),
    ..Default::default()
});
let state = device.create_graphics_pipeline_state("sky", &pipeline, PipelineStateFlags::empty());

// a global resource reaches every pipeline that declares the name
device.registry().set_srv("sky", RawHandle::from_raw(0x1000));
state.with_bindings(|b| b.set_srv("stars", RawHandle::from_raw(0x2000))).unwrap();

let mut ctx = RecordingContext::new();
state.set_state(&mut ctx);
// slots 3 and 4 are adjacent, so one call binds both
assert_eq!(ctx.binds_for(ParameterCategory::ShaderResource).count(), 1);
```
*/

logwise::declare_logging_domain!();

pub mod bindings;
pub mod device;
pub mod event_list;
pub mod imp;
pub mod object;
pub mod pipeline;
pub mod reflection;
