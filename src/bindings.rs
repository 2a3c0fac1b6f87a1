// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The resource-binding engine.

Leaves first: [`parameter`] and [`handle`] define what is bound and to what;
the parameter table and [`interval_list`] are the two data structures inside a
[`DescriptorRange`]; [`BindingList`] aggregates ranges for a pipeline; and the
[`GlobalResourceRegistry`] links binding lists together.
*/

pub mod binding_list;
pub mod descriptor_range;
pub mod error;
pub mod global_registry;
pub mod handle;
pub mod interval_list;
pub mod parameter;
pub(crate) mod parameter_table;
pub mod variables;

pub use binding_list::{BindingList, PipelineStateFlags};
pub use descriptor_range::{BindingEnumerator, BindingValue, DescriptorRange, KEEP_COUNTER, SlotSource};
pub use error::BindingError;
pub use global_registry::{GlobalResourceRegistry, ParameterState, StateChange};
pub use handle::RawHandle;
pub use interval_list::{Interval, IntervalList};
pub use parameter::{ParameterCategory, ShaderParameter, ShaderStage, hash_name};
pub use variables::VariableRange;
