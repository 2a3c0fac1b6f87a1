// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Named resources shared by every binding list on a device.

Setting a resource on the [`GlobalResourceRegistry`] records it under its name and broadcasts a
[`StateChange`] to subscribers.  Binding lists subscribe when they are built, so binding
`"shadow_map"` once reaches every live pipeline that declares `"shadow_map"`.

Every write to a name bumps that name's generation.  The registry records writes in lock order
but broadcasts after releasing the lock, so two racing broadcasts can arrive in either order.
Receivers compare generations and drop a change older than the last one they applied, so they
settle on the registry's latest value.

Each change also carries the handle the registry held before.  A slot the owner bound locally
takes the change only if it still holds that old handle, so a pipeline that bound something
else keeps its own binding.
*/

use std::sync::Arc;

use rustc_hash::FxHashMap;
use wasm_safe_mutex::Mutex;

use crate::bindings::descriptor_range::KEEP_COUNTER;
use crate::bindings::handle::RawHandle;
use crate::bindings::parameter::ParameterCategory;
use crate::event_list::{EventList, Subscription};

/// The last known binding for one global name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterState {
    pub category: ParameterCategory,
    pub resource: Option<RawHandle>,
    /// Meaningful for unordered-access views only.
    pub initial_count: u32,
    /// Counts writes to this name, starting at 1.
    pub generation: u64,
}

/// A broadcast change to a named resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub name: Arc<str>,
    /// For a name seen for the first time, `resource` is `None` and `generation` is 0.
    pub old: ParameterState,
    pub new: ParameterState,
}

pub struct GlobalResourceRegistry {
    states: Mutex<FxHashMap<Arc<str>, ParameterState>>,
    state_changed: EventList<StateChange>,
}

impl GlobalResourceRegistry {
    pub fn new() -> Self {
        GlobalResourceRegistry {
            states: Mutex::new(FxHashMap::default()),
            state_changed: EventList::new(),
        }
    }

    /**
    Records `resource` under `name` and broadcasts the change.

    Subscribers run on the calling thread, after the registry's own lock is released.
    */
    pub fn set_state(
        &self,
        name: &str,
        category: ParameterCategory,
        resource: Option<RawHandle>,
        initial_count: u32,
    ) {
        let change = {
            let mut states = self.states.lock_sync();
            let (key, old) = match states.get_key_value(name) {
                Some((key, old)) => (key.clone(), *old),
                None => (
                    Arc::from(name),
                    ParameterState {
                        category,
                        resource: None,
                        initial_count: KEEP_COUNTER,
                        generation: 0,
                    },
                ),
            };
            let new = ParameterState {
                category,
                resource,
                initial_count,
                generation: old.generation + 1,
            };
            states.insert(key.clone(), new);
            StateChange {
                name: key,
                old,
                new,
            }
        };
        logwise::trace_sync!(
            "global state {name} changed, generation {generation}",
            name = logwise::privacy::LogIt(&change.name),
            generation = logwise::privacy::LogIt(change.new.generation)
        );
        self.state_changed.invoke(&change);
    }

    pub fn set_cbv(&self, name: &str, resource: Option<RawHandle>) {
        self.set_state(name, ParameterCategory::ConstantBuffer, resource, KEEP_COUNTER)
    }

    pub fn set_srv(&self, name: &str, resource: Option<RawHandle>) {
        self.set_state(name, ParameterCategory::ShaderResource, resource, KEEP_COUNTER)
    }

    pub fn set_uav(&self, name: &str, resource: Option<RawHandle>, initial_count: u32) {
        self.set_state(
            name,
            ParameterCategory::UnorderedAccess,
            resource,
            initial_count,
        )
    }

    pub fn set_sampler(&self, name: &str, resource: Option<RawHandle>) {
        self.set_state(name, ParameterCategory::Sampler, resource, KEEP_COUNTER)
    }

    pub fn state(&self, name: &str) -> Option<ParameterState> {
        self.states.lock_sync().get(name).copied()
    }

    /// Every known name with its state, in no particular order.
    pub fn snapshot(&self) -> Vec<(Arc<str>, ParameterState)> {
        self.states
            .lock_sync()
            .iter()
            .map(|(name, state)| (name.clone(), *state))
            .collect()
    }

    /// Calls `callback` for every later change.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.state_changed.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state_changed.len()
    }
}

impl Default for GlobalResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobalResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalResourceRegistry")
            .field("states", &self.states.lock_sync().len())
            .field("subscribers", &self.state_changed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn handle(raw: usize) -> Option<RawHandle> {
        RawHandle::from_raw(raw)
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn broadcasts_old_and_new() {
        let registry = GlobalResourceRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = registry.subscribe(move |change| {
            s.lock().unwrap().push((
                change.name.to_string(),
                change.old.resource,
                change.new.resource,
                change.new.generation,
            ))
        });

        registry.set_srv("sky", handle(1));
        registry.set_srv("sky", handle(2));
        registry.set_srv("ground", handle(3));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("sky".to_string(), None, handle(1), 1),
                ("sky".to_string(), handle(1), handle(2), 2),
                ("ground".to_string(), None, handle(3), 1),
            ]
        );
        assert_eq!(registry.state("sky").and_then(|s| s.resource), handle(2));
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn subscriber_may_read_registry() {
        //the registry lock is released before subscribers run
        let registry = Arc::new(GlobalResourceRegistry::new());
        let weak = Arc::downgrade(&registry);
        let read = Arc::new(StdMutex::new(None));
        let r = read.clone();
        let _sub = registry.subscribe(move |change| {
            let registry = weak.upgrade().unwrap();
            *r.lock().unwrap() = registry.state(&change.name);
        });
        registry.set_uav("counter", handle(5), 0);
        assert_eq!(
            *read.lock().unwrap(),
            Some(ParameterState {
                category: ParameterCategory::UnorderedAccess,
                resource: handle(5),
                initial_count: 0,
                generation: 1,
            })
        );
    }
}
