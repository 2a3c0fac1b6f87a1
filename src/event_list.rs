// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Scoped publish/subscribe.

An [`EventList`] holds callbacks in subscription order.  [`EventList::subscribe`] returns a
[`Subscription`]; dropping it unsubscribes.  The list is shared across threads behind a spin
lock, since it is held for a handful of instructions at a time and rarely contended.

The lock is never held while a callback runs.  Instead, [`EventList::invoke`] remembers the
position of the subscriber it just called and resumes after it, so a callback may
unsubscribe itself (or anything else) without deadlocking or confusing the walk.

A subscription only holds a weak reference back to its list.  Once the list is gone,
unsubscribing is a no-op, so a token outliving its list is harmless.
*/

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Weak};

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Subscriber<A> {
    id: u64,
    callback: Callback<A>,
}

struct Subscribers<A> {
    next_id: u64,
    //sorted by id, which is subscription order
    list: Vec<Subscriber<A>>,
}

/// Type-erased removal, so a [`Subscription`] doesn't carry the event's argument type.
trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

impl<A> Unsubscribe for spin::Mutex<Subscribers<A>>
where
    A: 'static,
{
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.lock();
        match subscribers.list.binary_search_by_key(&id, |s| s.id) {
            Ok(index) => {
                subscribers.list.remove(index);
                true
            }
            Err(_) => false,
        }
    }
}

/// A list of callbacks invoked with `&A`.
pub struct EventList<A> {
    subscribers: Arc<spin::Mutex<Subscribers<A>>>,
}

impl<A: 'static> EventList<A> {
    pub fn new() -> Self {
        EventList {
            subscribers: Arc::new(spin::Mutex::new(Subscribers {
                next_id: 0,
                list: Vec::new(),
            })),
        }
    }

    /**
    Registers `callback`.

    The callback stays registered until the returned [`Subscription`] is dropped or
    explicitly unsubscribed.
    */
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = {
            let mut subscribers = self.subscribers.lock();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.list.push(Subscriber {
                id,
                callback: Arc::new(callback),
            });
            id
        };
        let weak: Weak<spin::Mutex<Subscribers<A>>> = Arc::downgrade(&self.subscribers);
        let list: Weak<dyn Unsubscribe> = weak;
        Subscription {
            list: Some(list),
            id,
        }
    }

    /**
    Calls every subscriber with `args`, in subscription order.

    Subscribers removed before the walk reaches them are skipped.  Subscribers added
    during the walk are called in the same walk.
    */
    pub fn invoke(&self, args: &A) {
        let mut last_called: Option<u64> = None;
        loop {
            let callback = {
                let subscribers = self.subscribers.lock();
                let position = match last_called {
                    None => 0,
                    Some(id) => subscribers.list.partition_point(|s| s.id <= id),
                };
                match subscribers.list.get(position) {
                    Some(subscriber) => {
                        last_called = Some(subscriber.id);
                        subscriber.callback.clone()
                    }
                    None => break,
                }
            };
            callback(args);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: 'static> Default for EventList<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Debug for EventList<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventList")
            .field("subscribers", &self.subscribers.lock().list.len())
            .finish()
    }
}

/**
Keeps a callback registered on an [`EventList`].

Dropping the subscription unsubscribes.
*/
pub struct Subscription {
    list: Option<Weak<dyn Unsubscribe>>,
    id: u64,
}

impl Subscription {
    /// Unsubscribes now.  Calling this more than once is fine.
    pub fn unsubscribe(&mut self) {
        if let Some(list) = self.list.take() {
            if let Some(list) = list.upgrade() {
                list.remove(self.id);
            }
        }
    }

    /// False after [`Self::unsubscribe`], or once the list has been dropped.
    pub fn is_subscribed(&self) -> bool {
        self.list.as_ref().is_some_and(|l| l.strong_count() > 0)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn invoke_in_subscription_order() {
        let list = EventList::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let seen = seen.clone();
                list.subscribe(move |v: &u32| seen.lock().unwrap().push((i, *v)))
            })
            .collect();
        list.invoke(&7);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
        drop(subs);
        assert!(list.is_empty());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn drop_unsubscribes() {
        let list = EventList::<()>::new();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let sub = list.subscribe(move |_| *h.lock().unwrap() += 1);
        list.invoke(&());
        drop(sub);
        list.invoke(&());
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn reentrant_self_unsubscribe() {
        let list = EventList::<()>::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let s = slot.clone();
        let c = calls.clone();
        let first = list.subscribe(move |_| {
            c.lock().unwrap().push("first");
            //unsubscribe ourselves mid-walk
            if let Some(mut me) = s.lock().unwrap().take() {
                me.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(first);

        let c = calls.clone();
        let _second = list.subscribe(move |_| c.lock().unwrap().push("second"));

        list.invoke(&());
        list.invoke(&());
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "second"]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn subscription_outlives_list() {
        let list = EventList::<()>::new();
        let mut sub = list.subscribe(|_| {});
        assert!(sub.is_subscribed());
        drop(list);
        assert!(!sub.is_subscribed());
        sub.unsubscribe();
        sub.unsubscribe();
    }
}
