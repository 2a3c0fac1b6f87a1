// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Fixed-capacity name table for one (stage, category) pair.

The table is built once from reflection output and never resized.  Capacity is exactly
the number of parameters, so it runs at 100% load: lookups use linear probing with
wraparound and give up after `capacity` probes.  The key set is small and fixed at build
time, so a probe sequence that scans the whole table is an accepted worst case.
*/

use crate::bindings::parameter::{ShaderParameter, hash_name};

#[derive(Debug, Clone)]
pub(crate) struct ParameterTable {
    buckets: Box<[Option<ShaderParameter>]>,
}

/// Where a probe ended.
enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

impl ParameterTable {
    /**
    Builds a table holding `parameters`.

    A later parameter with the same name replaces an earlier one.
    */
    pub(crate) fn build<I>(parameters: I) -> Self
    where
        I: ExactSizeIterator<Item = ShaderParameter>,
    {
        let capacity = parameters.len();
        let mut table = ParameterTable {
            buckets: vec![None; capacity].into_boxed_slice(),
        };
        for parameter in parameters {
            match table.probe(parameter.hash(), parameter.name()) {
                Probe::Found(index) | Probe::Vacant(index) => {
                    table.buckets[index] = Some(parameter);
                }
                Probe::Full => {
                    //capacity equals the parameter count, so there is always room
                    unreachable!("parameter table overflow");
                }
            }
        }
        table
    }

    fn probe(&self, hash: u32, name: &str) -> Probe {
        let capacity = self.buckets.len();
        if capacity == 0 {
            return Probe::Full;
        }
        let mut index = hash as usize % capacity;
        for _ in 0..capacity {
            match &self.buckets[index] {
                None => return Probe::Vacant(index),
                Some(entry) if entry.hash() == hash && entry.name() == name => {
                    return Probe::Found(index);
                }
                Some(_) => {}
            }
            index += 1;
            if index == capacity {
                index = 0;
            }
        }
        Probe::Full
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ShaderParameter> {
        match self.probe(hash_name(name), name) {
            Probe::Found(index) => self.buckets[index].as_ref(),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Declared parameters in bucket order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ShaderParameter> {
        self.buckets.iter().flatten()
    }

    pub(crate) fn bucket(&self, index: usize) -> Option<&ShaderParameter> {
        self.buckets.get(index).and_then(Option::as_ref)
    }
}
