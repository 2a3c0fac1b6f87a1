// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
CPU shadows of constant buffers, addressed by variable name.

When a pipeline state asks for variable reflection, each stage gets a [`VariableRange`]: one
byte shadow per reflected constant buffer, plus a map from variable name to its byte span.
Writing a variable marks its buffer dirty; [`VariableRange::upload`] pushes dirty buffers
to the backend and clears the flag.
*/

use rustc_hash::FxHashMap;

use crate::bindings::error::BindingError;
use crate::bindings::parameter::ShaderStage;
use crate::imp::BindContext;
use crate::reflection::ReflectedConstantBuffer;

#[derive(Debug, Clone)]
struct Shadow {
    slot: u32,
    bytes: Box<[u8]>,
    dirty: bool,
}

#[derive(Debug, Clone, Copy)]
struct Location {
    buffer: usize,
    offset: usize,
    size: usize,
}

#[derive(Debug, Clone)]
pub struct VariableRange {
    stage: ShaderStage,
    buffers: Vec<Shadow>,
    variables: FxHashMap<Box<str>, Location>,
}

impl VariableRange {
    pub fn empty(stage: ShaderStage) -> Self {
        VariableRange {
            stage,
            buffers: Vec::new(),
            variables: FxHashMap::default(),
        }
    }

    pub fn new(stage: ShaderStage, constant_buffers: &[ReflectedConstantBuffer]) -> Self {
        let mut range = Self::empty(stage);
        for (buffer, reflected) in constant_buffers.iter().enumerate() {
            range.buffers.push(Shadow {
                slot: reflected.slot,
                bytes: vec![0u8; reflected.size as usize].into_boxed_slice(),
                dirty: false,
            });
            for variable in &reflected.variables {
                let offset = variable.offset as usize;
                let size = variable.size as usize;
                if offset + size > reflected.size as usize {
                    logwise::warn_sync!(
                        "variable {name} overruns constant buffer {buffer}; ignoring it",
                        name = logwise::privacy::LogIt(&variable.name),
                        buffer = logwise::privacy::LogIt(&reflected.name)
                    );
                    continue;
                }
                range.variables.insert(
                    variable.name.as_str().into(),
                    Location {
                        buffer,
                        offset,
                        size,
                    },
                );
            }
        }
        range
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Size in bytes of `name`.
    pub fn variable_size(&self, name: &str) -> Option<usize> {
        self.variables.get(name).map(|l| l.size)
    }

    /**
    Writes `bytes` into the shadow of `name`.

    `bytes` must match the reflected size exactly.
    */
    pub fn set_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), BindingError> {
        let location = *self
            .variables
            .get(name)
            .ok_or_else(|| BindingError::VariableNotFound {
                name: name.to_string(),
            })?;
        if location.size != bytes.len() {
            return Err(BindingError::VariableSizeMismatch {
                name: name.to_string(),
                expected: location.size,
                actual: bytes.len(),
            });
        }
        let shadow = &mut self.buffers[location.buffer];
        shadow.bytes[location.offset..location.offset + location.size].copy_from_slice(bytes);
        shadow.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.buffers.iter().any(|b| b.dirty)
    }

    /// Current shadow contents of the buffer at `slot`.
    pub fn shadow(&self, slot: u32) -> Option<&[u8]> {
        self.buffers
            .iter()
            .find(|b| b.slot == slot)
            .map(|b| &*b.bytes)
    }

    /// Pushes every dirty buffer to `ctx`.
    pub fn upload<C: BindContext + ?Sized>(&mut self, ctx: &mut C) {
        for shadow in self.buffers.iter_mut().filter(|b| b.dirty) {
            ctx.update_constant_buffer(self.stage, shadow.slot, &shadow.bytes);
            shadow.dirty = false;
        }
    }
}
