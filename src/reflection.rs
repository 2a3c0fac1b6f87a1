// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The shader reflection seam.

Reflection turns one stage's compiled binary into the parameters it declares.  The binding
engine treats binaries as opaque and asks a [`ShaderReflector`] instead.  A real reflector wraps
the platform's shader reflection API; [`TableReflector`] serves precomputed results keyed by
shader identifier, which is what offline reflection caches and tests want.

Parameters carry the raw [`ShaderInputType`] the reflector saw.  Mapping that to a
[`ParameterCategory`] happens in [`StageReflection::route`], so every reflector gets the same
rules, including the refusal of ray-tracing inputs.
*/

use std::fmt::Debug;

use rustc_hash::FxHashMap;
use wasm_safe_mutex::Mutex;

use crate::bindings::parameter::{ParameterCategory, ShaderParameter, ShaderStage};
use crate::pipeline::ShaderBlob;

/// The input kinds a reflected binding can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderInputType {
    ConstantBuffer,
    TextureBuffer,
    Texture,
    Sampler,
    Structured,
    ByteAddress,
    RwTyped,
    RwStructured,
    RwByteAddress,
    AppendStructured,
    ConsumeStructured,
    RwStructuredWithCounter,
    FeedbackTexture,
    RayTracingAccelerationStructure,
    /// Anything else, by its raw reflection code.
    Other(u32),
}

impl ShaderInputType {
    /// The category this input binds as.  `None` for inputs the binding model can't express.
    pub fn category(self) -> Option<ParameterCategory> {
        use ShaderInputType::*;
        match self {
            ConstantBuffer => Some(ParameterCategory::ConstantBuffer),
            TextureBuffer | Texture | Structured | ByteAddress => {
                Some(ParameterCategory::ShaderResource)
            }
            Sampler => Some(ParameterCategory::Sampler),
            RwTyped | RwStructured | RwByteAddress | AppendStructured | ConsumeStructured
            | RwStructuredWithCounter | FeedbackTexture => {
                Some(ParameterCategory::UnorderedAccess)
            }
            RayTracingAccelerationStructure | Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectionError {
    #[error("malformed shader binary: {reason}")]
    Malformed { reason: String },
    #[error("parameter {name:?} has unsupported input type {input_type:?}")]
    UnsupportedInputType {
        name: String,
        input_type: ShaderInputType,
    },
    #[error("parameter {name:?} is a ray-tracing acceleration structure, which can't be bound here")]
    RayTracingUnsupported { name: String },
    #[error("no reflection data for shader {identifier:?}")]
    UnknownShader { identifier: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedParameter {
    pub name: String,
    pub slot: u32,
    pub array_size: u32,
    pub input_type: ShaderInputType,
}

impl ReflectedParameter {
    pub fn new(name: &str, slot: u32, input_type: ShaderInputType) -> Self {
        ReflectedParameter {
            name: name.to_string(),
            slot,
            array_size: 1,
            input_type,
        }
    }
}

/// A named value inside a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedVariable {
    pub name: String,
    /// Byte offset within the buffer.
    pub offset: u32,
    pub size: u32,
}

/// A constant buffer's layout, reflected only when variable reflection is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedConstantBuffer {
    pub name: String,
    pub slot: u32,
    pub size: u32,
    pub variables: Vec<ReflectedVariable>,
}

/// What one stage declares, in reflection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReflection {
    pub parameters: Vec<ReflectedParameter>,
    pub constant_buffers: Vec<ReflectedConstantBuffer>,
}

/// A stage's parameters sorted into per-category lists, indexed like [`ParameterCategory::ALL`].
pub(crate) type RoutedParameters = [Vec<ShaderParameter>; 4];

/// Reflected slots at or past this are treated as a corrupt binary.
pub const SLOT_LIMIT: u32 = 1 << 16;

impl StageReflection {
    pub fn new(parameters: Vec<ReflectedParameter>) -> Self {
        StageReflection {
            parameters,
            constant_buffers: Vec::new(),
        }
    }

    pub fn with_constant_buffers(mut self, constant_buffers: Vec<ReflectedConstantBuffer>) -> Self {
        self.constant_buffers = constant_buffers;
        self
    }

    /**
    Converts reflected parameters into [`ShaderParameter`]s for `stage`, sorted by category.

    Fails on the first parameter whose input type has no category, or whose slot is at or past
    [`SLOT_LIMIT`].  The caller treats that as a failure of the whole stage.
    */
    pub(crate) fn route(&self, stage: ShaderStage) -> Result<RoutedParameters, ReflectionError> {
        let mut routed: RoutedParameters = Default::default();
        for parameter in &self.parameters {
            if parameter.slot >= SLOT_LIMIT {
                return Err(ReflectionError::Malformed {
                    reason: format!("parameter {:?} at slot {}", parameter.name, parameter.slot),
                });
            }
            let category = match parameter.input_type {
                ShaderInputType::RayTracingAccelerationStructure => {
                    return Err(ReflectionError::RayTracingUnsupported {
                        name: parameter.name.clone(),
                    });
                }
                other => other.category().ok_or_else(|| {
                    ReflectionError::UnsupportedInputType {
                        name: parameter.name.clone(),
                        input_type: other,
                    }
                })?,
            };
            routed[category.index()].push(ShaderParameter::new(
                &parameter.name,
                parameter.slot,
                parameter.array_size,
                stage,
                category,
            ));
        }
        Ok(routed)
    }
}

/// Reflects compiled shader binaries.
pub trait ShaderReflector: Send + Sync + Debug {
    /**
    Reflects `blob`, compiled for `stage`.

    Constant-buffer layouts are only required when `reflect_variables` is set.
    */
    fn reflect(
        &self,
        stage: ShaderStage,
        blob: &ShaderBlob,
        reflect_variables: bool,
    ) -> Result<StageReflection, ReflectionError>;
}

/**
Serves reflection results registered ahead of time, keyed by [`ShaderBlob::identifier`].

Safe to share between threads; registration and lookup take a short lock.
*/
pub struct TableReflector {
    entries: Mutex<FxHashMap<String, Result<StageReflection, ReflectionError>>>,
}

impl TableReflector {
    pub fn new() -> Self {
        TableReflector {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn register(&self, identifier: &str, reflection: StageReflection) {
        self.entries
            .lock_sync()
            .insert(identifier.to_string(), Ok(reflection));
    }

    /// Makes every later reflection of `identifier` fail with `error`.
    pub fn register_failure(&self, identifier: &str, error: ReflectionError) {
        self.entries
            .lock_sync()
            .insert(identifier.to_string(), Err(error));
    }

    pub fn remove(&self, identifier: &str) -> bool {
        self.entries.lock_sync().remove(identifier).is_some()
    }
}

impl Default for TableReflector {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TableReflector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableReflector")
            .field("entries", &self.entries.lock_sync().len())
            .finish()
    }
}

impl ShaderReflector for TableReflector {
    fn reflect(
        &self,
        _stage: ShaderStage,
        blob: &ShaderBlob,
        reflect_variables: bool,
    ) -> Result<StageReflection, ReflectionError> {
        let entry = self
            .entries
            .lock_sync()
            .get(blob.identifier())
            .cloned()
            .ok_or_else(|| ReflectionError::UnknownShader {
                identifier: blob.identifier().to_string(),
            })?;
        let mut reflection = entry?;
        if !reflect_variables {
            reflection.constant_buffers.clear();
        }
        Ok(reflection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn routes_by_category() {
        let reflection = StageReflection::new(vec![
            ReflectedParameter::new("albedo", 0, ShaderInputType::Texture),
            ReflectedParameter::new("frame", 0, ShaderInputType::ConstantBuffer),
            ReflectedParameter::new("linear", 1, ShaderInputType::Sampler),
            ReflectedParameter::new("particles", 2, ShaderInputType::AppendStructured),
            ReflectedParameter::new("lights", 3, ShaderInputType::Structured),
        ]);
        let routed = reflection.route(ShaderStage::Pixel).unwrap();
        let names = |category: ParameterCategory| -> Vec<&str> {
            routed[category.index()].iter().map(ShaderParameter::name).collect()
        };
        assert_eq!(names(ParameterCategory::ShaderResource), vec!["albedo", "lights"]);
        assert_eq!(names(ParameterCategory::ConstantBuffer), vec!["frame"]);
        assert_eq!(names(ParameterCategory::Sampler), vec!["linear"]);
        assert_eq!(names(ParameterCategory::UnorderedAccess), vec!["particles"]);
        assert!(routed.iter().flatten().all(|p| p.stage() == ShaderStage::Pixel));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn ray_tracing_rejected() {
        let reflection = StageReflection::new(vec![ReflectedParameter::new(
            "scene",
            0,
            ShaderInputType::RayTracingAccelerationStructure,
        )]);
        assert_eq!(
            reflection.route(ShaderStage::Pixel),
            Err(ReflectionError::RayTracingUnsupported {
                name: "scene".to_string()
            })
        );
        let unknown = StageReflection::new(vec![ReflectedParameter::new(
            "mystery",
            0,
            ShaderInputType::Other(99),
        )]);
        assert!(matches!(
            unknown.route(ShaderStage::Vertex),
            Err(ReflectionError::UnsupportedInputType { .. })
        ));
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn slot_past_limit_rejected() {
        let reflection = StageReflection::new(vec![
            ReflectedParameter::new("first", 0, ShaderInputType::Texture),
            ReflectedParameter::new("garbage", u32::MAX, ShaderInputType::Texture),
        ]);
        assert_eq!(
            reflection.route(ShaderStage::Pixel),
            Err(ReflectionError::Malformed {
                reason: "parameter \"garbage\" at slot 4294967295".to_string()
            })
        );
        let last = StageReflection::new(vec![ReflectedParameter::new(
            "last",
            SLOT_LIMIT - 1,
            ShaderInputType::Texture,
        )]);
        assert!(last.route(ShaderStage::Pixel).is_ok());
    }

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn table_lookup() {
        let table = TableReflector::new();
        let buffers = vec![ReflectedConstantBuffer {
            name: "frame".to_string(),
            slot: 0,
            size: 16,
            variables: vec![],
        }];
        table.register(
            "ps_main",
            StageReflection::new(vec![ReflectedParameter::new(
                "frame",
                0,
                ShaderInputType::ConstantBuffer,
            )])
            .with_constant_buffers(buffers),
        );
        let blob = ShaderBlob::new("ps_main", vec![0u8; 4]);
        let plain = table.reflect(ShaderStage::Pixel, &blob, false).unwrap();
        assert!(plain.constant_buffers.is_empty());
        let full = table.reflect(ShaderStage::Pixel, &blob, true).unwrap();
        assert_eq!(full.constant_buffers.len(), 1);

        let missing = ShaderBlob::new("vs_main", vec![]);
        assert!(matches!(
            table.reflect(ShaderStage::Vertex, &missing, false),
            Err(ReflectionError::UnknownShader { .. })
        ));
    }
}
