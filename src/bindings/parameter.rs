// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Named shader parameters, as produced by reflection.

use std::fmt::Display;

/// One phase of a pipeline.
///
/// Graphics pipelines use the first five stages.  Compute pipelines have a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Compute,
}

impl ShaderStage {
    /// Stages of a graphics pipeline, in binding order.
    pub const GRAPHICS: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel,
    ];

    /// Stages of a compute pipeline.
    pub const COMPUTE: [ShaderStage; 1] = [ShaderStage::Compute];

    pub fn is_graphics(self) -> bool {
        !matches!(self, ShaderStage::Compute)
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Hull => "hull",
            ShaderStage::Domain => "domain",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Pixel => "pixel",
            ShaderStage::Compute => "compute",
        };
        f.write_str(s)
    }
}

/// The kind of resource a parameter binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterCategory {
    /// Constant buffer view
    ConstantBuffer,
    /// Shader-read view
    ShaderResource,
    /// Unordered-access view
    UnorderedAccess,
    Sampler,
}

impl ParameterCategory {
    /// Order in which categories are bound for a draw or dispatch.
    pub const ALL: [ParameterCategory; 4] = [
        ParameterCategory::UnorderedAccess,
        ParameterCategory::ShaderResource,
        ParameterCategory::ConstantBuffer,
        ParameterCategory::Sampler,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            ParameterCategory::UnorderedAccess => 0,
            ParameterCategory::ShaderResource => 1,
            ParameterCategory::ConstantBuffer => 2,
            ParameterCategory::Sampler => 3,
        }
    }
}

impl Display for ParameterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterCategory::ConstantBuffer => "CBV",
            ParameterCategory::ShaderResource => "SRV",
            ParameterCategory::UnorderedAccess => "UAV",
            ParameterCategory::Sampler => "sampler",
        };
        f.write_str(s)
    }
}

/// 32-bit FNV-1a over the bytes of `name`.
pub const fn hash_name(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash = 0x811c_9dc5_u32;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

/**
A named parameter declared by one shader stage.

Immutable once reflection produces it.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderParameter {
    name: Box<str>,
    hash: u32,
    slot: u32,
    array_size: u32,
    stage: ShaderStage,
    category: ParameterCategory,
}

impl ShaderParameter {
    pub fn new(
        name: &str,
        slot: u32,
        array_size: u32,
        stage: ShaderStage,
        category: ParameterCategory,
    ) -> Self {
        ShaderParameter {
            name: name.into(),
            hash: hash_name(name),
            slot,
            array_size,
            stage,
            category,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn hash(&self) -> u32 {
        self.hash
    }
    /// The hardware slot assigned by reflection.
    pub fn slot(&self) -> u32 {
        self.slot
    }
    pub fn array_size(&self) -> u32 {
        self.array_size
    }
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
    pub fn category(&self) -> ParameterCategory {
        self.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn fnv1a_reference_values() {
        assert_eq!(hash_name(""), 0x811c_9dc5);
        assert_eq!(hash_name("a"), 0xe40c_292c);
        assert_eq!(hash_name("foobar"), 0xbf9c_f968);
    }
}
