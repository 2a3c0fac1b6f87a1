// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

use crate::bindings::parameter::{ParameterCategory, ShaderStage};

/// Errors surfaced by the strict binding API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("no {category} parameter named {name:?} on {}", stage.map_or("any stage".to_string(), |s| format!("the {s} stage")))]
    NameNotFound {
        name: String,
        category: ParameterCategory,
        /// `None` when the lookup was broadcast across every stage.
        stage: Option<ShaderStage>,
    },
    #[error("{stage} stage is not part of a {pipeline} pipeline")]
    StageMismatch {
        stage: ShaderStage,
        pipeline: &'static str,
    },
    #[error("reflection failed on every present stage ({} failed)", failed.len())]
    NoUsableStages { failed: Vec<ShaderStage> },
    #[error("no constant-buffer variable named {name:?}")]
    VariableNotFound { name: String },
    #[error("variable {name:?} is {expected} bytes, got {actual}")]
    VariableSizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}
