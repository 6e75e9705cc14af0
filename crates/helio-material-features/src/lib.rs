//! Helio material features - shading capability composition and state hints
//!
//! A material asks for shading capabilities (lighting, bump, specular, ...)
//! per stage. This crate turns those requests into ordered feature sets for
//! each render pass, lets attached hooks replace a stage's features outright,
//! and derives a comparable [`StateHint`] from the composed passes so the
//! renderer can batch draw calls that share GPU state.
//!
//! - [`features`] holds the closed feature catalog and the registry of
//!   feature implementations
//! - [`FeatureComposer`] builds the per-stage [`FeatureSet`]s
//! - [`MaterialInstance`] carries the requested state and any attached
//!   [`MaterialInstanceHook`]s
//! - [`StateHint`] fingerprints a [`ProcessedMaterial`] for sorting

pub mod features;
pub mod feature_set;
pub mod feature_data;
pub mod material;
pub mod hook;
pub mod composer;
pub mod pass;
pub mod shader_cache;
pub mod interning;
pub mod state_hint;

mod system;

pub use composer::{ComposerConfig, CompositionIssue, DropReason, FeatureComposer};
pub use feature_data::{FeatureData, LightingContext, LightingMode, PassStep, VertexFormat};
pub use feature_set::FeatureSet;
pub use features::{
    BlendOp, Capabilities, FeatureRegistry, FeatureType, Resources, ShaderComponents, ShaderFeature,
    ShaderMacro,
};
pub use hook::{EdgeMaterialHook, FeatureOverride, HookType, MaterialInstanceHook, OverrideContext};
pub use interning::{state_hash, InternedStr, StateInterner};
pub use material::{Material, MaterialInstance, StageDesc, StageTextures, TextureHandle};
pub use pass::{
    BoundStages, NamedTarget, NamedTargets, ProcessedMaterial, RenderPassData, TexSlot, TextureSource,
    TextureStageBinder,
};
pub use shader_cache::{ShaderId, ShaderVariantCache};
pub use state_hint::{sort_by_state_hint, state_batches, StateHint, StateSortKey};
pub use system::{MaterialSystem, MaterialSystemConfig};

/// Result type for material feature operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the material feature system
///
/// None of these abort rendering. A failed pass degrades to a minimal
/// feature set and a rejected hook leaves the existing one in place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a hook of type '{0}' is already attached to this material instance")]
    HookAlreadyAttached(HookType),

    #[error("no hook of type '{0}' is attached to this material instance")]
    HookNotFound(HookType),

    #[error("feature '{0}' has no registered implementation")]
    FeatureNotRegistered(FeatureType),

    #[error("stage {stage} is out of range for a material with {stage_count} stages")]
    InvalidStage { stage: u32, stage_count: u32 },
}
