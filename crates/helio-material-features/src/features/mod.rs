//! Shading feature catalog
//!
//! Features are the units a material stage is composed from. Each one reports
//! the resources it needs, records vertex/pixel contributions and macros for
//! the pass, declares a blend op and claims texture stages:
//!
//! 1. [`common`] - transform, base color, alpha test, fog and output features
//! 2. [`lighting`] - forward lighting terms computed inline
//! 3. [`deferred`] - variants that read the light prepass buffers instead

mod types;
mod traits;
mod registry;
pub mod common;
pub mod lighting;
pub mod deferred;

pub use types::{BlendOp, Capabilities, FeatureGroup, FeatureType, Resources};
pub use traits::{
    ShaderComponents, ShaderDefine, ShaderFeature, ShaderInjection, ShaderMacro, ShaderStage,
};
pub use registry::{FeatureRegistry, FeatureRegistryBuilder};
