//! Feature trait definition
//!
//! Every entry in the feature catalog implements [`ShaderFeature`]. The
//! composer calls these hooks in a fixed order for each pass:
//!
//! 1. `begin_pass()` - reset per-pass bookkeeping
//! 2. `resources()` - texture stages and registers the feature needs
//! 3. `set_tex_data()` - claim texture stages for the pass
//! 4. `process_vert()` / `process_pix()` - record shader contributions
//! 5. `process_pix_macros()` - add preprocessor defines

use super::{BlendOp, FeatureType, Resources};
use crate::feature_data::FeatureData;
use crate::material::StageTextures;
use crate::pass::RenderPassData;
use std::fmt;

/// Shader stage a contribution belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// One recorded contribution of a feature to a shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInjection {
    pub stage: ShaderStage,
    pub feature: FeatureType,
    pub code: String,
}

/// Append-only record of what each feature contributed to a pass
///
/// Contributions are kept in the order the features were processed. There is
/// no way to remove or reorder an earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderComponents {
    vertex: Vec<ShaderInjection>,
    pixel: Vec<ShaderInjection>,
}

impl ShaderComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_vertex(&mut self, feature: FeatureType, code: impl Into<String>) {
        self.vertex.push(ShaderInjection {
            stage: ShaderStage::Vertex,
            feature,
            code: code.into(),
        });
    }

    pub fn push_pixel(&mut self, feature: FeatureType, code: impl Into<String>) {
        self.pixel.push(ShaderInjection {
            stage: ShaderStage::Pixel,
            feature,
            code: code.into(),
        });
    }

    pub fn vertex(&self) -> &[ShaderInjection] {
        &self.vertex
    }

    pub fn pixel(&self) -> &[ShaderInjection] {
        &self.pixel
    }

    pub fn is_empty(&self) -> bool {
        self.vertex.is_empty() && self.pixel.is_empty()
    }
}

/// Value of a preprocessor define
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderDefine {
    Flag,
    Bool(bool),
    U32(u32),
    F32(f32),
}

impl fmt::Display for ShaderDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderDefine::Flag => Ok(()),
            ShaderDefine::Bool(b) => write!(f, "{}", b),
            ShaderDefine::U32(u) => write!(f, "{}u", u),
            ShaderDefine::F32(v) => write!(f, "{:?}", v),
        }
    }
}

/// A named preprocessor define consumed by shader generation
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderMacro {
    pub name: String,
    pub value: ShaderDefine,
}

impl ShaderMacro {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ShaderDefine::Flag,
        }
    }

    pub fn new(name: impl Into<String>, value: ShaderDefine) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for ShaderMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            ShaderDefine::Flag => f.write_str(&self.name),
            ref value => write!(f, "{}={}", self.name, value),
        }
    }
}

/// A single shading capability
///
/// Queries take the pass's [`FeatureData`] and must not depend on anything
/// else, so repeated calls with the same data give the same answer.
pub trait ShaderFeature: Send + Sync {
    /// Catalog entry this implementation serves
    fn feature_type(&self) -> FeatureType;

    fn name(&self) -> &'static str {
        self.feature_type().name()
    }

    /// Texture stages and registers needed for this pass
    fn resources(&self, fd: &FeatureData) -> Resources {
        let _ = fd;
        Resources::default()
    }

    /// Record vertex-stage output
    fn process_vert(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let _ = (components, fd);
    }

    /// Record pixel-stage output
    fn process_pix(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let _ = (components, fd);
    }

    /// Append preprocessor defines. Most features have none.
    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, fd: &FeatureData) {
        let _ = (macros, fd);
    }

    /// Output blend operation this feature needs
    fn blend_op(&self) -> BlendOp {
        BlendOp::None
    }

    /// Claim texture stages starting at `tex_index`
    ///
    /// Must advance `tex_index` by exactly `resources(fd).num_tex`.
    fn set_tex_data(
        &mut self,
        stage: &StageTextures,
        fd: &FeatureData,
        pass: &mut RenderPassData,
        tex_index: &mut u32,
    ) {
        let _ = (stage, fd, pass, tex_index);
    }

    /// Reset any bookkeeping carried between calls within one pass
    fn begin_pass(&mut self) {}
}
