//! Composed render passes and texture stage binding

use crate::composer::CompositionIssue;
use crate::feature_set::FeatureSet;
use crate::features::{BlendOp, Resources, ShaderComponents, ShaderMacro};
use crate::material::TextureHandle;
use crate::shader_cache::ShaderId;
use std::fmt::{self, Write as _};

/// Render targets owned by the renderer rather than the material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedTarget {
    /// Light accumulation buffer written by the deferred light pass
    LightInfo,
    /// Normal/depth buffer written by the prepass
    PrePass,
}

impl NamedTarget {
    pub fn name(self) -> &'static str {
        match self {
            NamedTarget::LightInfo => "lightinfo",
            NamedTarget::PrePass => "prepass",
        }
    }
}

/// Where a texture stage gets its texture from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSource {
    Material(TextureHandle),
    Target(NamedTarget),
}

impl fmt::Display for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSource::Material(handle) => write!(f, "{}", handle),
            TextureSource::Target(target) => write!(f, "#{}", target.name()),
        }
    }
}

/// One claimed texture stage of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexSlot {
    pub index: u32,
    pub sampler: &'static str,
    pub source: TextureSource,
}

impl TexSlot {
    pub fn new(index: u32, sampler: &'static str, source: TextureSource) -> Self {
        Self {
            index,
            sampler,
            source,
        }
    }
}

/// Textures for the renderer-owned targets, if they exist this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamedTargets {
    pub light_info: Option<TextureHandle>,
    pub prepass: Option<TextureHandle>,
}

impl NamedTargets {
    pub fn resolve(&self, target: NamedTarget) -> Option<TextureHandle> {
        match target {
            NamedTarget::LightInfo => self.light_info,
            NamedTarget::PrePass => self.prepass,
        }
    }
}

/// Device side of texture binding
pub trait TextureStageBinder {
    fn bind_texture_stage(&mut self, stage_index: u32, texture: TextureHandle);
}

/// Last texture bound to each device stage
///
/// Lets consecutive passes skip rebinding a stage that already holds the
/// right texture. Invalidate it whenever the device loses its bindings.
#[derive(Debug, Clone, Default)]
pub struct BoundStages {
    stages: Vec<Option<TextureHandle>>,
}

impl BoundStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage_index: u32) -> Option<TextureHandle> {
        self.stages.get(stage_index as usize).copied().flatten()
    }

    /// Record a binding. Returns false if the stage already held `texture`.
    pub fn record(&mut self, stage_index: u32, texture: TextureHandle) -> bool {
        let index = stage_index as usize;
        if index >= self.stages.len() {
            self.stages.resize(index + 1, None);
        }
        let previous = self.stages[index].replace(texture);
        previous != Some(texture)
    }

    pub fn invalidate(&mut self) {
        self.stages.clear();
    }
}

/// Everything composition decided for one pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassData {
    pub stage: u32,
    pub features: FeatureSet,
    pub blend_op: BlendOp,
    pub resources: Resources,
    pub tex_slots: Vec<TexSlot>,
    pub macros: Vec<ShaderMacro>,
    pub components: ShaderComponents,
}

impl RenderPassData {
    pub fn new(stage: u32, features: FeatureSet) -> Self {
        Self {
            stage,
            features,
            blend_op: BlendOp::None,
            resources: Resources::default(),
            tex_slots: Vec::new(),
            macros: Vec::new(),
            components: ShaderComponents::new(),
        }
    }

    /// A pass with no features draws nothing
    pub fn is_noop(&self) -> bool {
        self.features.is_empty()
    }

    pub fn slot(&self, index: u32) -> Option<&TexSlot> {
        self.tex_slots.iter().find(|slot| slot.index == index)
    }

    /// Claim a texture stage, replacing whatever held that index
    pub fn set_slot(&mut self, slot: TexSlot) {
        match self.tex_slots.iter_mut().find(|s| s.index == slot.index) {
            Some(existing) => *existing = slot,
            None => {
                self.tex_slots.push(slot);
                self.tex_slots.sort_by_key(|s| s.index);
            }
        }
    }

    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        self.blend_op.blend_state()
    }

    /// Canonical text of the state-affecting parts of this pass
    ///
    /// Covers the features in composed order, the blend op and every texture
    /// stage. Two passes with the same description are interchangeable for
    /// batching.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}|blend={}|tex=[", self.features, self.blend_op.name());
        for (i, slot) in self.tex_slots.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}:{}={}", slot.index, slot.sampler, slot.source);
        }
        out.push_str("];");
        out
    }

    /// Bind this pass's texture stages through the device
    ///
    /// Stages whose texture is unchanged since the last bind are skipped, as
    /// are named targets the renderer has not provided. Returns the number of
    /// binder calls made.
    pub fn bind_textures<B: TextureStageBinder + ?Sized>(
        &self,
        binder: &mut B,
        targets: &NamedTargets,
        bound: &mut BoundStages,
    ) -> u32 {
        let mut calls = 0;
        for slot in &self.tex_slots {
            let texture = match slot.source {
                TextureSource::Material(handle) => handle,
                TextureSource::Target(target) => match targets.resolve(target) {
                    Some(handle) => handle,
                    None => {
                        log::warn!(
                            "Named target '{}' missing for stage {} of pass {}",
                            target.name(),
                            slot.index,
                            self.stage
                        );
                        continue;
                    }
                },
            };

            if bound.record(slot.index, texture) {
                binder.bind_texture_stage(slot.index, texture);
                calls += 1;
            } else {
                log::trace!("Stage {} already holds {}", slot.index, texture);
            }
        }
        calls
    }
}

/// Result of composing every stage of a material instance
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMaterial {
    pub name: String,
    pub shader_id: ShaderId,
    pub passes: Vec<RenderPassData>,
    /// Non-fatal problems found while composing
    pub issues: Vec<CompositionIssue>,
}

impl ProcessedMaterial {
    pub fn pass(&self, index: u32) -> Option<&RenderPassData> {
        self.passes.get(index as usize)
    }

    pub fn pass_count(&self) -> u32 {
        self.passes.len() as u32
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}
