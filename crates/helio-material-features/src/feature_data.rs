//! Per-pass snapshot handed to every feature query

use crate::feature_set::FeatureSet;
use crate::features::FeatureType;
use bitflags::bitflags;

/// Forward vs. deferred shading strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightingMode {
    #[default]
    Forward,
    Deferred,
}

/// Which step of the frame a pass is composed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassStep {
    /// Geometry step that writes normals/depth for the light prepass
    PrePass,
    #[default]
    Forward,
}

/// Lighting context a composition runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightingContext {
    pub mode: LightingMode,
    pub step: PassStep,
}

impl LightingContext {
    pub fn new(mode: LightingMode, step: PassStep) -> Self {
        Self { mode, step }
    }

    pub fn forward() -> Self {
        Self::new(LightingMode::Forward, PassStep::Forward)
    }

    /// Forward step of the deferred pipeline
    pub fn deferred() -> Self {
        Self::new(LightingMode::Deferred, PassStep::Forward)
    }

    pub fn deferred_prepass() -> Self {
        Self::new(LightingMode::Deferred, PassStep::PrePass)
    }

    pub fn is_deferred(&self) -> bool {
        self.mode == LightingMode::Deferred
    }

    pub fn is_forward_pass(&self) -> bool {
        self.step == PassStep::Forward
    }

    /// Deferred variants are used only in the forward step of deferred mode
    pub fn uses_deferred_variants(&self) -> bool {
        self.is_deferred() && self.is_forward_pass()
    }
}

bitflags! {
    /// Vertex attributes available to the material's geometry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexFormat: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT = 1 << 2;
        const TEXCOORD = 1 << 3;
        const COLOR = 1 << 4;
    }
}

impl Default for VertexFormat {
    fn default() -> Self {
        VertexFormat::POSITION | VertexFormat::NORMAL | VertexFormat::TEXCOORD
    }
}

/// Resolved state for one pass composition
///
/// Features only read this. Hook overrides are the one place allowed to
/// rewrite the feature set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureData {
    features: FeatureSet,
    stage: u32,
    lighting: LightingContext,
    lighting_available: bool,
    vertex_format: VertexFormat,
}

impl FeatureData {
    pub fn new(
        features: FeatureSet,
        stage: u32,
        lighting: LightingContext,
        vertex_format: VertexFormat,
    ) -> Self {
        let lighting_available = features.has(FeatureType::RTLighting)
            || features.has(FeatureType::DeferredRTLighting);
        Self {
            features,
            stage,
            lighting,
            lighting_available,
            vertex_format,
        }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Mutable access for stage overrides
    pub fn features_mut(&mut self) -> &mut FeatureSet {
        &mut self.features
    }

    pub fn has(&self, ty: FeatureType) -> bool {
        self.features.has(ty)
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn lighting(&self) -> LightingContext {
        self.lighting
    }

    pub fn is_deferred(&self) -> bool {
        self.lighting.is_deferred()
    }

    pub fn is_forward_pass(&self) -> bool {
        self.lighting.is_forward_pass()
    }

    /// Whether a lighting feature was composed into the pass
    pub fn lighting_available(&self) -> bool {
        self.lighting_available
    }

    pub fn vertex_format(&self) -> VertexFormat {
        self.vertex_format
    }

    /// Recompute derived flags after the feature set was rewritten
    pub(crate) fn refresh(&mut self) {
        self.lighting_available = self.features.has(FeatureType::RTLighting)
            || self.features.has(FeatureType::DeferredRTLighting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_variants_only_in_deferred_forward_step() {
        assert!(LightingContext::deferred().uses_deferred_variants());
        assert!(!LightingContext::deferred_prepass().uses_deferred_variants());
        assert!(!LightingContext::forward().uses_deferred_variants());
        assert!(!LightingContext::new(LightingMode::Forward, PassStep::PrePass).uses_deferred_variants());
    }

    #[test]
    fn lighting_availability_follows_feature_set() {
        let mut fd = FeatureData::new(
            [FeatureType::VertTransform].into_iter().collect(),
            0,
            LightingContext::forward(),
            VertexFormat::default(),
        );
        assert!(!fd.lighting_available());

        fd.features_mut().add(FeatureType::RTLighting);
        fd.refresh();
        assert!(fd.lighting_available());
    }
}
