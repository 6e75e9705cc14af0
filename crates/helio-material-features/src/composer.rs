//! Feature composition
//!
//! Turns requested capabilities into an ordered [`FeatureSet`] per stage and
//! builds the full [`RenderPassData`] for each stage of a material instance.
//!
//! Implied features are added in a fixed precedence order:
//!
//! ```text
//! VertTransform, DiffuseColor, DiffuseMap, RTLighting, Bump, PixelSpecular,
//! Minnaert, SubSurface, AlphaTest, Fog, PrePassConditioner, HDROut
//! ```
//!
//! The lighting terms take their deferred variant in the forward step of the
//! deferred path. The choice depends on the lighting context alone.

use crate::feature_data::{FeatureData, LightingContext, VertexFormat};
use crate::feature_set::FeatureSet;
use crate::features::{BlendOp, Capabilities, FeatureRegistry, FeatureType, Resources};
use crate::hook::OverrideContext;
use crate::material::{MaterialInstance, StageTextures};
use crate::pass::{ProcessedMaterial, RenderPassData};
use crate::shader_cache::ShaderVariantCache;

/// Composer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Texture stages the device can bind in one pass
    pub max_texture_stages: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_texture_stages: 8,
        }
    }
}

/// Why a feature was taken out of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Vertex format has no tangents
    MissingTangents,
    /// Stage has no texture for the feature to sample
    MissingTexture,
    NotRegistered,
}

/// Problem found while composing a pass
///
/// None of these stop composition. The pass is built with the best result
/// available and the issue is recorded on the [`ProcessedMaterial`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionIssue {
    #[error("stage {stage}: '{dropped_feature}' wants blend {dropped_op:?}, keeping {kept:?} from '{kept_feature}'")]
    BlendConflict {
        stage: u32,
        kept_feature: FeatureType,
        kept: BlendOp,
        dropped_feature: FeatureType,
        dropped_op: BlendOp,
    },

    #[error("stage {stage}: needs {requested} texture stages, device supports {available}")]
    ResourceExhausted {
        stage: u32,
        requested: u32,
        available: u32,
    },

    #[error("stage {stage}: dropped '{feature}' ({reason:?})")]
    FeatureDropped {
        stage: u32,
        feature: FeatureType,
        reason: DropReason,
    },
}

/// Builds feature sets and passes from requested capabilities
pub struct FeatureComposer {
    registry: FeatureRegistry,
    config: ComposerConfig,
}

impl FeatureComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self::with_registry(FeatureRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: FeatureRegistry, config: ComposerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FeatureRegistry {
        &mut self.registry
    }

    /// Features a stage's capabilities imply, in precedence order
    pub fn implied_features(caps: Capabilities, lighting: LightingContext) -> FeatureSet {
        let lighting_term = |ty: FeatureType| {
            if lighting.uses_deferred_variants() {
                ty.deferred_variant().unwrap_or(ty)
            } else {
                ty
            }
        };

        let table = [
            (Capabilities::DIFFUSE_COLOR, FeatureType::DiffuseColor),
            (Capabilities::DIFFUSE_MAP, FeatureType::DiffuseMap),
            (Capabilities::LIGHTING, lighting_term(FeatureType::RTLighting)),
            (Capabilities::BUMP, lighting_term(FeatureType::Bump)),
            (Capabilities::SPECULAR, lighting_term(FeatureType::PixelSpecular)),
            (Capabilities::MINNAERT, lighting_term(FeatureType::Minnaert)),
            (Capabilities::SUB_SURFACE, lighting_term(FeatureType::SubSurface)),
            (Capabilities::ALPHA_TEST, FeatureType::AlphaTest),
            (Capabilities::FOG, FeatureType::Fog),
        ];

        let mut implied: Vec<FeatureType> = table
            .iter()
            .filter(|(cap, _)| caps.contains(*cap))
            .map(|&(_, ty)| ty)
            .collect();

        if lighting.is_deferred() && !lighting.is_forward_pass() && !implied.is_empty() {
            implied.push(FeatureType::PrePassConditioner);
        }
        if caps.contains(Capabilities::HDR_OUT) {
            implied.push(FeatureType::HDROut);
        }

        if implied.is_empty() {
            return FeatureSet::new();
        }
        std::iter::once(FeatureType::VertTransform)
            .chain(implied)
            .collect()
    }

    /// One feature set per stage. Stages past `requested` get no features.
    pub fn compose(
        &self,
        requested: &[Capabilities],
        lighting: LightingContext,
        stage_count: u32,
    ) -> Vec<FeatureSet> {
        (0..stage_count)
            .map(|stage| {
                let caps = requested.get(stage as usize).copied().unwrap_or_default();
                Self::implied_features(caps, lighting)
            })
            .collect()
    }

    /// Compose every stage of an instance into a processed material
    ///
    /// A bound delegate or attached hook override replaces the implied set
    /// for each stage and skips the texture and vertex format checks. Every
    /// stage yields a pass, empty ones included.
    pub fn compose_instance(
        &mut self,
        instance: &MaterialInstance,
        lighting: LightingContext,
        shader_cache: &mut ShaderVariantCache,
    ) -> ProcessedMaterial {
        let material = instance.material();
        let stage_override = instance.stage_override();
        let mut passes = Vec::with_capacity(instance.stage_count() as usize);
        let mut issues = Vec::new();

        for (stage, desc) in (0u32..).zip(material.stages()) {
            let caps = instance.stage_capabilities(stage).unwrap_or_default();
            let base = Self::implied_features(caps, lighting);
            let mut fd = FeatureData::new(base.clone(), stage, lighting, instance.vertex_format());

            match &stage_override {
                Some(apply) => {
                    let ctx = OverrideContext {
                        material,
                        stage,
                        base_features: &base,
                    };
                    apply(&ctx, &mut fd);
                    fd.refresh();
                    log::debug!(
                        "'{}' stage {}: override replaced {} with {}",
                        material.name(),
                        stage,
                        base,
                        fd.features()
                    );
                }
                None => Self::gate_features(&mut fd, &desc.textures, &mut issues),
            }

            passes.push(self.build_pass(fd, &desc.textures, &mut issues));
        }

        let shader_id = shader_cache.variant_for(&passes);
        log::debug!(
            "Composed '{}' into {} passes ({}, {} issues)",
            material.name(),
            passes.len(),
            shader_id,
            issues.len()
        );

        ProcessedMaterial {
            name: material.name().to_string(),
            shader_id,
            passes,
            issues,
        }
    }

    /// Drop features the geometry or stage textures can't support
    fn gate_features(fd: &mut FeatureData, textures: &StageTextures, issues: &mut Vec<CompositionIssue>) {
        let stage = fd.stage();
        let mut drops = Vec::new();

        if fd.has(FeatureType::Bump) {
            if !fd.vertex_format().contains(VertexFormat::TANGENT) {
                drops.push((FeatureType::Bump, DropReason::MissingTangents));
            } else if textures.normal_map.is_none() {
                drops.push((FeatureType::Bump, DropReason::MissingTexture));
            }
        }
        if fd.has(FeatureType::DiffuseMap) && textures.diffuse_map.is_none() {
            drops.push((FeatureType::DiffuseMap, DropReason::MissingTexture));
        }

        for (feature, reason) in drops {
            log::warn!("Stage {}: dropping '{}' ({:?})", stage, feature, reason);
            fd.features_mut().remove(feature);
            issues.push(CompositionIssue::FeatureDropped {
                stage,
                feature,
                reason,
            });
        }
        fd.refresh();
    }

    fn total_resources(&self, fd: &FeatureData) -> Resources {
        let mut total = Resources::default();
        for ty in fd.features().iter() {
            if let Ok(feature) = self.registry.get(ty) {
                total += feature.resources(fd);
            }
        }
        total
    }

    fn build_pass(
        &mut self,
        mut fd: FeatureData,
        textures: &StageTextures,
        issues: &mut Vec<CompositionIssue>,
    ) -> RenderPassData {
        let stage = fd.stage();

        let unregistered: Vec<FeatureType> = fd
            .features()
            .iter()
            .filter(|ty| !self.registry.is_registered(*ty))
            .collect();
        for feature in unregistered {
            log::warn!("Stage {}: no implementation for '{}', dropping it", stage, feature);
            fd.features_mut().remove(feature);
            issues.push(CompositionIssue::FeatureDropped {
                stage,
                feature,
                reason: DropReason::NotRegistered,
            });
        }
        fd.refresh();

        for ty in fd.features().iter() {
            if let Ok(feature) = self.registry.get_mut(ty) {
                feature.begin_pass();
            }
        }

        let mut resources = self.total_resources(&fd);
        if resources.num_tex > self.config.max_texture_stages {
            log::error!(
                "Stage {}: {} texture stages requested, device supports {}; falling back",
                stage,
                resources.num_tex,
                self.config.max_texture_stages
            );
            issues.push(CompositionIssue::ResourceExhausted {
                stage,
                requested: resources.num_tex,
                available: self.config.max_texture_stages,
            });

            let had_transform = fd.has(FeatureType::VertTransform);
            fd.features_mut().clear();
            if had_transform {
                fd.features_mut().add(FeatureType::VertTransform);
            }
            fd.refresh();
            resources = self.total_resources(&fd);
        }

        let mut pass = RenderPassData::new(stage, fd.features().clone());
        pass.resources = resources;
        pass.blend_op = self.resolve_blend(&fd, issues);

        let mut tex_index = 0;
        for ty in fd.features().iter() {
            if let Ok(feature) = self.registry.get_mut(ty) {
                let start = tex_index;
                feature.set_tex_data(textures, &fd, &mut pass, &mut tex_index);
                debug_assert_eq!(
                    tex_index - start,
                    feature.resources(&fd).num_tex,
                    "'{}' advanced the texture index by the wrong amount",
                    ty
                );
            }
        }

        for ty in fd.features().iter() {
            if let Ok(feature) = self.registry.get(ty) {
                feature.process_vert(&mut pass.components, &fd);
            }
        }
        for ty in fd.features().iter() {
            if let Ok(feature) = self.registry.get(ty) {
                feature.process_pix(&mut pass.components, &fd);
                feature.process_pix_macros(&mut pass.macros, &fd);
            }
        }

        pass
    }

    /// First non-default blend op wins. Later differing ops are discarded.
    fn resolve_blend(&self, fd: &FeatureData, issues: &mut Vec<CompositionIssue>) -> BlendOp {
        let mut kept: Option<(FeatureType, BlendOp)> = None;

        for ty in fd.features().iter() {
            let Ok(feature) = self.registry.get(ty) else {
                continue;
            };
            let op = feature.blend_op();
            if op.is_default() {
                continue;
            }

            match kept {
                None => kept = Some((ty, op)),
                Some((kept_feature, kept_op)) if kept_op != op => {
                    log::warn!(
                        "Stage {}: '{}' wants blend {}, keeping {} from '{}'",
                        fd.stage(),
                        ty,
                        op.name(),
                        kept_op.name(),
                        kept_feature
                    );
                    issues.push(CompositionIssue::BlendConflict {
                        stage: fd.stage(),
                        kept_feature,
                        kept: kept_op,
                        dropped_feature: ty,
                        dropped_op: op,
                    });
                }
                Some(_) => {}
            }
        }

        kept.map(|(_, op)| op).unwrap_or_default()
    }
}

impl Default for FeatureComposer {
    fn default() -> Self {
        Self::new(ComposerConfig::default())
    }
}
