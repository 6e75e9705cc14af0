//! Material instance hooks and stage overrides
//!
//! A hook is attached to a material instance under a type key. Hooks that
//! supply a stage override take over composition of that instance: the
//! override receives the implied features and leaves behind the final set.
//! It replaces, it does not merge.

use crate::feature_data::FeatureData;
use crate::feature_set::FeatureSet;
use crate::features::FeatureType;
use crate::material::{Material, MaterialInstance};
use std::fmt;
use std::sync::Arc;

/// Key identifying a kind of hook. At most one hook per key per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookType(&'static str);

impl HookType {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What a stage override gets to look at
pub struct OverrideContext<'a> {
    pub material: &'a Material,
    pub stage: u32,
    /// Features composition implied before the override ran
    pub base_features: &'a FeatureSet,
}

/// Stage override strategy. Rewrites `fd`'s feature set in place.
pub type FeatureOverride = Arc<dyn Fn(&OverrideContext<'_>, &mut FeatureData) + Send + Sync>;

/// A pluggable extension owned by one material instance
pub trait MaterialInstanceHook: Send + Sync {
    fn hook_type(&self) -> HookType;

    /// Instance the renderer should draw with for this hook's pass
    fn mat_instance(&self) -> &MaterialInstance;

    fn mat_instance_mut(&mut self) -> &mut MaterialInstance;

    /// Override applied when composing the instance this hook is attached to
    fn stage_override(&self) -> Option<FeatureOverride> {
        None
    }
}

/// Renders a material's silhouette edges with a minimal feature set
///
/// Owns a secondary instance of the same material with the edge override
/// bound, initialized with the source instance's requested capabilities and
/// vertex format so both stay shader compatible.
pub struct EdgeMaterialHook {
    edge_instance: MaterialInstance,
}

impl EdgeMaterialHook {
    pub const TYPE: HookType = HookType::new("EdgeMat");

    pub fn new(source: &MaterialInstance) -> Self {
        let mut edge_instance = MaterialInstance::new(source.material().clone());
        edge_instance.bind_features_delegate(Self::override_features());
        edge_instance.init(source.requested_features(), source.vertex_format());
        Self { edge_instance }
    }

    /// Strip everything but edge rendering. Only stage 0 draws.
    pub fn override_features() -> FeatureOverride {
        Arc::new(edge_override)
    }
}

fn edge_override(ctx: &OverrideContext<'_>, fd: &mut FeatureData) {
    let features = fd.features_mut();
    features.clear();

    if ctx.stage == 0 {
        features.add(FeatureType::VertTransform);
        features.add(FeatureType::EdgeRender);
        features.add(FeatureType::HDROut);
    }
}

impl MaterialInstanceHook for EdgeMaterialHook {
    fn hook_type(&self) -> HookType {
        Self::TYPE
    }

    fn mat_instance(&self) -> &MaterialInstance {
        &self.edge_instance
    }

    fn mat_instance_mut(&mut self) -> &mut MaterialInstance {
        &mut self.edge_instance
    }

    fn stage_override(&self) -> Option<FeatureOverride> {
        Some(Self::override_features())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_data::{LightingContext, VertexFormat};
    use crate::features::Capabilities;
    use crate::material::StageDesc;
    use crate::Error;

    fn instance() -> MaterialInstance {
        let material = Arc::new(
            Material::new("hull")
                .with_stage(StageDesc::new(Capabilities::LIGHTING | Capabilities::SPECULAR)),
        );
        let mut inst = MaterialInstance::new(material);
        inst.init(Capabilities::FOG, VertexFormat::all());
        inst
    }

    #[test]
    fn edge_hook_copies_source_state() {
        let source = instance();
        let hook = EdgeMaterialHook::new(&source);
        let edge = hook.mat_instance();

        assert!(Arc::ptr_eq(edge.material(), source.material()));
        assert_eq!(edge.requested_features(), Capabilities::FOG);
        assert_eq!(edge.vertex_format(), VertexFormat::all());
        assert!(edge.features_delegate().is_some());
    }

    #[test]
    fn edge_override_replaces_stage_zero_and_empties_the_rest() {
        let material = Material::new("m");
        let base: FeatureSet = [FeatureType::VertTransform, FeatureType::RTLighting, FeatureType::Fog]
            .into_iter()
            .collect();
        let apply = EdgeMaterialHook::override_features();

        for stage in 0..3 {
            let mut fd = FeatureData::new(base.clone(), stage, LightingContext::forward(), VertexFormat::all());
            let ctx = OverrideContext {
                material: &material,
                stage,
                base_features: &base,
            };
            apply(&ctx, &mut fd);

            if stage == 0 {
                assert_eq!(
                    fd.features().as_slice(),
                    &[FeatureType::VertTransform, FeatureType::EdgeRender, FeatureType::HDROut]
                );
            } else {
                assert!(fd.features().is_empty());
            }
        }
    }

    #[test]
    fn second_hook_of_same_type_is_rejected() {
        let mut inst = instance();
        inst.attach_hook(Box::new(EdgeMaterialHook::new(&inst))).unwrap();
        let second = Box::new(EdgeMaterialHook::new(&inst));

        let err = inst.attach_hook(second).unwrap_err();
        assert!(matches!(err, Error::HookAlreadyAttached(ty) if ty == EdgeMaterialHook::TYPE));
        assert_eq!(inst.hook_count(), 1);
        assert!(inst.hook(EdgeMaterialHook::TYPE).is_some());
    }

    #[test]
    fn dropping_the_owner_releases_the_secondary_instance() {
        let inst = {
            let mut inst = instance();
            inst.attach_hook(Box::new(EdgeMaterialHook::new(&inst))).unwrap();
            inst
        };
        let material = inst.material().clone();
        assert_eq!(Arc::strong_count(&material), 3);

        drop(inst);
        assert_eq!(Arc::strong_count(&material), 1);
    }
}
