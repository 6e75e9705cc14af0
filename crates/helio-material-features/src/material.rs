//! Materials and compiled material instances

use crate::feature_data::VertexFormat;
use crate::features::Capabilities;
use crate::hook::{FeatureOverride, HookType, MaterialInstanceHook};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Maximum number of stages a material may declare
pub const MAX_STAGES: usize = 4;

/// Opaque handle of a device texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Textures a stage provides to its features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageTextures {
    pub diffuse_map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
}

/// One stage of a material
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageDesc {
    pub capabilities: Capabilities,
    pub textures: StageTextures,
}

impl StageDesc {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            textures: StageTextures::default(),
        }
    }

    pub fn with_diffuse_map(mut self, texture: TextureHandle) -> Self {
        self.textures.diffuse_map = Some(texture);
        self.capabilities |= Capabilities::DIFFUSE_MAP;
        self
    }

    pub fn with_normal_map(mut self, texture: TextureHandle) -> Self {
        self.textures.normal_map = Some(texture);
        self.capabilities |= Capabilities::BUMP;
        self
    }
}

/// Material definition shared by every instance created from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    name: String,
    stages: Vec<StageDesc>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Append a stage. Stages past [`MAX_STAGES`] are ignored.
    pub fn with_stage(mut self, stage: StageDesc) -> Self {
        if self.stages.len() >= MAX_STAGES {
            log::warn!(
                "Material '{}' already has {} stages, ignoring extra stage",
                self.name,
                MAX_STAGES
            );
            return self;
        }
        self.stages.push(stage);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[StageDesc] {
        &self.stages
    }

    pub fn stage(&self, index: u32) -> Option<&StageDesc> {
        self.stages.get(index as usize)
    }

    pub fn stage_count(&self) -> u32 {
        self.stages.len() as u32
    }
}

/// A compiled instance of a material
///
/// Holds the instance-level requested capabilities and vertex format, an
/// optional bound stage override, and the hooks attached to it. Dropping the
/// instance drops its hooks and whatever secondary instances they own.
pub struct MaterialInstance {
    material: Arc<Material>,
    requested: Capabilities,
    vertex_format: VertexFormat,
    features_delegate: Option<FeatureOverride>,
    hooks: Vec<Box<dyn MaterialInstanceHook>>,
}

impl MaterialInstance {
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            material,
            requested: Capabilities::empty(),
            vertex_format: VertexFormat::default(),
            features_delegate: None,
            hooks: Vec::new(),
        }
    }

    /// Set the instance-level requested capabilities and vertex format
    ///
    /// `requested` is merged into every stage that declares at least one
    /// capability of its own.
    pub fn init(&mut self, requested: Capabilities, vertex_format: VertexFormat) {
        self.requested = requested;
        self.vertex_format = vertex_format;
        log::debug!(
            "Initialized instance of '{}' (requested {:?}, vertex format {:?})",
            self.material.name(),
            requested,
            vertex_format
        );
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn requested_features(&self) -> Capabilities {
        self.requested
    }

    pub fn vertex_format(&self) -> VertexFormat {
        self.vertex_format
    }

    pub fn stage_count(&self) -> u32 {
        self.material.stage_count()
    }

    /// Capabilities composition sees for a stage
    pub fn stage_capabilities(&self, stage: u32) -> Result<Capabilities> {
        let desc = self.material.stage(stage).ok_or(Error::InvalidStage {
            stage,
            stage_count: self.stage_count(),
        })?;
        if desc.capabilities.is_empty() {
            Ok(Capabilities::empty())
        } else {
            Ok(desc.capabilities | self.requested)
        }
    }

    /// Bind the stage override this instance composes with
    pub fn bind_features_delegate(&mut self, delegate: FeatureOverride) {
        self.features_delegate = Some(delegate);
    }

    pub fn clear_features_delegate(&mut self) {
        self.features_delegate = None;
    }

    pub fn features_delegate(&self) -> Option<&FeatureOverride> {
        self.features_delegate.as_ref()
    }

    /// Override composition consults: the bound delegate, else the first
    /// attached hook that supplies one
    pub fn stage_override(&self) -> Option<FeatureOverride> {
        self.features_delegate
            .clone()
            .or_else(|| self.hooks.iter().find_map(|hook| hook.stage_override()))
    }

    /// Attach a hook. A second hook of the same type is rejected and the
    /// existing one is left in place.
    pub fn attach_hook(&mut self, hook: Box<dyn MaterialInstanceHook>) -> Result<()> {
        let ty = hook.hook_type();
        if self.hook(ty).is_some() {
            log::warn!(
                "Rejected second '{}' hook on instance of '{}'",
                ty,
                self.material.name()
            );
            return Err(Error::HookAlreadyAttached(ty));
        }
        log::debug!("Attached '{}' hook to instance of '{}'", ty, self.material.name());
        self.hooks.push(hook);
        Ok(())
    }

    pub fn hook(&self, ty: HookType) -> Option<&dyn MaterialInstanceHook> {
        self.hooks
            .iter()
            .find(|hook| hook.hook_type() == ty)
            .map(|hook| &**hook)
    }

    /// Detach and return a hook
    pub fn detach_hook(&mut self, ty: HookType) -> Result<Box<dyn MaterialInstanceHook>> {
        let index = self
            .hooks
            .iter()
            .position(|hook| hook.hook_type() == ty)
            .ok_or(Error::HookNotFound(ty))?;
        log::debug!("Detached '{}' hook from instance of '{}'", ty, self.material.name());
        Ok(self.hooks.remove(index))
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl fmt::Debug for MaterialInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialInstance")
            .field("material", &self.material.name())
            .field("requested", &self.requested)
            .field("vertex_format", &self.vertex_format)
            .field("has_delegate", &self.features_delegate.is_some())
            .field(
                "hooks",
                &self.hooks.iter().map(|h| h.hook_type()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
