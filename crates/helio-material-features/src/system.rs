use crate::composer::{ComposerConfig, FeatureComposer};
use crate::feature_data::{LightingContext, LightingMode, PassStep};
use crate::features::FeatureRegistry;
use crate::interning::StateInterner;
use crate::material::MaterialInstance;
use crate::pass::ProcessedMaterial;
use crate::shader_cache::ShaderVariantCache;
use crate::state_hint::StateHint;

/// Material system configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSystemConfig {
    pub lighting_mode: LightingMode,
    /// Texture stages the device can bind in one pass
    pub max_texture_stages: u32,
}

impl Default for MaterialSystemConfig {
    fn default() -> Self {
        Self {
            lighting_mode: LightingMode::Forward,
            max_texture_stages: ComposerConfig::default().max_texture_stages,
        }
    }
}

/// Owns composition, shader variant ids and the state string table
///
/// Everything runs on the thread that prepares materials. The interner's
/// lifetime is tied to this object: [`MaterialSystem::shutdown`] tears it
/// down and hints built before it no longer match new ones.
pub struct MaterialSystem {
    config: MaterialSystemConfig,
    composer: FeatureComposer,
    shader_cache: ShaderVariantCache,
    interner: StateInterner,
}

impl MaterialSystem {
    pub fn new(config: MaterialSystemConfig) -> Self {
        Self::with_registry(config, FeatureRegistry::with_defaults())
    }

    pub fn with_registry(config: MaterialSystemConfig, registry: FeatureRegistry) -> Self {
        log::info!(
            "Material system: {:?} lighting, {} texture stages",
            config.lighting_mode,
            config.max_texture_stages
        );
        let composer = FeatureComposer::with_registry(
            registry,
            ComposerConfig {
                max_texture_stages: config.max_texture_stages,
            },
        );
        Self {
            config,
            composer,
            shader_cache: ShaderVariantCache::new(),
            interner: StateInterner::new(),
        }
    }

    pub fn config(&self) -> &MaterialSystemConfig {
        &self.config
    }

    pub fn lighting_mode(&self) -> LightingMode {
        self.config.lighting_mode
    }

    /// Switch lighting mode. Materials must be processed again afterwards.
    pub fn set_lighting_mode(&mut self, mode: LightingMode) {
        if self.config.lighting_mode != mode {
            log::info!("Lighting mode {:?} -> {:?}", self.config.lighting_mode, mode);
            self.config.lighting_mode = mode;
        }
    }

    pub fn composer(&self) -> &FeatureComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut FeatureComposer {
        &mut self.composer
    }

    pub fn shader_cache(&self) -> &ShaderVariantCache {
        &self.shader_cache
    }

    pub fn interner(&self) -> &StateInterner {
        &self.interner
    }

    /// Compose an instance for the forward step
    pub fn process(&mut self, instance: &MaterialInstance) -> ProcessedMaterial {
        let lighting = LightingContext::new(self.config.lighting_mode, PassStep::Forward);
        self.composer
            .compose_instance(instance, lighting, &mut self.shader_cache)
    }

    /// Compose an instance for the geometry prepass
    pub fn process_prepass(&mut self, instance: &MaterialInstance) -> ProcessedMaterial {
        let lighting = LightingContext::new(self.config.lighting_mode, PassStep::PrePass);
        self.composer
            .compose_instance(instance, lighting, &mut self.shader_cache)
    }

    pub fn state_hint(&self, material: &ProcessedMaterial, pass_num: u32) -> StateHint {
        StateHint::new(&self.interner, material, pass_num)
    }

    /// Hint for a special render bin described by literal state
    pub fn special_hint(&self, state: &str) -> StateHint {
        StateHint::from_state(&self.interner, state)
    }

    /// Drop interned state and shader variants
    pub fn shutdown(&mut self) {
        log::info!(
            "Material system shutdown: {} state strings, {} shader variants",
            self.interner.len(),
            self.shader_cache.len()
        );
        self.interner.clear();
        self.shader_cache.clear();
    }
}

impl Default for MaterialSystem {
    fn default() -> Self {
        Self::new(MaterialSystemConfig::default())
    }
}
