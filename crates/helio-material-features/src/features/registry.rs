//! Feature registry mapping catalog tags to implementations

use super::common::{AlphaTest, DiffuseColor, DiffuseMap, EdgeRender, Fog, HdrOut, VertTransform};
use super::deferred::{
    DeferredBump, DeferredMinnaert, DeferredPixelSpecular, DeferredRTLighting, DeferredSubSurface,
    PrePassConditioner,
};
use super::lighting::{Bump, Minnaert, PixelSpecular, RTLighting, SubSurface};
use super::{FeatureType, ShaderFeature};
use crate::{Error, Result};
use rustc_hash::FxHashMap;

/// Registry of feature implementations, keyed by catalog tag
pub struct FeatureRegistry {
    features: FxHashMap<FeatureType, Box<dyn ShaderFeature>>,
}

impl FeatureRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            features: FxHashMap::default(),
        }
    }

    /// Registry holding the forward catalog and the deferred lighting catalog
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_forward_features();
        registry.register_deferred_features();
        registry
    }

    /// Start an empty registry to be filled feature by feature
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder::new()
    }

    pub fn register_forward_features(&mut self) {
        self.register(Box::new(VertTransform));
        self.register(Box::new(DiffuseColor));
        self.register(Box::new(DiffuseMap));
        self.register(Box::new(RTLighting));
        self.register(Box::new(Bump));
        self.register(Box::new(PixelSpecular));
        self.register(Box::new(Minnaert));
        self.register(Box::new(SubSurface));
        self.register(Box::new(EdgeRender));
        self.register(Box::new(AlphaTest));
        self.register(Box::new(Fog));
        self.register(Box::new(HdrOut));
    }

    pub fn register_deferred_features(&mut self) {
        self.register(Box::new(PrePassConditioner));
        self.register(Box::new(DeferredRTLighting::default()));
        self.register(Box::new(DeferredBump));
        self.register(Box::new(DeferredPixelSpecular));
        self.register(Box::new(DeferredMinnaert));
        self.register(Box::new(DeferredSubSurface));
    }

    pub fn unregister_deferred_features(&mut self) {
        for ty in [
            FeatureType::PrePassConditioner,
            FeatureType::DeferredRTLighting,
            FeatureType::DeferredBump,
            FeatureType::DeferredPixelSpecular,
            FeatureType::DeferredMinnaert,
            FeatureType::DeferredSubSurface,
        ] {
            self.unregister(ty);
        }
    }

    /// Register a feature, replacing any previous implementation of its tag
    pub fn register(&mut self, feature: Box<dyn ShaderFeature>) {
        let ty = feature.feature_type();
        if self.features.insert(ty, feature).is_some() {
            log::debug!("Replaced implementation of feature '{}'", ty);
        }
    }

    pub fn unregister(&mut self, ty: FeatureType) -> Option<Box<dyn ShaderFeature>> {
        self.features.remove(&ty)
    }

    pub fn is_registered(&self, ty: FeatureType) -> bool {
        self.features.contains_key(&ty)
    }

    /// Get a feature by tag
    pub fn get(&self, ty: FeatureType) -> Result<&dyn ShaderFeature> {
        self.features
            .get(&ty)
            .map(|f| &**f)
            .ok_or(Error::FeatureNotRegistered(ty))
    }

    pub fn get_mut(&mut self, ty: FeatureType) -> Result<&mut (dyn ShaderFeature + 'static)> {
        self.features
            .get_mut(&ty)
            .map(|f| &mut **f)
            .ok_or(Error::FeatureNotRegistered(ty))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for FeatureRegistry
pub struct FeatureRegistryBuilder {
    features: Vec<Box<dyn ShaderFeature>>,
}

impl FeatureRegistryBuilder {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Register `feature` under its own tag
    pub fn with_feature(mut self, feature: impl ShaderFeature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Finish registration
    pub fn build(self) -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();

        for feature in self.features {
            registry.register(feature);
        }

        registry
    }
}

impl Default for FeatureRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
