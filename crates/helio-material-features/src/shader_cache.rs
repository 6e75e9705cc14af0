//! Shader variant identities
//!
//! Composed passes that would generate the same shader share one [`ShaderId`].
//! The id is what the state hint puts in the high half of its sort key.

use crate::pass::RenderPassData;
use rustc_hash::FxHashMap;
use std::fmt::{self, Write as _};

/// Identity of a generated shader variant. `ShaderId(0)` is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShaderId(pub u32);

impl ShaderId {
    pub const NONE: ShaderId = ShaderId(0);
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shader#{}", self.0)
    }
}

/// Maps the generation inputs of a composed material to a variant id
pub struct ShaderVariantCache {
    variants: FxHashMap<String, ShaderId>,
    next_id: u32,
}

impl ShaderVariantCache {
    pub fn new() -> Self {
        Self {
            variants: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Text shader generation depends on: features and macros of every pass
    pub fn variant_key(passes: &[RenderPassData]) -> String {
        let mut key = String::new();
        for pass in passes {
            let _ = write!(key, "{}", pass.features);
            for m in &pass.macros {
                let _ = write!(key, " {}", m);
            }
            key.push('|');
        }
        key
    }

    /// Get or assign the variant id for these passes
    pub fn variant_for(&mut self, passes: &[RenderPassData]) -> ShaderId {
        let key = Self::variant_key(passes);

        if let Some(&id) = self.variants.get(&key) {
            log::trace!("Using cached shader variant {}: {}", id, key);
            return id;
        }

        let id = ShaderId(self.next_id);
        self.next_id += 1;
        log::debug!("New shader variant {}: {}", id, key);
        self.variants.insert(key, id);
        id
    }

    pub fn get(&self, passes: &[RenderPassData]) -> Option<ShaderId> {
        self.variants.get(&Self::variant_key(passes)).copied()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Forget every variant. Ids handed out afterwards start over.
    pub fn clear(&mut self) {
        self.variants.clear();
        self.next_id = 1;
    }
}

impl Default for ShaderVariantCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureType, ShaderMacro};

    fn pass(features: &[FeatureType]) -> RenderPassData {
        RenderPassData::new(0, features.iter().copied().collect())
    }

    #[test]
    fn identical_passes_share_a_variant() {
        let mut cache = ShaderVariantCache::new();
        let a = cache.variant_for(&[pass(&[FeatureType::VertTransform, FeatureType::Bump])]);
        let b = cache.variant_for(&[pass(&[FeatureType::VertTransform, FeatureType::Bump])]);
        let c = cache.variant_for(&[pass(&[FeatureType::VertTransform])]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ShaderId::NONE);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn macros_are_part_of_the_variant() {
        let mut cache = ShaderVariantCache::new();
        let plain = pass(&[FeatureType::VertTransform]);
        let mut with_macro = plain.clone();
        with_macro.macros.push(ShaderMacro::flag("HDR_OUTPUT"));

        assert_ne!(cache.variant_for(&[plain]), cache.variant_for(&[with_macro]));
    }

    #[test]
    fn clear_restarts_ids() {
        let mut cache = ShaderVariantCache::new();
        let first = cache.variant_for(&[pass(&[FeatureType::VertTransform])]);
        cache.variant_for(&[pass(&[FeatureType::Fog])]);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.variant_for(&[pass(&[FeatureType::Fog])]), first);
    }
}
