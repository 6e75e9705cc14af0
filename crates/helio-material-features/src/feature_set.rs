//! Ordered set of active features for one pass

use crate::features::FeatureType;
use std::fmt;

/// Ordered collection of feature tags
///
/// Insertion order is codegen order: macros and texture stages are assigned
/// positionally. A tag appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    features: Vec<FeatureType>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature. Returns false if it was already present.
    pub fn add(&mut self, ty: FeatureType) -> bool {
        if self.has(ty) {
            return false;
        }
        self.features.push(ty);
        true
    }

    /// Remove a feature, keeping the order of the rest
    pub fn remove(&mut self, ty: FeatureType) -> bool {
        match self.position(ty) {
            Some(index) => {
                self.features.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every tag, housekeeping ones included
    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn has(&self, ty: FeatureType) -> bool {
        self.features.contains(&ty)
    }

    pub fn position(&self, ty: FeatureType) -> Option<usize> {
        self.features.iter().position(|&f| f == ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureType> + '_ {
        self.features.iter().copied()
    }

    pub fn as_slice(&self) -> &[FeatureType] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<FeatureType> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureType>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<FeatureType> for FeatureSet {
    fn extend<I: IntoIterator<Item = FeatureType>>(&mut self, iter: I) {
        for ty in iter {
            self.add(ty);
        }
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a FeatureType;
    type IntoIter = std::slice::Iter<'a, FeatureType>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Canonical, order-preserving description used in state fingerprints
impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, ty) in self.features.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(ty.name())?;
        }
        f.write_str("]")
    }
}
