//! Render state hints and the draw sort built on them
//!
//! A [`StateHint`] fingerprints the GPU state of a processed material up to a
//! given pass. Equality is exact. [`StateSortKey`] is a lossy 32-bit key for
//! bucketing only: equal hints always have equal keys, but equal keys say
//! nothing about whether the hints are equal. The two are deliberately
//! separate types so a key can't stand in for a hint comparison.

use crate::interning::{InternedStr, StateInterner};
use crate::pass::ProcessedMaterial;
use crate::shader_cache::ShaderId;
use std::ops::Range;

/// Approximate sort key: low 16 bits of the state hash, shader id above
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateSortKey(pub u32);

/// Comparable fingerprint of composed shader and GPU state
///
/// The default hint is empty and equals only other empty hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StateHint {
    state: Option<InternedStr>,
    shader_id: ShaderId,
}

impl StateHint {
    /// Hint over passes `0..=pass_num` of a processed material
    pub fn new(interner: &StateInterner, material: &ProcessedMaterial, pass_num: u32) -> Self {
        let mut hint = Self::default();
        hint.init(interner, material, pass_num);
        hint
    }

    /// Hint from a literal state description, for special render bins
    ///
    /// Carries no shader. An empty description gives the empty hint.
    pub fn from_state(interner: &StateInterner, state: &str) -> Self {
        if state.is_empty() {
            return Self::default();
        }
        Self {
            state: Some(interner.intern(state)),
            shader_id: ShaderId::NONE,
        }
    }

    /// Recompute from passes `0..=pass_num`. A pass number past the last
    /// pass covers every pass.
    pub fn init(&mut self, interner: &StateInterner, material: &ProcessedMaterial, pass_num: u32) {
        let end = (pass_num as usize).saturating_add(1).min(material.passes.len());
        let fingerprint: String = material.passes[..end]
            .iter()
            .map(|pass| pass.describe())
            .collect();

        if fingerprint.is_empty() {
            self.clear();
            return;
        }

        self.state = Some(interner.intern(&fingerprint));
        self.shader_id = material.shader_id;
    }

    pub fn clear(&mut self) {
        self.state = None;
        self.shader_id = ShaderId::NONE;
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    pub fn shader_id(&self) -> ShaderId {
        self.shader_id
    }

    /// The interned fingerprint text, empty for the empty hint
    pub fn state(&self) -> &str {
        self.state.as_ref().map(|s| s.as_str()).unwrap_or("")
    }

    /// `(hash & 0xFFFF) | (shader_id << 16)`. Shader ids past 16 bits wrap.
    pub fn sort_key(&self) -> StateSortKey {
        let hash = self.state.as_ref().map(|s| s.hash32()).unwrap_or(0);
        StateSortKey((hash & 0xFFFF) | (self.shader_id.0 << 16))
    }
}

/// Order draws so equal hints end up adjacent
///
/// Stable sort by [`StateSortKey`], then inside each run of equal keys the
/// items are grouped by exact hint equality, keeping first-seen order.
pub fn sort_by_state_hint<T, F>(items: &mut [T], hint: F)
where
    F: Fn(&T) -> &StateHint,
{
    items.sort_by_key(|item| hint(item).sort_key());

    let mut start = 0;
    while start < items.len() {
        let key = hint(&items[start]).sort_key();
        let mut end = start + 1;
        while end < items.len() && hint(&items[end]).sort_key() == key {
            end += 1;
        }

        let mut i = start;
        while i < end {
            let mut next = i + 1;
            for j in (i + 1)..end {
                if hint(&items[j]) == hint(&items[i]) {
                    items[next..=j].rotate_right(1);
                    next += 1;
                }
            }
            i = next;
        }
        start = end;
    }
}

/// Ranges of consecutive items whose hints are exactly equal
///
/// Expects input already ordered by [`sort_by_state_hint`]. Each range can be
/// drawn without a state change.
pub fn state_batches<T, F>(items: &[T], hint: F) -> Vec<Range<usize>>
where
    F: Fn(&T) -> &StateHint,
{
    let mut batches = Vec::new();
    let mut start = 0;
    for i in 1..=items.len() {
        if i == items.len() || hint(&items[i]) != hint(&items[start]) {
            batches.push(start..i);
            start = i;
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_set::FeatureSet;
    use crate::features::{BlendOp, FeatureType};
    use crate::pass::RenderPassData;

    fn material(shader: u32, passes: &[&[FeatureType]]) -> ProcessedMaterial {
        ProcessedMaterial {
            name: "test".into(),
            shader_id: ShaderId(shader),
            passes: passes
                .iter()
                .enumerate()
                .map(|(i, f)| RenderPassData::new(i as u32, f.iter().copied().collect::<FeatureSet>()))
                .collect(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn empty_hint_equals_only_empty() {
        let interner = StateInterner::new();
        let mat = material(1, &[&[FeatureType::VertTransform]]);
        let hint = StateHint::new(&interner, &mat, 0);

        assert!(StateHint::default().is_empty());
        assert_eq!(StateHint::default(), StateHint::default());
        assert_ne!(hint, StateHint::default());
        assert_eq!(StateHint::from_state(&interner, ""), StateHint::default());
    }

    #[test]
    fn equal_hints_need_equal_shader_and_state() {
        let interner = StateInterner::new();
        let passes: &[&[FeatureType]] = &[&[FeatureType::VertTransform, FeatureType::Fog]];

        let a = StateHint::new(&interner, &material(3, passes), 0);
        let b = StateHint::new(&interner, &material(3, passes), 0);
        let other_shader = StateHint::new(&interner, &material(4, passes), 0);

        assert_eq!(a, b);
        assert_eq!(a.sort_key(), b.sort_key());
        assert_ne!(a, other_shader);
        assert_eq!(a.state(), other_shader.state());
    }

    #[test]
    fn pass_number_limits_the_fingerprint() {
        let interner = StateInterner::new();
        let mat = material(1, &[&[FeatureType::VertTransform], &[FeatureType::VertTransform, FeatureType::Fog]]);

        let first = StateHint::new(&interner, &mat, 0);
        let both = StateHint::new(&interner, &mat, 1);
        let past_end = StateHint::new(&interner, &mat, 7);
        let last_possible = StateHint::new(&interner, &mat, u32::MAX);

        assert_ne!(first, both);
        assert_eq!(both, past_end);
        assert_eq!(both, last_possible);
        assert!(both.state().starts_with(first.state()));
    }

    #[test]
    fn blend_op_changes_the_fingerprint() {
        let interner = StateInterner::new();
        let plain = material(1, &[&[FeatureType::VertTransform]]);
        let mut blended = plain.clone();
        blended.passes[0].blend_op = BlendOp::Add;

        assert_ne!(
            StateHint::new(&interner, &plain, 0),
            StateHint::new(&interner, &blended, 0)
        );
    }

    #[test]
    fn sort_key_layout() {
        let interner = StateInterner::new();
        let hint = StateHint::new(&interner, &material(0x12, &[&[FeatureType::VertTransform]]), 0);
        let key = hint.sort_key().0;

        assert_eq!(key >> 16, 0x12);
        assert_eq!(key & 0xFFFF, hint.state.as_ref().map(|s| s.hash32() & 0xFFFF).unwrap_or(0));
        assert_eq!(StateHint::default().sort_key(), StateSortKey(0));
    }

    #[test]
    fn shader_ids_past_sixteen_bits_collide_without_equality() {
        let interner = StateInterner::new();
        let passes: &[&[FeatureType]] = &[&[FeatureType::VertTransform]];
        let low = StateHint::new(&interner, &material(1, passes), 0);
        let high = StateHint::new(&interner, &material(1 + (1 << 16), passes), 0);

        assert_eq!(low.sort_key(), high.sort_key());
        assert_ne!(low, high);
    }

    #[test]
    fn clear_returns_to_empty() {
        let interner = StateInterner::new();
        let mut hint = StateHint::new(&interner, &material(2, &[&[FeatureType::VertTransform]]), 0);
        hint.clear();
        assert!(hint.is_empty());
        assert_eq!(hint, StateHint::default());
        assert_eq!(hint.shader_id(), ShaderId::NONE);
    }

    #[test]
    fn colliding_keys_are_grouped_by_equality() {
        let interner = StateInterner::new();
        let passes: &[&[FeatureType]] = &[&[FeatureType::VertTransform]];
        let a = StateHint::new(&interner, &material(1, passes), 0);
        let b = StateHint::new(&interner, &material(1 + (1 << 16), passes), 0);

        // same key, interleaved
        let mut draws = vec![(0, a.clone()), (1, b.clone()), (2, a.clone()), (3, b.clone())];
        sort_by_state_hint(&mut draws, |d| &d.1);

        let order: Vec<i32> = draws.iter().map(|d| d.0).collect();
        assert_eq!(order, [0, 2, 1, 3]);
        assert_eq!(state_batches(&draws, |d| &d.1), vec![0..2, 2..4]);
    }

    #[test]
    fn batches_of_empty_input() {
        let draws: Vec<StateHint> = Vec::new();
        assert!(state_batches(&draws, |h| h).is_empty());
    }
}
