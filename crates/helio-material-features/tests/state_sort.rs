use helio_material_features::*;
use proptest::prelude::*;
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn instance(name: &str, caps: Capabilities, diffuse: Option<u32>) -> MaterialInstance {
    let mut stage = StageDesc::new(caps);
    if let Some(handle) = diffuse {
        stage = stage.with_diffuse_map(TextureHandle(handle));
    }
    let mut inst = MaterialInstance::new(Arc::new(Material::new(name).with_stage(stage)));
    inst.init(Capabilities::empty(), VertexFormat::all());
    inst
}

struct Draw {
    id: usize,
    hint: StateHint,
}

#[test]
fn draws_with_equal_state_end_up_in_one_batch() {
    init_logger();
    let mut system = MaterialSystem::default();
    let materials = [
        instance("a", Capabilities::LIGHTING, Some(1)),
        instance("b", Capabilities::LIGHTING | Capabilities::SPECULAR, None),
        instance("c", Capabilities::LIGHTING, Some(2)),
        instance("d", Capabilities::LIGHTING, Some(1)),
        instance("e", Capabilities::LIGHTING | Capabilities::SPECULAR, None),
    ];

    let mut draws: Vec<Draw> = materials
        .iter()
        .enumerate()
        .map(|(id, inst)| {
            let processed = system.process(inst);
            Draw {
                id,
                hint: system.state_hint(&processed, 0),
            }
        })
        .collect();

    sort_by_state_hint(&mut draws, |d| &d.hint);
    let batches = state_batches(&draws, |d| &d.hint);

    assert_eq!(batches.len(), 3);
    for batch in &batches {
        let first = &draws[batch.start].hint;
        assert!(draws[batch.clone()].iter().all(|d| &d.hint == first));
    }
    let batch_of = |id: usize| {
        let pos = draws.iter().position(|d| d.id == id).unwrap();
        batches.iter().position(|b| b.contains(&pos)).unwrap()
    };
    assert_eq!(batch_of(0), batch_of(3));
    assert_eq!(batch_of(1), batch_of(4));
    assert_ne!(batch_of(0), batch_of(2));
}

#[test]
fn special_hints_share_a_bin() {
    let system = MaterialSystem::default();
    let a = system.special_hint("translucent");
    let b = system.special_hint("translucent");
    let c = system.special_hint("Translucent");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.shader_id(), ShaderId::NONE);
}

fn hint_strategy() -> impl Strategy<Value = (u32, String)> {
    (0u32..4, prop::sample::select(vec!["s0", "s1", "s2", "S0"]))
        .prop_map(|(shader, state)| (shader * (1 << 16) + 1, state.to_string()))
}

fn build_hint(interner: &StateInterner, shader: u32, state: &str) -> StateHint {
    let processed = ProcessedMaterial {
        name: state.to_string(),
        shader_id: ShaderId(shader),
        passes: vec![RenderPassData::new(
            0,
            match state {
                "s0" => [FeatureType::VertTransform].into_iter().collect(),
                "s1" => [FeatureType::VertTransform, FeatureType::Fog].into_iter().collect(),
                "s2" => [FeatureType::VertTransform, FeatureType::Bump].into_iter().collect(),
                _ => [FeatureType::VertTransform, FeatureType::HDROut].into_iter().collect(),
            },
        )],
        issues: Vec::new(),
    };
    StateHint::new(interner, &processed, 0)
}

proptest! {
    #[test]
    fn equal_hints_have_equal_keys(
        inputs in prop::collection::vec(hint_strategy(), 1..24),
    ) {
        let interner = StateInterner::new();
        let hints: Vec<StateHint> = inputs
            .iter()
            .map(|(shader, state)| build_hint(&interner, *shader, state))
            .collect();

        for a in &hints {
            for b in &hints {
                if a == b {
                    prop_assert_eq!(a.sort_key(), b.sort_key());
                    prop_assert_eq!(a.shader_id(), b.shader_id());
                    prop_assert_eq!(a.state(), b.state());
                }
            }
        }
    }

    #[test]
    fn sorting_makes_equal_hints_adjacent(
        inputs in prop::collection::vec(hint_strategy(), 0..24),
    ) {
        let interner = StateInterner::new();
        let mut hints: Vec<StateHint> = inputs
            .iter()
            .map(|(shader, state)| build_hint(&interner, *shader, state))
            .collect();
        let len = hints.len();

        sort_by_state_hint(&mut hints, |h| h);
        prop_assert_eq!(hints.len(), len);
        prop_assert!(hints.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key()));

        let batches = state_batches(&hints, |h| h);
        for (i, a) in batches.iter().enumerate() {
            for b in &batches[i + 1..] {
                prop_assert_ne!(&hints[a.start], &hints[b.start]);
            }
        }
    }
}
