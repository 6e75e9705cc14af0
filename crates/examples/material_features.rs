//! Material feature composition walkthrough
//!
//! Builds a handful of materials, composes them for the forward and deferred
//! paths, attaches an edge hook to one, then sorts the resulting draws by
//! state hint and binds their textures the way a renderer would.
//!
//! Run with `RUST_LOG=debug` to see composition detail.

use helio_material_features::{
    sort_by_state_hint, state_batches, BoundStages, Capabilities, EdgeMaterialHook, LightingMode,
    Material, MaterialInstance, MaterialSystem, MaterialSystemConfig, NamedTargets, StageDesc,
    StateHint, TextureHandle, TextureStageBinder, VertexFormat,
};
use std::sync::Arc;

struct LoggingBinder {
    calls: u32,
}

impl TextureStageBinder for LoggingBinder {
    fn bind_texture_stage(&mut self, stage_index: u32, texture: TextureHandle) {
        log::debug!("bind stage {} -> {}", stage_index, texture);
        self.calls += 1;
    }
}

struct Draw {
    name: String,
    hint: StateHint,
}

fn instance(material: Material, requested: Capabilities) -> MaterialInstance {
    let mut inst = MaterialInstance::new(Arc::new(material));
    inst.init(requested, VertexFormat::all());
    inst
}

fn scene() -> Vec<MaterialInstance> {
    vec![
        instance(
            Material::new("brick").with_stage(
                StageDesc::new(Capabilities::LIGHTING | Capabilities::SPECULAR)
                    .with_diffuse_map(TextureHandle(1))
                    .with_normal_map(TextureHandle(2)),
            ),
            Capabilities::FOG,
        ),
        instance(
            Material::new("brick_dirty").with_stage(
                StageDesc::new(Capabilities::LIGHTING | Capabilities::SPECULAR)
                    .with_diffuse_map(TextureHandle(1))
                    .with_normal_map(TextureHandle(2)),
            ),
            Capabilities::FOG,
        ),
        instance(
            Material::new("velvet").with_stage(StageDesc::new(
                Capabilities::DIFFUSE_COLOR | Capabilities::LIGHTING | Capabilities::MINNAERT,
            )),
            Capabilities::HDR_OUT,
        ),
        instance(
            Material::new("skin")
                .with_stage(
                    StageDesc::new(Capabilities::LIGHTING | Capabilities::SUB_SURFACE)
                        .with_diffuse_map(TextureHandle(5)),
                )
                .with_stage(StageDesc::new(Capabilities::SPECULAR)),
            Capabilities::empty(),
        ),
    ]
}

fn run(mode: LightingMode) {
    log::info!("=== {:?} lighting ===", mode);

    let mut system = MaterialSystem::new(MaterialSystemConfig {
        lighting_mode: mode,
        ..Default::default()
    });

    let mut instances = scene();
    let hooked = &mut instances[2];
    let edge = EdgeMaterialHook::new(hooked);
    if let Err(e) = hooked.attach_hook(Box::new(edge)) {
        log::error!("{}", e);
    }

    let mut draws = Vec::new();
    let mut processed_all = Vec::new();
    for inst in &instances {
        let processed = system.process(inst);
        for pass in &processed.passes {
            log::info!(
                "{} pass {}: {} blend={} tex={}",
                processed.name,
                pass.stage,
                pass.features,
                pass.blend_op.name(),
                pass.resources.num_tex
            );
        }
        for issue in &processed.issues {
            log::warn!("{}: {}", processed.name, issue);
        }
        draws.push(Draw {
            name: processed.name.clone(),
            hint: system.state_hint(&processed, 0),
        });
        processed_all.push(processed);
    }

    if mode == LightingMode::Deferred {
        let prepass = system.process_prepass(&instances[0]);
        log::info!("brick prepass: {}", prepass.passes[0].features);
    }

    sort_by_state_hint(&mut draws, |d| &d.hint);
    for batch in state_batches(&draws, |d| &d.hint) {
        let names: Vec<&str> = draws[batch.clone()].iter().map(|d| d.name.as_str()).collect();
        log::info!("batch {:?} key={:#010x}: {:?}", batch, draws[batch.start].hint.sort_key().0, names);
    }

    let targets = NamedTargets {
        light_info: Some(TextureHandle(100)),
        prepass: Some(TextureHandle(101)),
    };
    let mut bound = BoundStages::new();
    let mut binder = LoggingBinder { calls: 0 };
    for processed in &processed_all {
        for pass in &processed.passes {
            pass.bind_textures(&mut binder, &targets, &mut bound);
        }
    }
    log::info!("{} texture binds", binder.calls);

    system.shutdown();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(LightingMode::Forward);
    run(LightingMode::Deferred);
}
