//! Deferred lighting variants
//!
//! In the forward step of the deferred path lighting has already been
//! accumulated into the light info buffer by the light pass. These features
//! read that buffer instead of computing lighting inline. The prepass step
//! runs the forward features plus [`PrePassConditioner`].

use super::{BlendOp, FeatureType, Resources, ShaderComponents, ShaderFeature, ShaderMacro};
use crate::feature_data::FeatureData;
use crate::material::StageTextures;
use crate::pass::{NamedTarget, RenderPassData, TexSlot, TextureSource};

/// Reads accumulated lighting from the light info target
///
/// Remembers the texture stage it bound within the current pass so a repeat
/// `set_tex_data` leaves the stage alone and the pixel code samples the right
/// register.
#[derive(Debug, Default)]
pub struct DeferredRTLighting {
    last_tex_index: Option<u32>,
}

impl DeferredRTLighting {
    pub fn last_tex_index(&self) -> Option<u32> {
        self.last_tex_index
    }
}

impl ShaderFeature for DeferredRTLighting {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DeferredRTLighting
    }

    /// Light info target plus the screen position register
    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(1, 1)
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(
            FeatureType::DeferredRTLighting,
            "out.screen_pos = out.clip_position;",
        );
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        let index = self.last_tex_index.unwrap_or(0);
        components.push_pixel(
            FeatureType::DeferredRTLighting,
            format!(
                "let light = light_info_uncondition(textureLoad(light_info_{}, screen_uv(in.screen_pos), 0));\n\
                 color = vec4<f32>(color.rgb * light.diffuse, color.a);",
                index
            ),
        );
    }

    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, _fd: &FeatureData) {
        macros.push(ShaderMacro::flag("LIGHTINFO_UNCONDITION"));
    }

    fn set_tex_data(
        &mut self,
        _stage: &StageTextures,
        _fd: &FeatureData,
        pass: &mut RenderPassData,
        tex_index: &mut u32,
    ) {
        let index = *tex_index;
        let source = TextureSource::Target(NamedTarget::LightInfo);
        let already_bound = self.last_tex_index == Some(index)
            && pass.slot(index).map(|slot| slot.source) == Some(source);

        if already_bound {
            log::trace!("Light info already on stage {}", index);
        } else {
            pass.set_slot(TexSlot::new(index, "light_info", source));
        }
        self.last_tex_index = Some(index);
        *tex_index += 1;
    }

    fn begin_pass(&mut self) {
        self.last_tex_index = None;
    }
}

/// Normals were perturbed in the prepass; nothing to sample here
pub struct DeferredBump;

impl ShaderFeature for DeferredBump {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DeferredBump
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::DeferredBump,
            "// bumped normal already applied through the light info buffer",
        );
    }
}

/// Specular taken from the light info buffer
pub struct DeferredPixelSpecular;

impl ShaderFeature for DeferredPixelSpecular {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DeferredPixelSpecular
    }

    fn process_pix(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let code = if fd.lighting_available() {
            "color = vec4<f32>(color.rgb + light.specular * material.specular_color, color.a);"
        } else {
            "color = vec4<f32>(color.rgb + material.specular_color * material.specular_power, color.a);"
        };
        components.push_pixel(FeatureType::DeferredPixelSpecular, code);
    }

    fn blend_op(&self) -> BlendOp {
        BlendOp::Add
    }
}

/// Minnaert darkening using the prepass normal
pub struct DeferredMinnaert;

impl ShaderFeature for DeferredMinnaert {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DeferredMinnaert
    }

    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(1, 1)
    }

    fn process_vert(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        if !fd.has(FeatureType::DeferredRTLighting) {
            components.push_vertex(
                FeatureType::DeferredMinnaert,
                "out.screen_pos = out.clip_position;",
            );
        }
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::DeferredMinnaert,
            "let prepass = prepass_uncondition(textureLoad(prepass_buffer, screen_uv(in.screen_pos), 0));\n\
             let n_dot_v = saturate(dot(prepass.normal, normalize(camera.position - in.world_position)));\n\
             color = vec4<f32>(color.rgb * pow(n_dot_v, material.minnaert_constant), color.a);",
        );
    }

    fn set_tex_data(
        &mut self,
        _stage: &StageTextures,
        _fd: &FeatureData,
        pass: &mut RenderPassData,
        tex_index: &mut u32,
    ) {
        pass.set_slot(TexSlot::new(
            *tex_index,
            "prepass_buffer",
            TextureSource::Target(NamedTarget::PrePass),
        ));
        *tex_index += 1;
    }
}

pub struct DeferredSubSurface;

impl ShaderFeature for DeferredSubSurface {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DeferredSubSurface
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::DeferredSubSurface,
            "color = vec4<f32>(color.rgb + material.sub_surface_color * light.sub_surface, color.a);",
        );
    }
}

/// Encodes normal and depth into the prepass target
pub struct PrePassConditioner;

impl ShaderFeature for PrePassConditioner {
    fn feature_type(&self) -> FeatureType {
        FeatureType::PrePassConditioner
    }

    /// View depth
    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(0, 1)
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(
            FeatureType::PrePassConditioner,
            "out.view_depth = (camera.view * world_pos).z / camera.far_plane;",
        );
    }

    fn process_pix(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let normal = if fd.has(FeatureType::Bump) || fd.has(FeatureType::RTLighting) {
            "normal"
        } else {
            "normalize(in.world_normal)"
        };
        components.push_pixel(
            FeatureType::PrePassConditioner,
            format!("color = prepass_condition({}, in.view_depth);", normal),
        );
    }

    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, _fd: &FeatureData) {
        macros.push(ShaderMacro::flag("PREPASS_CONDITION"));
    }
}
