//! Forward lighting terms
//!
//! These compute lighting inline in the pixel shader. In the forward step of
//! the deferred path each one is swapped for its [`super::deferred`] variant.

use super::{BlendOp, FeatureType, Resources, ShaderComponents, ShaderFeature, ShaderMacro};
use crate::feature_data::FeatureData;
use crate::material::StageTextures;
use crate::pass::{RenderPassData, TexSlot, TextureSource};

/// Per-pixel lighting from the scene's dynamic lights
pub struct RTLighting;

impl ShaderFeature for RTLighting {
    fn feature_type(&self) -> FeatureType {
        FeatureType::RTLighting
    }

    /// World normal and world position
    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(0, 2)
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(
            FeatureType::RTLighting,
            "out.world_normal = normalize((instance.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz);\n\
             out.world_position = world_pos.xyz;",
        );
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::RTLighting,
            "var normal = normalize(in.world_normal);\n\
             let lighting = compute_lighting(in.world_position, normal);\n\
             color = vec4<f32>(color.rgb * lighting.diffuse, color.a);",
        );
    }
}

/// Tangent space normal mapping
pub struct Bump;

impl ShaderFeature for Bump {
    fn feature_type(&self) -> FeatureType {
        FeatureType::Bump
    }

    /// Tangent frame takes three registers, plus a texcoord when no base
    /// texture already passes one through
    fn resources(&self, fd: &FeatureData) -> Resources {
        let mut num_tex_reg = 3;
        if !fd.has(FeatureType::DiffuseMap) {
            num_tex_reg += 1;
        }
        Resources::new(1, num_tex_reg)
    }

    fn process_vert(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        components.push_vertex(
            FeatureType::Bump,
            "out.world_tangent = (instance.transform * vec4<f32>(in.tangent.xyz, 0.0)).xyz;\n\
             out.world_bitangent = cross(out.world_normal, out.world_tangent) * in.tangent.w;",
        );
        if !fd.has(FeatureType::DiffuseMap) {
            components.push_vertex(FeatureType::Bump, "out.tex_coord = in.tex_coord;");
        }
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::Bump,
            "let tbn = mat3x3<f32>(in.world_tangent, in.world_bitangent, in.world_normal);\n\
             normal = normalize(tbn * (textureSample(bump_map, bump_sampler, in.tex_coord).xyz * 2.0 - 1.0));",
        );
    }

    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, _fd: &FeatureData) {
        macros.push(ShaderMacro::flag("USE_NORMAL_MAP"));
    }

    fn set_tex_data(
        &mut self,
        stage: &StageTextures,
        _fd: &FeatureData,
        pass: &mut RenderPassData,
        tex_index: &mut u32,
    ) {
        if let Some(texture) = stage.normal_map {
            pass.set_slot(TexSlot::new(*tex_index, "bump_map", TextureSource::Material(texture)));
        }
        *tex_index += 1;
    }
}

/// Blinn-Phong specular added on top of the lit color
pub struct PixelSpecular;

impl ShaderFeature for PixelSpecular {
    fn feature_type(&self) -> FeatureType {
        FeatureType::PixelSpecular
    }

    fn process_pix(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let code = if fd.lighting_available() {
            "color = vec4<f32>(color.rgb + lighting.specular * material.specular_color, color.a);"
        } else {
            "color = vec4<f32>(color.rgb + material.specular_color * material.specular_power, color.a);"
        };
        components.push_pixel(FeatureType::PixelSpecular, code);
    }

    fn blend_op(&self) -> BlendOp {
        BlendOp::Add
    }
}

/// Minnaert limb darkening for velvet-like surfaces
pub struct Minnaert;

impl ShaderFeature for Minnaert {
    fn feature_type(&self) -> FeatureType {
        FeatureType::Minnaert
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::Minnaert,
            "let n_dot_v = saturate(dot(normal, normalize(camera.position - in.world_position)));\n\
             color = vec4<f32>(color.rgb * pow(n_dot_v, material.minnaert_constant), color.a);",
        );
    }
}

/// Wrapped diffuse approximation of light scattering under the surface
pub struct SubSurface;

impl ShaderFeature for SubSurface {
    fn feature_type(&self) -> FeatureType {
        FeatureType::SubSurface
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::SubSurface,
            "color = vec4<f32>(color.rgb + material.sub_surface_color * sub_surface_wrap(normal), color.a);",
        );
    }
}
