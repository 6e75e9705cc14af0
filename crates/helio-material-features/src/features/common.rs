//! Features shared by the forward and deferred paths

use super::{BlendOp, FeatureType, Resources, ShaderComponents, ShaderFeature, ShaderMacro};
use crate::feature_data::FeatureData;
use crate::material::StageTextures;
use crate::pass::{RenderPassData, TexSlot, TextureSource};

/// Object to clip space transform. Implied by every non-empty stage.
pub struct VertTransform;

impl ShaderFeature for VertTransform {
    fn feature_type(&self) -> FeatureType {
        FeatureType::VertTransform
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(
            FeatureType::VertTransform,
            "let world_pos = instance.transform * vec4<f32>(in.position, 1.0);\n\
             out.clip_position = camera.view_proj * world_pos;",
        );
    }
}

/// Constant material color
pub struct DiffuseColor;

impl ShaderFeature for DiffuseColor {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DiffuseColor
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(FeatureType::DiffuseColor, "color = material.diffuse_color;");
    }
}

/// Base texture, blended over the running color by its alpha
pub struct DiffuseMap;

impl ShaderFeature for DiffuseMap {
    fn feature_type(&self) -> FeatureType {
        FeatureType::DiffuseMap
    }

    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(1, 1)
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(FeatureType::DiffuseMap, "out.tex_coord = in.tex_coord;");
    }

    fn process_pix(&self, components: &mut ShaderComponents, fd: &FeatureData) {
        let code = if fd.has(FeatureType::DiffuseColor) {
            "color = color * textureSample(diffuse_map, diffuse_sampler, in.tex_coord);"
        } else {
            "color = textureSample(diffuse_map, diffuse_sampler, in.tex_coord);"
        };
        components.push_pixel(FeatureType::DiffuseMap, code);
    }

    fn blend_op(&self) -> BlendOp {
        BlendOp::LerpAlpha
    }

    fn set_tex_data(
        &mut self,
        stage: &StageTextures,
        _fd: &FeatureData,
        pass: &mut RenderPassData,
        tex_index: &mut u32,
    ) {
        if let Some(texture) = stage.diffuse_map {
            pass.set_slot(TexSlot::new(*tex_index, "diffuse_map", TextureSource::Material(texture)));
        }
        *tex_index += 1;
    }
}

/// Flat outline color used by the edge material hook
pub struct EdgeRender;

impl ShaderFeature for EdgeRender {
    fn feature_type(&self) -> FeatureType {
        FeatureType::EdgeRender
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(FeatureType::EdgeRender, "color = material.edge_color;");
    }
}

pub struct AlphaTest;

impl ShaderFeature for AlphaTest {
    fn feature_type(&self) -> FeatureType {
        FeatureType::AlphaTest
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::AlphaTest,
            "if (color.a < material.alpha_ref) { discard; }",
        );
    }

    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, _fd: &FeatureData) {
        macros.push(ShaderMacro::flag("ALPHA_TEST"));
    }
}

/// Distance fog. The factor is computed per vertex.
pub struct Fog;

impl ShaderFeature for Fog {
    fn feature_type(&self) -> FeatureType {
        FeatureType::Fog
    }

    fn resources(&self, _fd: &FeatureData) -> Resources {
        Resources::new(0, 1)
    }

    fn process_vert(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_vertex(
            FeatureType::Fog,
            "out.fog_factor = fog_factor(distance(camera.position, world_pos.xyz));",
        );
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(
            FeatureType::Fog,
            "color = vec4<f32>(mix(fog.color, color.rgb, in.fog_factor), color.a);",
        );
    }

    fn blend_op(&self) -> BlendOp {
        BlendOp::LerpAlpha
    }
}

/// Encode the final color for an HDR target
pub struct HdrOut;

impl ShaderFeature for HdrOut {
    fn feature_type(&self) -> FeatureType {
        FeatureType::HDROut
    }

    fn process_pix(&self, components: &mut ShaderComponents, _fd: &FeatureData) {
        components.push_pixel(FeatureType::HDROut, "color = hdr_encode(color);");
    }

    fn process_pix_macros(&self, macros: &mut Vec<ShaderMacro>, _fd: &FeatureData) {
        macros.push(ShaderMacro::flag("HDR_OUTPUT"));
    }
}
