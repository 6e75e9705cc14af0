//! Feature tags, blend operations and capability flags

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Shading capabilities a material stage can request
    ///
    /// Each capability implies one feature (or a forward/deferred pair of
    /// features) during composition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        const DIFFUSE_COLOR = 1 << 0;
        const DIFFUSE_MAP = 1 << 1;
        const LIGHTING = 1 << 2;
        const BUMP = 1 << 3;
        const SPECULAR = 1 << 4;
        const MINNAERT = 1 << 5;
        const SUB_SURFACE = 1 << 6;
        const ALPHA_TEST = 1 << 7;
        const FOG = 1 << 8;
        const HDR_OUT = 1 << 9;
    }
}

/// Precedence group of a feature. Composition adds groups in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureGroup {
    Transform,
    BaseLighting,
    Bump,
    Specular,
    Shading,
    Output,
}

/// Closed catalog of shading features
///
/// The discriminant is the stable tag used in fingerprints.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureType {
    VertTransform = 0,
    DiffuseColor = 1,
    DiffuseMap = 2,
    RTLighting = 3,
    DeferredRTLighting = 4,
    Bump = 5,
    DeferredBump = 6,
    PixelSpecular = 7,
    DeferredPixelSpecular = 8,
    Minnaert = 9,
    DeferredMinnaert = 10,
    SubSurface = 11,
    DeferredSubSurface = 12,
    EdgeRender = 13,
    AlphaTest = 14,
    Fog = 15,
    PrePassConditioner = 16,
    HDROut = 17,
}

impl FeatureType {
    pub const ALL: [FeatureType; 18] = [
        FeatureType::VertTransform,
        FeatureType::DiffuseColor,
        FeatureType::DiffuseMap,
        FeatureType::RTLighting,
        FeatureType::DeferredRTLighting,
        FeatureType::Bump,
        FeatureType::DeferredBump,
        FeatureType::PixelSpecular,
        FeatureType::DeferredPixelSpecular,
        FeatureType::Minnaert,
        FeatureType::DeferredMinnaert,
        FeatureType::SubSurface,
        FeatureType::DeferredSubSurface,
        FeatureType::EdgeRender,
        FeatureType::AlphaTest,
        FeatureType::Fog,
        FeatureType::PrePassConditioner,
        FeatureType::HDROut,
    ];

    /// Stable small integer tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::VertTransform => "Vert Position",
            FeatureType::DiffuseColor => "Diffuse Color",
            FeatureType::DiffuseMap => "Base Texture",
            FeatureType::RTLighting => "RT Lighting",
            FeatureType::DeferredRTLighting => "Deferred RT Lighting",
            FeatureType::Bump => "Bumpmap",
            FeatureType::DeferredBump => "Bumpmap [Deferred]",
            FeatureType::PixelSpecular => "Pixel Specular",
            FeatureType::DeferredPixelSpecular => "Pixel Specular [Deferred]",
            FeatureType::Minnaert => "Minnaert Shading",
            FeatureType::DeferredMinnaert => "Minnaert Shading [Deferred]",
            FeatureType::SubSurface => "Sub-Surface Approximation",
            FeatureType::DeferredSubSurface => "Sub-Surface Approximation [Deferred]",
            FeatureType::EdgeRender => "Edge Render",
            FeatureType::AlphaTest => "Alpha Test",
            FeatureType::Fog => "Fog",
            FeatureType::PrePassConditioner => "GBuffer Conditioner",
            FeatureType::HDROut => "HDR Output",
        }
    }

    pub fn group(self) -> FeatureGroup {
        match self {
            FeatureType::VertTransform => FeatureGroup::Transform,
            FeatureType::DiffuseColor
            | FeatureType::DiffuseMap
            | FeatureType::RTLighting
            | FeatureType::DeferredRTLighting => FeatureGroup::BaseLighting,
            FeatureType::Bump | FeatureType::DeferredBump => FeatureGroup::Bump,
            FeatureType::PixelSpecular | FeatureType::DeferredPixelSpecular => {
                FeatureGroup::Specular
            }
            FeatureType::Minnaert
            | FeatureType::DeferredMinnaert
            | FeatureType::SubSurface
            | FeatureType::DeferredSubSurface
            | FeatureType::EdgeRender => FeatureGroup::Shading,
            FeatureType::AlphaTest
            | FeatureType::Fog
            | FeatureType::PrePassConditioner
            | FeatureType::HDROut => FeatureGroup::Output,
        }
    }

    /// The deferred feature that replaces this one in the deferred forward step
    pub fn deferred_variant(self) -> Option<FeatureType> {
        match self {
            FeatureType::RTLighting => Some(FeatureType::DeferredRTLighting),
            FeatureType::Bump => Some(FeatureType::DeferredBump),
            FeatureType::PixelSpecular => Some(FeatureType::DeferredPixelSpecular),
            FeatureType::Minnaert => Some(FeatureType::DeferredMinnaert),
            FeatureType::SubSurface => Some(FeatureType::DeferredSubSurface),
            _ => None,
        }
    }

    /// The forward feature this one stands in for, if it is a deferred variant
    pub fn replaces(self) -> Option<FeatureType> {
        match self {
            FeatureType::DeferredRTLighting => Some(FeatureType::RTLighting),
            FeatureType::DeferredBump => Some(FeatureType::Bump),
            FeatureType::DeferredPixelSpecular => Some(FeatureType::PixelSpecular),
            FeatureType::DeferredMinnaert => Some(FeatureType::Minnaert),
            FeatureType::DeferredSubSurface => Some(FeatureType::SubSurface),
            _ => None,
        }
    }

    pub fn is_deferred(self) -> bool {
        self.replaces().is_some()
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output blend operation a feature requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    None,
    Mul,
    Add,
    AddAlpha,
    Sub,
    LerpAlpha,
}

impl BlendOp {
    /// `None` is the default op and never conflicts with anything
    pub fn is_default(self) -> bool {
        self == BlendOp::None
    }

    pub fn name(self) -> &'static str {
        match self {
            BlendOp::None => "None",
            BlendOp::Mul => "Mul",
            BlendOp::Add => "Add",
            BlendOp::AddAlpha => "AddAlpha",
            BlendOp::Sub => "Sub",
            BlendOp::LerpAlpha => "LerpAlpha",
        }
    }

    /// Color target blend state for pipeline creation. `None` means replace.
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        let component = |src_factor, dst_factor, operation| wgpu::BlendComponent {
            src_factor,
            dst_factor,
            operation,
        };

        match self {
            BlendOp::None => None,
            BlendOp::LerpAlpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendOp::Add => {
                let c = component(
                    wgpu::BlendFactor::One,
                    wgpu::BlendFactor::One,
                    wgpu::BlendOperation::Add,
                );
                Some(wgpu::BlendState { color: c, alpha: c })
            }
            BlendOp::AddAlpha => Some(wgpu::BlendState {
                color: component(
                    wgpu::BlendFactor::SrcAlpha,
                    wgpu::BlendFactor::One,
                    wgpu::BlendOperation::Add,
                ),
                alpha: component(
                    wgpu::BlendFactor::One,
                    wgpu::BlendFactor::One,
                    wgpu::BlendOperation::Add,
                ),
            }),
            BlendOp::Mul => {
                let c = component(
                    wgpu::BlendFactor::Dst,
                    wgpu::BlendFactor::Zero,
                    wgpu::BlendOperation::Add,
                );
                Some(wgpu::BlendState { color: c, alpha: c })
            }
            BlendOp::Sub => {
                let c = component(
                    wgpu::BlendFactor::One,
                    wgpu::BlendFactor::One,
                    wgpu::BlendOperation::ReverseSubtract,
                );
                Some(wgpu::BlendState { color: c, alpha: c })
            }
        }
    }
}

/// Texture stages and interpolator registers a feature consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resources {
    /// Texture stages bound by `set_tex_data`
    pub num_tex: u32,
    /// Vertex-to-pixel texcoord registers
    pub num_tex_reg: u32,
}

impl Resources {
    pub fn new(num_tex: u32, num_tex_reg: u32) -> Self {
        Self { num_tex, num_tex_reg }
    }
}

impl std::ops::AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        self.num_tex += rhs.num_tex;
        self.num_tex_reg += rhs.num_tex_reg;
    }
}
