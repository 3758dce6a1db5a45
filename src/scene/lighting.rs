use bevy_color::{ColorToComponents, LinearRgba, Srgba};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct PointLightRaw {
    pub position: [f32; 4], // xyz + 衰减距离
    pub color: [f32; 4],    // rgb + 强度
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LightingUniform {
    pub ambient: [f32; 4], // rgb + 强度
    pub lights: [PointLightRaw; 2],
    pub fog: [f32; 4], // rgb + 指数雾密度
}

fn hex(rgb: u32) -> [f32; 3] {
    let c = LinearRgba::from(Srgba::rgb_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8));
    let [r, g, b, _] = c.to_f32_array();
    [r, g, b]
}

/// 十六进制 sRGB -> 线性 RGBA
pub fn hex_linear(rgb: u32, alpha: f32) -> [f32; 4] {
    let [r, g, b] = hex(rgb);
    [r, g, b, alpha]
}

fn point_light(rgb: u32, intensity: f32, range: f32, position: Vec3) -> PointLightRaw {
    let [r, g, b] = hex(rgb);
    PointLightRaw {
        position: [position.x, position.y, position.z, range],
        color: [r, g, b, intensity],
    }
}

pub const CLEAR_COLOR: u32 = 0x05050c;
pub const FOG_COLOR: u32 = 0x050816;
pub const FOG_DENSITY: f32 = 0.01;

impl LightingUniform {
    /// 环境光 + 紫色主光 + 青色补光 + 指数雾
    pub fn portfolio() -> Self {
        let [ar, ag, ab] = hex(0x94a3b8);
        let [fr, fg, fb] = hex(FOG_COLOR);
        Self {
            ambient: [ar, ag, ab, 0.45],
            lights: [
                point_light(0x8b5cf6, 1.8, 180.0, Vec3::new(5.0, 6.0, 12.0)),
                point_light(0x22d3ee, 1.0, 120.0, Vec3::new(-6.0, -3.0, -10.0)),
            ],
            fog: [fr, fg, fb, FOG_DENSITY],
        }
    }
}

pub fn clear_color() -> wgpu::Color {
    let [r, g, b] = hex(CLEAR_COLOR);
    wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }
}
