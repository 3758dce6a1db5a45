use std::f32::consts::TAU;
use std::time::Duration;

use bevy_color::{Color, ColorToComponents, LinearRgba};
use glam::{Mat4, Vec3};
use instant::Instant;

use crate::animation::{Easing, TweenSlot};
use crate::models::NodeInstance;
use super::panel::{PanelKey, PanelRegistry};
use super::text_label::TextLabel;

pub const NODE_RADIUS: f32 = 0.8;
pub const HOVER_SCALE: f32 = 1.4;
pub const HOVER_GLOW: f32 = 0.6;
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(300);
/// 上下浮动的振幅和角速度
pub const BOB_AMPLITUDE: f32 = 4.0;
pub const BOB_SPEED: f32 = 0.6;
pub const BOB_PHASE_STEP: f32 = 0.5;

/// Angle of node `index` out of `count`, evenly spaced around the circle.
pub fn node_angle(index: usize, count: usize) -> f32 {
    if count == 0 {
        return 0.0;
    }
    index as f32 / count as f32 * TAU
}

/// Rest position (z = 0) of node `index` on a circle of `radius` in the XY plane.
pub fn node_position(index: usize, count: usize, radius: f32) -> Vec3 {
    let angle = node_angle(index, count);
    Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
}

/// 节点 index 在 elapsed 秒时的深度
pub fn bob_depth(elapsed_secs: f32, index: usize) -> f32 {
    (elapsed_secs * BOB_SPEED + index as f32 * BOB_PHASE_STEP).sin() * BOB_AMPLITUDE
}

#[derive(Debug)]
pub struct Node {
    pub key: PanelKey,
    pub index: usize,
    pub position: Vec3,
    pub label: TextLabel,
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    scale: TweenSlot<f32>,
    glow: TweenSlot<f32>,
}

impl Node {
    pub fn new(key: PanelKey, index: usize, count: usize, radius: f32, title: &str) -> Self {
        let position = node_position(index, count, radius);
        let hue = node_angle(index, count).to_degrees();
        Self {
            key,
            index,
            position,
            label: TextLabel::for_node(title, position),
            color: LinearRgba::from(Color::hsl(hue, 0.6, 0.6)).to_f32_array(),
            emissive: LinearRgba::from(Color::hsl(hue, 0.6, 0.25)).to_f32_array(),
            scale: TweenSlot::new(1.0),
            glow: TweenSlot::new(0.0),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale.value()
    }

    pub fn glow(&self) -> f32 {
        self.glow.value()
    }

    /// 拾取半径随缩放变化
    pub fn pick_radius(&self) -> f32 {
        NODE_RADIUS * self.scale()
    }

    pub fn highlight(&mut self, now: Instant) {
        self.scale.start(HOVER_SCALE, HIGHLIGHT_DURATION, Easing::QuadOut, now);
        self.glow.start(HOVER_GLOW, HIGHLIGHT_DURATION, Easing::QuadOut, now);
    }

    pub fn unhighlight(&mut self, now: Instant) {
        self.scale.start(1.0, HIGHLIGHT_DURATION, Easing::QuadOut, now);
        self.glow.start(0.0, HIGHLIGHT_DURATION, Easing::QuadOut, now);
    }

    /// 每帧调用：浮动深度、标签跟随、推进高亮动画
    pub fn animate(&mut self, elapsed_secs: f32, now: Instant) {
        self.position.z = bob_depth(elapsed_secs, self.index);
        self.label.follow_depth(self.position.z);
        self.scale.advance(now);
        self.glow.advance(now);
    }

    pub fn to_instance(&self) -> NodeInstance {
        let model = Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale()));
        let [r, g, b, _] = self.emissive;
        NodeInstance {
            model: model.to_cols_array_2d(),
            color: self.color,
            emissive: [r, g, b, self.glow()],
        }
    }
}

/// 每个面板一个节点，按 PanelKey 顺序排布
pub fn build_nodes(registry: &PanelRegistry, radius: f32) -> Vec<Node> {
    let count = registry.len();
    registry
        .keys()
        .enumerate()
        .map(|(index, key)| Node::new(key, index, count, radius, registry.title(key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::resume::ResumeData;

    #[test]
    fn angles_are_evenly_spaced() {
        for count in [1usize, 3, 4, 7] {
            for i in 0..count {
                let expected = i as f32 / count as f32 * TAU;
                assert!((node_angle(i, count) - expected).abs() < 1e-6);
                let p = node_position(i, count, 12.0);
                assert!((p.truncate().length() - 12.0).abs() < 1e-4);
                assert_eq!(p.z, 0.0);
            }
        }
        assert_eq!(node_angle(0, 0), 0.0);
    }

    #[test]
    fn four_panels_sit_on_the_axes() {
        let resume = ResumeData::embedded().unwrap();
        let registry = PanelRegistry::new(&resume);
        let nodes = build_nodes(&registry, 12.0);
        let expected = [
            Vec3::new(12.0, 0.0, 0.0),
            Vec3::new(0.0, 12.0, 0.0),
            Vec3::new(-12.0, 0.0, 0.0),
            Vec3::new(0.0, -12.0, 0.0),
        ];
        for (node, want) in nodes.iter().zip(expected) {
            assert!((node.position - want).length() < 1e-4, "{:?}", node.key);
        }
        assert_eq!(nodes[1].key, PanelKey::Skills);
        assert_eq!(nodes[1].label.content, "Technical Skills");
        assert!((nodes[0].label.world_position() - Vec3::new(14.4, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn label_depth_follows_node() {
        let resume = ResumeData::embedded().unwrap();
        let registry = PanelRegistry::new(&resume);
        let mut nodes = build_nodes(&registry, 12.0);
        let now = Instant::now();
        for node in nodes.iter_mut() {
            node.animate(2.5, now);
            assert_eq!(node.label.position[2], node.position.z);
            assert!((node.position.z - bob_depth(2.5, node.index)).abs() < 1e-6);
            assert!(node.position.z.abs() <= BOB_AMPLITUDE);
        }
        // 相位错开
        assert_ne!(nodes[0].position.z, nodes[1].position.z);
    }

    #[test]
    fn highlight_eases_scale_and_glow() {
        let resume = ResumeData::embedded().unwrap();
        let registry = PanelRegistry::new(&resume);
        let mut node = build_nodes(&registry, 12.0).remove(0);
        let t0 = Instant::now();

        node.highlight(t0);
        node.animate(0.0, t0 + HIGHLIGHT_DURATION);
        assert_eq!(node.scale(), HOVER_SCALE);
        assert_eq!(node.glow(), HOVER_GLOW);
        assert!((node.pick_radius() - NODE_RADIUS * HOVER_SCALE).abs() < 1e-6);
        assert_eq!(node.to_instance().emissive[3], HOVER_GLOW);

        let t1 = t0 + HIGHLIGHT_DURATION;
        node.unhighlight(t1);
        node.animate(0.0, t1 + HIGHLIGHT_DURATION);
        assert_eq!(node.scale(), 1.0);
        assert_eq!(node.glow(), 0.0);
    }
}
