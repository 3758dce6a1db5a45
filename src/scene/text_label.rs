use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 节点标签相对节点位置的径向放大倍数
pub const LABEL_RADIAL_SCALE: f32 = 1.2;

/// A camera-facing label attached to exactly one node.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TextLabel {
    pub content: String,
    pub font_size: f32,
    pub position: [f32; 3],
}

impl TextLabel {
    pub fn for_node(content: impl Into<String>, node_position: Vec3) -> Self {
        Self {
            content: content.into(),
            font_size: 18.0,
            position: [
                node_position.x * LABEL_RADIAL_SCALE,
                node_position.y * LABEL_RADIAL_SCALE,
                node_position.z,
            ],
        }
    }

    /// 标签深度跟随节点
    pub fn follow_depth(&mut self, node_z: f32) {
        self.position[2] = node_z;
    }

    pub fn world_position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}
