use glam::Vec2;

use crate::camera::Ray;
use crate::scene::node::Node;

/// 按下到松开之间超过该像素距离视为拖拽而不是点击
pub const CLICK_MAX_TRAVEL: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
}

/// Nearest node hit by `ray`, as an index into `nodes`.
pub fn pick_node(ray: &Ray, nodes: &[Node]) -> Option<usize> {
    nodes
        .iter()
        .enumerate()
        .filter_map(|(i, node)| ray.intersect_sphere(node.position, node.pick_radius()).map(|d| (i, d)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

impl HoverChange {
    pub fn cursor(&self) -> CursorStyle {
        if self.current.is_some() { CursorStyle::Pointer } else { CursorStyle::Default }
    }
}

/// Remembers which node was under the pointer last frame.
#[derive(Debug, Default)]
pub struct HoverTracker {
    intersected: Option<usize>,
}

impl HoverTracker {
    pub fn intersected(&self) -> Option<usize> {
        self.intersected
    }

    /// 只有被拾取的节点发生变化时才返回 Some
    pub fn update(&mut self, hit: Option<usize>) -> Option<HoverChange> {
        if hit == self.intersected {
            return None;
        }
        let change = HoverChange { previous: self.intersected, current: hit };
        self.intersected = hit;
        Some(change)
    }
}

/// Pointer position in screen pixels plus the press used to tell clicks from drags.
#[derive(Debug, Default)]
pub struct PointerState {
    pub position: Vec2,
    pressed_at: Option<Vec2>,
    inside: bool,
}

impl PointerState {
    pub fn moved_to(&mut self, position: Vec2) {
        self.position = position;
        self.inside = true;
    }

    /// 指针离开画布：不再拾取，也不会产生点击
    pub fn left(&mut self) {
        self.inside = false;
        self.pressed_at = None;
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    pub fn press(&mut self) {
        self.pressed_at = Some(self.position);
    }

    /// 松开鼠标；如果移动距离很小则视为一次点击
    pub fn release(&mut self) -> bool {
        match self.pressed_at.take() {
            Some(start) => start.distance(self.position) < CLICK_MAX_TRAVEL,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use crate::scene::node::build_nodes;
    use crate::scene::panel::PanelRegistry;
    use crate::scene::resume::ResumeData;

    fn nodes() -> Vec<Node> {
        let resume = ResumeData::embedded().unwrap();
        build_nodes(&PanelRegistry::new(&resume), 12.0)
    }

    #[test]
    fn ray_picks_node_it_passes_through() {
        let nodes = nodes();
        let ray = Ray { origin: Vec3::new(12.0, 0.0, 30.0), direction: Vec3::NEG_Z };
        assert_eq!(pick_node(&ray, &nodes), Some(0));
        let ray = Ray { origin: Vec3::new(0.0, -12.0, 30.0), direction: Vec3::NEG_Z };
        assert_eq!(pick_node(&ray, &nodes), Some(3));
        let ray = Ray { origin: Vec3::new(5.0, 5.0, 30.0), direction: Vec3::NEG_Z };
        assert_eq!(pick_node(&ray, &nodes), None);
    }

    #[test]
    fn nearest_hit_wins() {
        let nodes = nodes();
        // 沿 x 轴从右向左穿过 about(+x) 和 experience(-x)
        let ray = Ray { origin: Vec3::new(30.0, 0.0, 0.0), direction: Vec3::NEG_X };
        assert_eq!(pick_node(&ray, &nodes), Some(0));
        let ray = Ray { origin: Vec3::new(-30.0, 0.0, 0.0), direction: Vec3::X };
        assert_eq!(pick_node(&ray, &nodes), Some(2));
    }

    #[test]
    fn hover_reports_only_changes() {
        let mut hover = HoverTracker::default();
        assert_eq!(hover.update(None), None);

        let change = hover.update(Some(1)).unwrap();
        assert_eq!(change, HoverChange { previous: None, current: Some(1) });
        assert_eq!(change.cursor(), CursorStyle::Pointer);
        assert_eq!(hover.update(Some(1)), None);

        let change = hover.update(Some(2)).unwrap();
        assert_eq!(change.previous, Some(1));

        let change = hover.update(None).unwrap();
        assert_eq!(change.cursor(), CursorStyle::Default);
        assert_eq!(hover.intersected(), None);
    }

    #[test]
    fn drag_is_not_a_click() {
        let mut pointer = PointerState::default();
        pointer.moved_to(Vec2::new(100.0, 100.0));
        pointer.press();
        pointer.moved_to(Vec2::new(102.0, 101.0));
        assert!(pointer.release());

        pointer.press();
        pointer.moved_to(Vec2::new(160.0, 101.0));
        assert!(!pointer.release());
        assert!(!pointer.release());
    }
}
