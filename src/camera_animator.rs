use std::time::Duration;

use glam::Vec3;
use instant::Instant;

use crate::animation::{Easing, TweenSlot};
use crate::camera::{Camera, OrbitControls};

pub const FOCUS_DURATION: Duration = Duration::from_millis(1400);
pub const RESET_DURATION: Duration = Duration::from_millis(1200);
/// 沿原点->节点方向的后退距离
pub const FOCUS_RADIAL_OFFSET: f32 = 6.0;
pub const FOCUS_VERTICAL_OFFSET: f32 = 4.0;

/// Camera position the focus animation flies to for a node at `node_position`.
pub fn focus_destination(node_position: Vec3) -> Vec3 {
    let direction = node_position.normalize_or_zero();
    let mut destination = node_position + direction * FOCUS_RADIAL_OFFSET;
    destination.z += FOCUS_VERTICAL_OFFSET;
    destination
}

/// Drives the camera eye and the orbit target with two independent tween
/// slots. A new `focus`/`reset` replaces whatever was running on each slot.
#[derive(Debug)]
pub struct CameraAnimator {
    position: TweenSlot<Vec3>,
    target: TweenSlot<Vec3>,
    default_position: Vec3,
    default_target: Vec3,
}

impl CameraAnimator {
    pub fn new(default_position: Vec3) -> Self {
        Self {
            position: TweenSlot::new(default_position),
            target: TweenSlot::new(Vec3::ZERO),
            default_position,
            default_target: Vec3::ZERO,
        }
    }

    pub fn focus(&mut self, node_position: Vec3, camera: &Camera, controls: &OrbitControls, now: Instant) {
        self.position.sync(camera.eye);
        self.target.sync(controls.target);
        self.position.start(focus_destination(node_position), FOCUS_DURATION, Easing::CubicInOut, now);
        self.target.start(node_position, FOCUS_DURATION, Easing::CubicInOut, now);
    }

    pub fn reset(&mut self, camera: &Camera, controls: &OrbitControls, now: Instant) {
        self.position.sync(camera.eye);
        self.target.sync(controls.target);
        self.position.start(self.default_position, RESET_DURATION, Easing::CubicInOut, now);
        self.target.start(self.default_target, RESET_DURATION, Easing::CubicInOut, now);
    }

    pub fn is_animating(&self) -> bool {
        self.position.is_animating() || self.target.is_animating()
    }

    /// 当前相机终点和目标终点（没有动画时为 None）
    pub fn destinations(&self) -> (Option<Vec3>, Option<Vec3>) {
        (
            self.position.active().map(|t| t.to),
            self.target.active().map(|t| t.to),
        )
    }

    /// Steps both tweens and pushes the values into the camera/controls.
    /// Each step that moved anything runs `controls.update` so damping state
    /// stays in sync. Returns `true` if a step ran.
    pub fn update(&mut self, camera: &mut Camera, controls: &mut OrbitControls, now: Instant) -> bool {
        let moved_position = self.position.advance(now);
        let moved_target = self.target.advance(now);
        if moved_position {
            camera.eye = self.position.value();
        }
        if moved_target {
            controls.target = self.target.value();
        }
        if moved_position || moved_target {
            controls.update(camera);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CameraOptions;

    fn rig() -> (Camera, OrbitControls, CameraAnimator) {
        let options = CameraOptions::default();
        let camera = Camera::new(800, 600, &options);
        let controls = OrbitControls::new(&options);
        let animator = CameraAnimator::new(camera.eye);
        (camera, controls, animator)
    }

    #[test]
    fn destination_backs_off_radially_and_up() {
        let d = focus_destination(Vec3::new(12.0, 0.0, 0.0));
        assert!((d - Vec3::new(18.0, 0.0, 4.0)).length() < 1e-5);
        // 原点处的节点没有方向，只有竖直偏移
        assert_eq!(focus_destination(Vec3::ZERO), Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn focus_lands_on_node() {
        let (mut camera, mut controls, mut animator) = rig();
        let t0 = Instant::now();
        let node = Vec3::new(0.0, 12.0, 0.0);
        animator.focus(node, &camera, &controls, t0);

        assert!(animator.update(&mut camera, &mut controls, t0 + Duration::from_millis(700)));
        assert!(animator.update(&mut camera, &mut controls, t0 + FOCUS_DURATION));
        assert!(!animator.is_animating());
        assert!((controls.target - node).length() < 1e-4);
        // 终点离节点只有 ~7.2，轨道控制器把距离夹到 min_distance
        let min_distance = CameraOptions::default().min_distance;
        let expected = node + (focus_destination(node) - node).normalize() * min_distance;
        assert!((camera.eye - expected).length() < 1e-3);
    }

    #[test]
    fn reset_returns_to_default_framing() {
        let (mut camera, mut controls, mut animator) = rig();
        let t0 = Instant::now();
        animator.focus(Vec3::new(12.0, 0.0, 0.0), &camera, &controls, t0);
        animator.update(&mut camera, &mut controls, t0 + Duration::from_millis(500));

        let t1 = t0 + Duration::from_millis(500);
        animator.reset(&camera, &controls, t1);
        assert_eq!(animator.destinations(), (Some(Vec3::new(0.0, 0.0, 30.0)), Some(Vec3::ZERO)));

        animator.update(&mut camera, &mut controls, t1 + RESET_DURATION);
        assert!((camera.eye - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-3);
        assert!(controls.target.length() < 1e-5);
    }

    #[test]
    fn retarget_mid_flight_supersedes() {
        let (mut camera, mut controls, mut animator) = rig();
        let t0 = Instant::now();
        let first = Vec3::new(0.0, 12.0, 0.0);
        let second = Vec3::new(-12.0, 0.0, 0.0);
        animator.focus(first, &camera, &controls, t0);
        animator.update(&mut camera, &mut controls, t0 + Duration::from_millis(300));
        animator.focus(second, &camera, &controls, t0 + Duration::from_millis(300));

        let (eye_to, target_to) = animator.destinations();
        assert_eq!(target_to, Some(second));
        assert_eq!(eye_to, Some(focus_destination(second)));
    }
}
