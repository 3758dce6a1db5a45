// src/camera.rs
// 透视相机 + 轨道控制器
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use bytemuck::{Pod, Zeroable};

use crate::options::CameraOptions;

// 将发送到 GPU 的相机 Uniform 数据结构
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4], // 视图投影矩阵
    pub eye_position: [f32; 4],   // 雾效和光照使用，w 未使用
    pub needs_srgb_output_conversion: u32, // 0 for false, 1 for true
    pub _padding: [u32; 3], // 填充到 16 字节边界
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3, // 已归一化
}

impl Ray {
    /// 与球体求交，返回沿射线的最近正距离
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = -b - sqrt_d;
        if near >= 0.0 {
            return Some(near);
        }
        // 射线起点在球内
        let far = -b + sqrt_d;
        (far >= 0.0).then_some(far)
    }
}

#[derive(Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fovy: f32, // degrees
    pub znear: f32,
    pub zfar: f32,
    pub aspect_ratio: f32, // 视口宽高比 (width / height)
    pub viewport_size: Vec2, // 视口的像素尺寸
}

impl Camera {
    pub fn new(viewport_width: u32, viewport_height: u32, options: &CameraOptions) -> Self {
        let aspect_ratio = viewport_width as f32 / viewport_height as f32;
        Self {
            eye: Vec3::new(0.0, 0.0, options.default_distance),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy: options.fovy,
            znear: options.znear,
            zfar: options.zfar,
            aspect_ratio: if aspect_ratio.is_finite() && aspect_ratio > 0.0 { aspect_ratio } else { 1.0 },
            viewport_size: Vec2::new(viewport_width as f32, viewport_height as f32),
        }
    }

    /// 更新视口的宽高比和像素尺寸，在窗口大小改变时调用
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
            self.viewport_size = Vec2::new(width as f32, height as f32);
        }
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fovy.to_radians(), self.aspect_ratio, self.znear, self.zfar);
        proj * view
    }

    /// 屏幕像素坐标 (左上角为原点) -> NDC [-1, 1]
    pub fn screen_to_ndc(&self, screen_coords: Vec2) -> Vec2 {
        if self.viewport_size.x == 0.0 || self.viewport_size.y == 0.0 {
            return Vec2::ZERO;
        }
        // 屏幕 Y 轴向下为正，NDC Y 轴向上为正
        Vec2::new(
            (screen_coords.x / self.viewport_size.x) * 2.0 - 1.0,
            1.0 - (screen_coords.y / self.viewport_size.y) * 2.0,
        )
    }

    /// 过 NDC 点的世界空间射线
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.build_view_projection_matrix().inverse();
        // wgpu 的深度范围是 [0, 1]
        let near = inv * glam::Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv * glam::Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray { origin: self.eye, direction: (far - near).normalize_or(Vec3::NEG_Z) }
    }

    /// 世界坐标 -> 屏幕像素坐标。点在相机后方时返回 None
    pub fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.build_view_projection_matrix() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xy() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.viewport_size.x,
            (1.0 - (ndc.y * 0.5 + 0.5)) * self.viewport_size.y,
        ))
    }

    /// 世界空间中 `world_size` 大小的物体在 `world` 处投影后的像素高度
    pub fn world_size_to_pixels(&self, world_size: f32, world: Vec3) -> f32 {
        let forward = (self.target - self.eye).normalize_or(Vec3::NEG_Z);
        let depth = (world - self.eye).dot(forward);
        if depth <= self.znear {
            return 0.0;
        }
        let visible_height = 2.0 * (self.fovy.to_radians() / 2.0).tan() * depth;
        world_size * self.viewport_size.y / visible_height
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.eye - self.target).length()
    }
}

/// Orbit-style controls: drag rotates around `target`, the wheel dollies,
/// motion decays with damping. Panning is disabled.
#[derive(Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,

    // 待应用的球坐标增量 (theta, phi) 和缩放比例
    spherical_delta: Vec2,
    scale: f32,

    // 鼠标交互状态
    is_rotating: bool,
    last_mouse_pos_screen: Option<Vec2>,
}

const MIN_POLAR: f32 = 1e-4;

impl OrbitControls {
    pub fn new(options: &CameraOptions) -> Self {
        Self {
            target: Vec3::ZERO,
            damping_factor: options.damping_factor,
            min_distance: options.min_distance,
            max_distance: options.max_distance,
            rotate_speed: options.rotate_speed,
            zoom_speed: options.zoom_speed,
            spherical_delta: Vec2::ZERO,
            scale: 1.0,
            is_rotating: false,
            last_mouse_pos_screen: None,
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.is_rotating
    }

    pub fn start_rotate(&mut self, screen_pos: Vec2) {
        self.is_rotating = true;
        self.last_mouse_pos_screen = Some(screen_pos);
    }

    /// 拖拽一个视口高度 = 旋转一圈
    pub fn rotate(&mut self, current_screen_pos: Vec2, viewport_height: f32) {
        if !self.is_rotating || viewport_height <= 0.0 {
            return;
        }
        if let Some(last_pos) = self.last_mouse_pos_screen {
            let delta = current_screen_pos - last_pos;
            let k = std::f32::consts::TAU * self.rotate_speed / viewport_height;
            self.spherical_delta.x -= delta.x * k;
            self.spherical_delta.y -= delta.y * k;
        }
        self.last_mouse_pos_screen = Some(current_screen_pos);
    }

    pub fn end_rotate(&mut self) {
        self.is_rotating = false;
        self.last_mouse_pos_screen = None;
    }

    /// 正值拉近，负值推远
    pub fn dolly(&mut self, wheel_delta: f32) {
        if wheel_delta == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed);
        if wheel_delta > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Applies pending rotation/dolly to the camera, re-aims it at `target`
    /// and decays the pending motion. Returns `true` if the eye moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.eye - self.target;
        let mut radius = offset.length();
        if radius < f32::EPSILON {
            radius = self.min_distance;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let damping = if self.damping_factor > 0.0 { self.damping_factor } else { 1.0 };
        theta += self.spherical_delta.x * damping;
        phi += self.spherical_delta.y * damping;
        phi = phi.clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let new_eye = self.target
            + Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()) * radius;

        if self.damping_factor > 0.0 {
            self.spherical_delta *= 1.0 - self.damping_factor;
            if self.spherical_delta.length_squared() < 1e-12 {
                self.spherical_delta = Vec2::ZERO;
            }
        } else {
            self.spherical_delta = Vec2::ZERO;
        }
        self.scale = 1.0;

        let moved = new_eye.distance_squared(camera.eye) > 1e-10;
        camera.eye = new_eye;
        camera.target = self.target;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(800, 600, &CameraOptions::default())
    }

    #[test]
    fn ray_through_center_points_at_target() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 30.0));
    }

    #[test]
    fn sphere_hit_and_miss() {
        let ray = Ray { origin: Vec3::new(0.0, 0.0, 10.0), direction: Vec3::NEG_Z };
        let d = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((d - 9.0).abs() < 1e-5);
        assert!(ray.intersect_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
        // 球在射线后方
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 20.0), 1.0).is_none());
    }

    #[test]
    fn world_to_screen_projects_target_to_center() {
        let cam = camera();
        let p = cam.world_to_screen(Vec3::ZERO).unwrap();
        assert!((p - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!(cam.world_to_screen(Vec3::new(0.0, 0.0, 40.0)).is_none());
    }

    #[test]
    fn projected_size_shrinks_with_depth() {
        let cam = camera();
        let near = cam.world_size_to_pixels(1.0, Vec3::new(0.0, 0.0, 10.0));
        let far = cam.world_size_to_pixels(1.0, Vec3::new(0.0, 0.0, -10.0));
        assert!(near > far && far > 0.0);
        assert!((near / far - 2.0).abs() < 1e-3);
        assert_eq!(cam.world_size_to_pixels(1.0, Vec3::new(0.0, 0.0, 35.0)), 0.0);
    }

    #[test]
    fn screen_to_ndc_flips_y() {
        let cam = camera();
        assert_eq!(cam.screen_to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
        assert_eq!(cam.screen_to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn update_clamps_distance() {
        let options = CameraOptions::default();
        let mut cam = camera();
        let mut controls = OrbitControls::new(&options);

        cam.eye = Vec3::new(0.0, 0.0, 200.0);
        controls.update(&mut cam);
        assert!((cam.distance_to_target() - options.max_distance).abs() < 1e-3);

        cam.eye = Vec3::new(0.0, 0.0, 1.0);
        controls.update(&mut cam);
        assert!((cam.distance_to_target() - options.min_distance).abs() < 1e-3);
    }

    #[test]
    fn update_without_input_keeps_eye() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&CameraOptions::default());
        assert!(!controls.update(&mut cam));
        assert!((cam.eye - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
    }

    #[test]
    fn rotation_decays_with_damping() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&CameraOptions::default());
        controls.start_rotate(Vec2::new(400.0, 300.0));
        controls.rotate(Vec2::new(460.0, 300.0), 600.0);
        controls.end_rotate();

        assert!(controls.update(&mut cam));
        let first = cam.eye;
        for _ in 0..400 {
            controls.update(&mut cam);
        }
        let settled = cam.eye;
        assert!(!controls.update(&mut cam));
        assert!(first.x < 0.0, "dragging right swings the eye to -x");
        assert!((settled.length() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn dolly_in_shrinks_distance() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&CameraOptions::default());
        controls.dolly(1.0);
        controls.update(&mut cam);
        assert!(cam.distance_to_target() < 30.0);
    }
}
