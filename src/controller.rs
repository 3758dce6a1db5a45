//! Owner of all mutable view state for one mounted session: camera rig,
//! nodes, hover/selection, page chrome. Built when the window's GPU state
//! is created and disposed with it.

use glam::{Mat4, Vec2, Vec3};
use instant::Instant;
use std::time::Duration;

use crate::camera::{Camera, OrbitControls};
use crate::camera_animator::CameraAnimator;
use crate::interaction::{CursorStyle, HoverTracker, PointerState, pick_node};
use crate::options::PortfolioOptions;
use crate::overlay::{self, OverlayContent, OverlayFrame, ShellLayout, UiHit};
use crate::scene::node::{Node, build_nodes};
use crate::scene::panel::{PanelKey, PanelRegistry, TextSpan};
use crate::scene::resume::ResumeData;
use crate::view_shell::ViewShell;

/// 每帧固定的装饰旋转增量（与帧率耦合）
pub const CENTRAL_SPIN_Y: f32 = 0.003;
pub const CENTRAL_SPIN_X: f32 = 0.0015;
pub const STARS_SPIN_Y: f32 = 0.0002;

/// 每帧渲染循环产生的、需要窗口处理的副作用
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutput {
    pub cursor: Option<CursorStyle>,
}

/// 页头显示用：去掉协议头和 `www.`
fn display_url(url: &str) -> &str {
    let url = url.trim();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.trim_end_matches('/')
}

pub struct PortfolioController {
    resume: ResumeData,
    registry: PanelRegistry,
    pub nodes: Vec<Node>,
    pub camera: Camera,
    pub controls: OrbitControls,
    animator: CameraAnimator,
    hover: HoverTracker,
    pointer: PointerState,
    pub shell: ViewShell,
    labels_available: bool,
    started: Instant,
    central_rotation: Vec2,
    stars_rotation_y: f32,
    cursor: CursorStyle,
    panel_text: Option<(PanelKey, Vec<TextSpan>)>,
}

impl PortfolioController {
    pub fn new(resume: ResumeData, options: &PortfolioOptions, width: u32, height: u32, now: Instant) -> Self {
        let registry = PanelRegistry::new(&resume);
        let nodes = build_nodes(&registry, options.scene.node_orbit_radius);
        let camera = Camera::new(width, height, &options.camera);
        let controls = OrbitControls::new(&options.camera);
        let animator = CameraAnimator::new(camera.eye);
        let timeout = Duration::from_secs_f32(options.font.timeout_secs.max(0.0));

        log::info!("Scene built with {} nodes.", nodes.len());

        Self {
            resume,
            registry,
            nodes,
            camera,
            controls,
            animator,
            hover: HoverTracker::default(),
            pointer: PointerState::default(),
            shell: ViewShell::new(now, timeout),
            labels_available: false,
            started: now,
            central_rotation: Vec2::ZERO,
            stars_rotation_y: 0.0,
            cursor: CursorStyle::Default,
            panel_text: None,
        }
    }

    pub fn registry(&self) -> &PanelRegistry {
        &self.registry
    }

    pub fn active_panel(&self) -> Option<PanelKey> {
        self.shell.active_panel()
    }

    pub fn animator(&self) -> &CameraAnimator {
        &self.animator
    }

    pub fn labels_available(&self) -> bool {
        self.labels_available
    }

    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.update_aspect_ratio(width, height);
    }

    pub fn layout(&self) -> ShellLayout {
        ShellLayout::compute(self.camera.viewport_size, self.shell.panel_slide())
    }

    fn ui_hit(&self, p: Vec2) -> Option<UiHit> {
        overlay::hit_test(&self.layout(), &self.shell, p)
    }

    /// 只有面板会挡住节点拾取；页头和介绍文字只挡住拖拽旋转
    fn panel_under_pointer(&self) -> bool {
        matches!(self.ui_hit(self.pointer.position), Some(UiHit::Panel | UiHit::CloseButton))
    }

    pub fn node_index(&self, key: PanelKey) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    // --- 选择 / 关闭 ---

    /// Opens `key` and flies the camera to its node, replacing any open panel
    /// and any camera flight in progress.
    pub fn select(&mut self, key: PanelKey, now: Instant) {
        let Some(index) = self.node_index(key) else {
            log::warn!("No node for panel {}", key);
            return;
        };
        let position = self.nodes[index].position;
        log::info!("Opening panel {} (node at {:.2}, {:.2}, {:.2})", key, position.x, position.y, position.z);
        self.shell.open(key, now);
        self.animator.focus(position, &self.camera, &self.controls, now);
    }

    pub fn close_panel(&mut self, now: Instant) {
        if !self.shell.is_panel_open() {
            return;
        }
        log::info!("Closing panel.");
        self.shell.close(now);
        self.animator.reset(&self.camera, &self.controls, now);
    }

    /// 字体加载结束（无论成功与否）都会让场景进入就绪状态
    pub fn font_settled(&mut self, labels_available: bool, now: Instant) {
        self.labels_available = labels_available;
        self.shell.loader.mark_ready(now);
    }

    // --- 指针输入 ---

    pub fn pointer_moved(&mut self, position: Vec2) {
        self.pointer.moved_to(position);
        if self.controls.is_rotating() {
            self.controls.rotate(position, self.camera.viewport_size.y);
        }
    }

    pub fn pointer_left(&mut self) {
        self.pointer.left();
        self.controls.end_rotate();
    }

    pub fn pointer_pressed(&mut self) {
        self.pointer.press();
        // 界面元素挡住画布，不开始旋转
        if self.ui_hit(self.pointer.position).is_none() {
            self.controls.start_rotate(self.pointer.position);
        }
    }

    pub fn pointer_released(&mut self, now: Instant) {
        self.controls.end_rotate();
        if self.pointer.release() {
            self.click(now);
        }
    }

    /// 点击：面板优先，其次对节点做射线拾取
    pub fn click(&mut self, now: Instant) {
        match self.ui_hit(self.pointer.position) {
            Some(UiHit::CloseButton) => self.close_panel(now),
            Some(UiHit::Panel) => {}
            _ => {
                let ndc = self.camera.screen_to_ndc(self.pointer.position);
                let ray = self.camera.ray_from_ndc(ndc);
                if let Some(index) = pick_node(&ray, &self.nodes) {
                    let key = self.nodes[index].key;
                    self.select(key, now);
                }
            }
        }
    }

    /// 滚轮：面板上滚动内容，否则缩放相机。`delta` 为像素，正值向上
    pub fn wheel(&mut self, delta: f32) {
        if self.ui_hit(self.pointer.position) == Some(UiHit::Panel) {
            self.shell.scroll_content_by(-delta);
        } else {
            self.controls.dolly(delta);
        }
    }

    // --- 渲染循环 ---

    /// One render-loop step. Call once per display frame before drawing.
    pub fn frame(&mut self, now: Instant) -> FrameOutput {
        // 1. 装饰旋转
        self.central_rotation.y += CENTRAL_SPIN_Y;
        self.central_rotation.x += CENTRAL_SPIN_X;
        self.stars_rotation_y += STARS_SPIN_Y;

        // 2. 节点浮动，标签跟随
        let elapsed = if now > self.started { now.duration_since(self.started).as_secs_f32() } else { 0.0 };
        for node in self.nodes.iter_mut() {
            node.animate(elapsed, now);
        }

        // 3. 射线拾取
        let hit = if !self.pointer.is_inside() || self.panel_under_pointer() {
            None
        } else {
            let ray = self.camera.ray_from_ndc(self.camera.screen_to_ndc(self.pointer.position));
            pick_node(&ray, &self.nodes)
        };

        // 4. 悬停变化
        let mut output = FrameOutput::default();
        if let Some(change) = self.hover.update(hit) {
            if let Some(previous) = change.previous {
                self.nodes[previous].unhighlight(now);
            }
            if let Some(current) = change.current {
                self.nodes[current].highlight(now);
            }
            let cursor = change.cursor();
            if cursor != self.cursor {
                self.cursor = cursor;
                output.cursor = Some(cursor);
            }
        }

        // 5. 相机动画 + 阻尼
        if !self.animator.update(&mut self.camera, &mut self.controls, now) {
            self.controls.update(&mut self.camera);
        }

        self.shell.tick(now);
        output
    }

    pub fn central_model(&self) -> Mat4 {
        Mat4::from_rotation_y(self.central_rotation.y) * Mat4::from_rotation_x(self.central_rotation.x)
    }

    pub fn stars_model(&self) -> Mat4 {
        Mat4::from_rotation_y(self.stars_rotation_y)
    }

    pub fn eye(&self) -> Vec3 {
        self.camera.eye
    }

    fn panel_body(&mut self, key: PanelKey) -> Vec<TextSpan> {
        if let Some((cached, spans)) = &self.panel_text {
            if *cached == key {
                return spans.clone();
            }
        }
        let spans = self.registry.get(key).render(&self.resume).to_spans();
        self.panel_text = Some((key, spans.clone()));
        spans
    }

    fn overlay_content(&mut self) -> OverlayContent {
        let personal = &self.resume.personal;
        let contact_summary = personal
            .header_links()
            .into_iter()
            .map(|(_, url)| display_url(url))
            .collect::<Vec<_>>()
            .join("\n");
        let mut content = OverlayContent {
            name: personal.name.clone(),
            role: personal.role.clone(),
            contact_summary,
            ..Default::default()
        };
        // 关闭动画期间保留最后一次的内容
        let shown = self.shell.active_panel().or(self.panel_text.as_ref().map(|(k, _)| *k));
        if let Some(key) = shown {
            content.panel_title = self.registry.title(key).to_string();
            content.panel_body = self.panel_body(key);
        }
        content
    }

    /// 当前帧的界面（页头、面板、遮罩）和节点标签
    pub fn build_overlay(&mut self) -> OverlayFrame {
        let layout = self.layout();
        let content = self.overlay_content();
        let mut frame = overlay::build_shell(&layout, &self.shell, &content);
        if self.labels_available {
            frame.labels = overlay::build_labels(&self.camera, &self.nodes);
        }
        frame
    }

    pub fn dispose(&mut self) {
        self.controls.end_rotate();
        self.panel_text = None;
        log::info!("Portfolio controller disposed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_animator::{FOCUS_DURATION, focus_destination};

    fn controller() -> (PortfolioController, Instant) {
        let now = Instant::now();
        let resume = ResumeData::embedded().unwrap();
        (PortfolioController::new(resume, &PortfolioOptions::default(), 1280, 800, now), now)
    }

    fn panel_body_text(c: &mut PortfolioController) -> String {
        let frame = c.build_overlay();
        let index = frame.panel_body_index.expect("panel body present");
        frame.texts[index].text.clone()
    }

    #[test]
    fn selecting_sets_single_active_panel() {
        let (mut c, t0) = controller();
        let mut previous_body: Option<String> = None;
        for (i, key) in PanelKey::ALL.into_iter().enumerate() {
            let t = t0 + Duration::from_secs(i as u64);
            c.select(key, t);
            c.frame(t + Duration::from_millis(600));
            assert_eq!(c.active_panel(), Some(key));
            let frame = c.build_overlay();
            assert!(frame.texts.iter().any(|t| t.text == c.registry().title(key)));

            let expected = c.registry().get(key).render(&c.resume).to_plain_text();
            let body = panel_body_text(&mut c);
            assert_eq!(body, expected);
            assert_ne!(previous_body.as_deref(), Some(body.as_str()), "body follows the replacing key");
            previous_body = Some(body);
        }
    }

    #[test]
    fn emphasized_bullets_reach_overlay() {
        let (mut c, t0) = controller();
        c.select(PanelKey::Experience, t0);
        c.frame(t0 + Duration::from_millis(600));
        let frame = c.build_overlay();
        let body = &frame.texts[frame.panel_body_index.unwrap()];
        assert!(body.spans.iter().any(|s| s.emphasized && s.text == "48%"));
        assert!(!body.text.contains("**"));
    }

    #[test]
    fn header_lists_profile_links() {
        let (mut c, t0) = controller();
        c.frame(t0);
        let frame = c.build_overlay();
        let links = frame
            .texts
            .iter()
            .find(|t| t.text.contains("github.com/aria-castellanos"))
            .expect("header links block");
        assert_eq!(
            links.text,
            "linkedin.com/in/aria-castellanos\ngithub.com/aria-castellanos\naria-castellanos.example.com"
        );
        assert!(!frame.texts.iter().any(|t| t.text.contains(&c.resume.personal.email)));
    }

    #[test]
    fn display_url_strips_scheme() {
        assert_eq!(display_url("https://www.example.com/"), "example.com");
        assert_eq!(display_url("http://github.com/a"), "github.com/a");
        assert_eq!(display_url("example.org"), "example.org");
    }

    #[test]
    fn close_clears_panel_and_requests_default_framing() {
        let (mut c, t0) = controller();
        c.select(PanelKey::About, t0);
        c.frame(t0 + Duration::from_millis(500));
        c.close_panel(t0 + Duration::from_millis(500));

        assert_eq!(c.active_panel(), None);
        assert_eq!(c.animator().destinations(), (Some(Vec3::new(0.0, 0.0, 30.0)), Some(Vec3::ZERO)));
    }

    #[test]
    fn skills_then_projects_retargets_camera() {
        let (mut c, t0) = controller();
        c.select(PanelKey::Skills, t0);
        c.select(PanelKey::Projects, t0);

        assert_eq!(c.active_panel(), Some(PanelKey::Projects));
        let projects = c.nodes[c.node_index(PanelKey::Projects).unwrap()].position;
        let skills = c.nodes[c.node_index(PanelKey::Skills).unwrap()].position;
        let (eye_to, target_to) = c.animator().destinations();
        assert_eq!(target_to, Some(projects));
        assert_eq!(eye_to, Some(focus_destination(projects)));
        assert_ne!(target_to, Some(skills));
        assert_ne!(eye_to, Some(focus_destination(skills)));
    }

    #[test]
    fn open_close_restores_intro() {
        let (mut c, t0) = controller();
        c.select(PanelKey::Experience, t0);
        let t1 = t0 + Duration::from_secs(2);
        c.frame(t1);
        assert!(!c.shell.intro_interactive());

        c.close_panel(t1);
        c.frame(t1 + Duration::from_secs(1));
        assert_eq!(c.shell.intro_opacity(), 1.0);
        assert!(c.shell.intro_interactive());
    }

    #[test]
    fn font_failure_still_leaves_loading_state() {
        let (mut c, t0) = controller();
        c.font_settled(false, t0 + Duration::from_millis(100));
        c.frame(t0 + Duration::from_secs(1));
        assert!(c.shell.loader.is_ready());
        assert!(!c.labels_available());
        // 节点不依赖字体
        assert_eq!(c.nodes.len(), PanelKey::ALL.len());
    }

    #[test]
    fn unanswered_font_times_out() {
        let (mut c, t0) = controller();
        c.frame(t0 + Duration::from_secs(9));
        assert!(c.shell.loader.is_ready());
    }

    #[test]
    fn click_on_node_opens_its_panel() {
        let (mut c, t0) = controller();
        // about 节点在 (12, 0, z)，投影到屏幕后点击
        c.frame(t0);
        let about = c.nodes[0].position;
        let screen = c.camera.world_to_screen(about).unwrap();
        c.pointer_moved(screen);
        c.pointer_pressed();
        c.pointer_released(t0);
        assert_eq!(c.active_panel(), Some(PanelKey::About));
        assert_eq!(c.animator().destinations().1, Some(about));
    }

    #[test]
    fn click_on_empty_space_does_nothing() {
        let (mut c, t0) = controller();
        c.frame(t0);
        c.pointer_moved(Vec2::new(5.0, 790.0));
        c.pointer_pressed();
        c.pointer_released(t0);
        assert_eq!(c.active_panel(), None);
        assert!(!c.animator().is_animating());
    }

    #[test]
    fn close_button_click_closes() {
        let (mut c, t0) = controller();
        c.select(PanelKey::Projects, t0);
        let t1 = t0 + FOCUS_DURATION;
        c.frame(t1);
        let button = c.layout().close_button;
        c.pointer_moved(Vec2::new(button.x + button.w / 2.0, button.y + button.h / 2.0));
        c.pointer_pressed();
        c.pointer_released(t1);
        assert_eq!(c.active_panel(), None);
    }

    #[test]
    fn hover_switches_cursor() {
        let (mut c, t0) = controller();
        c.frame(t0);
        let screen = c.camera.world_to_screen(c.nodes[1].position).unwrap();
        c.pointer_moved(screen);
        let out = c.frame(t0);
        assert_eq!(out.cursor, Some(CursorStyle::Pointer));
        assert_eq!(c.frame(t0).cursor, None);

        c.pointer_moved(Vec2::new(5.0, 790.0));
        assert_eq!(c.frame(t0).cursor, Some(CursorStyle::Default));
    }

    #[test]
    fn leaving_canvas_clears_hover() {
        let (mut c, t0) = controller();
        c.frame(t0);
        let screen = c.camera.world_to_screen(c.nodes[2].position).unwrap();
        c.pointer_moved(screen);
        assert_eq!(c.frame(t0).cursor, Some(CursorStyle::Pointer));
        c.pointer_left();
        assert_eq!(c.frame(t0).cursor, Some(CursorStyle::Default));
    }

    #[test]
    fn labels_only_after_font() {
        let (mut c, t0) = controller();
        c.frame(t0);
        assert!(c.build_overlay().labels.is_empty());
        c.font_settled(true, t0);
        let frame = c.build_overlay();
        assert_eq!(frame.labels.len(), c.nodes.len());
        assert!(frame.labels.iter().any(|t| t.text == "Technical Skills"));
    }
}
