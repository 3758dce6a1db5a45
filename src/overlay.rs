// src/overlay.rs
// 屏幕空间的界面排版：页头、介绍文字、详情面板、加载遮罩、节点标签
use bevy_color::{Alpha, ColorToComponents, LinearRgba, Srgba};
use glam::Vec2;

use crate::camera::Camera;
use crate::models::RectInstance;
use crate::scene::node::Node;
use crate::scene::panel::TextSpan;
use crate::view_shell::{LoaderPhase, ViewShell};

/// 宽屏布局（面板从右侧滑入）的最小视口宽度
pub const WIDE_BREAKPOINT: f32 = 768.0;
pub const PANEL_WIDTH: f32 = 420.0;
pub const PANEL_MAX_NARROW_WIDTH: f32 = 512.0;
pub const PANEL_PADDING: f32 = 24.0;
pub const CLOSE_BUTTON_SIZE: f32 = 40.0;
/// 节点标签的世界空间字号
pub const LABEL_WORLD_SIZE: f32 = 0.6;
pub const LABEL_MIN_PIXELS: f32 = 8.0;

const HEADER_HEIGHT: f32 = 64.0;
const INTRO_MAX_WIDTH: f32 = 672.0;
const INTRO_HEIGHT: f32 = 150.0;
const PANEL_HEADER_HEIGHT: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn offset(&self, d: Vec2) -> Self {
        Self::new(self.x + d.x, self.y + d.y, self.w, self.h)
    }
}

/// Page padding follows the viewport width: 24 / 32 / 48 px.
pub fn page_padding(viewport_width: f32) -> f32 {
    if viewport_width >= 1024.0 {
        48.0
    } else if viewport_width >= 640.0 {
        32.0
    } else {
        24.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellLayout {
    pub viewport: Vec2,
    pub wide: bool,
    pub header: Rect,
    pub intro: Rect,
    /// 已经应用了滑入偏移
    pub panel: Rect,
    pub close_button: Rect,
    pub panel_content: Rect,
    pub hint: Option<Rect>,
}

impl ShellLayout {
    pub fn compute(viewport: Vec2, panel_slide: f32) -> Self {
        let padding = page_padding(viewport.x);
        let wide = viewport.x >= WIDE_BREAKPOINT;
        let hidden = 1.0 - panel_slide.clamp(0.0, 1.0);

        let header = Rect::new(padding, padding, (viewport.x - 2.0 * padding).max(0.0), HEADER_HEIGHT);

        let intro_w = (viewport.x - 2.0 * padding).clamp(0.0, INTRO_MAX_WIDTH);
        let intro = Rect::new(
            (viewport.x - intro_w) / 2.0,
            (viewport.y - INTRO_HEIGHT) / 2.0,
            intro_w,
            INTRO_HEIGHT,
        );

        let panel = if wide {
            let top = header.bottom() + padding;
            let rest = Rect::new(
                viewport.x - 48.0 - PANEL_WIDTH,
                top,
                PANEL_WIDTH,
                (viewport.y - top).max(0.0),
            );
            // translate-x-full：整体移出右边缘
            rest.offset(Vec2::new(hidden * (PANEL_WIDTH + 48.0), 0.0))
        } else {
            let w = viewport.x.min(PANEL_MAX_NARROW_WIDTH);
            let h = (viewport.y * 0.6).round();
            let rest = Rect::new((viewport.x - w) / 2.0, viewport.y - h, w, h);
            rest.offset(Vec2::new(0.0, hidden * h))
        };

        let close_button = Rect::new(
            panel.right() - PANEL_PADDING - CLOSE_BUTTON_SIZE,
            panel.y + PANEL_PADDING,
            CLOSE_BUTTON_SIZE,
            CLOSE_BUTTON_SIZE,
        );
        let content_top = panel.y + PANEL_PADDING + PANEL_HEADER_HEIGHT + PANEL_PADDING;
        let panel_content = Rect::new(
            panel.x + PANEL_PADDING,
            content_top,
            (panel.w - 2.0 * PANEL_PADDING).max(0.0),
            (panel.bottom() - PANEL_PADDING - content_top).max(0.0),
        );

        let hint = wide.then(|| {
            let w = 360.0;
            Rect::new((viewport.x - w) / 2.0, viewport.y - 32.0 - 34.0, w, 34.0)
        });

        Self { viewport, wide, header, intro, panel, close_button, panel_content, hint }
    }

    pub fn panel_visible(&self) -> bool {
        self.panel.x < self.viewport.x && self.panel.y < self.viewport.y
    }
}

/// 指针下的界面元素。None 表示指针落在 3D 画布上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiHit {
    CloseButton,
    Panel,
    Header,
    Intro,
}

/// What UI element (if any) sits under `p`. Elements without pointer
/// interaction (the faded intro, a hidden panel) let the pointer through.
pub fn hit_test(layout: &ShellLayout, shell: &ViewShell, p: Vec2) -> Option<UiHit> {
    if shell.is_panel_open() && layout.panel_visible() {
        if layout.close_button.contains(p) {
            return Some(UiHit::CloseButton);
        }
        if layout.panel.contains(p) {
            return Some(UiHit::Panel);
        }
    }
    if layout.header.contains(p) {
        return Some(UiHit::Header);
    }
    if shell.intro_interactive() && layout.intro.contains(p) {
        return Some(UiHit::Intro);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFamily {
    /// 系统/默认字体，用于界面文字
    Ui,
    /// 远程加载的标签字体
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    TopLeft,
    /// (left, top) 是文字块的中心
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub color: [u8; 4],
    pub bold: bool,
    pub family: TextFamily,
    pub anchor: TextAnchor,
    /// 裁剪区域；None 表示整个视口
    pub clip: Option<Rect>,
    /// 富文本片段；为空时整段按 `text` 排版
    pub spans: Vec<TextSpan>,
}

impl TextBlock {
    fn ui(text: impl Into<String>, left: f32, top: f32, width: f32, font_size: f32, color: [u8; 4]) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            width,
            font_size,
            line_height: (font_size * 1.45).round(),
            color,
            bold: false,
            family: TextFamily::Ui,
            anchor: TextAnchor::TopLeft,
            clip: None,
            spans: Vec::new(),
        }
    }
}

/// Strings the overlay needs, gathered by the controller each frame.
#[derive(Debug, Clone, Default)]
pub struct OverlayContent {
    pub name: String,
    pub role: String,
    pub contact_summary: String,
    pub panel_title: String,
    pub panel_body: Vec<TextSpan>,
}

#[derive(Debug, Default)]
pub struct OverlayFrame {
    pub rects: Vec<RectInstance>,
    pub texts: Vec<TextBlock>,
    /// 节点标签，先于界面矩形绘制
    pub labels: Vec<TextBlock>,
    /// 面板正文在 `texts` 中的位置，渲染器据此回报内容高度
    pub panel_body_index: Option<usize>,
}

fn linear(r: u8, g: u8, b: u8, alpha: f32) -> [f32; 4] {
    LinearRgba::from(Srgba::rgb_u8(r, g, b)).with_alpha(alpha.clamp(0.0, 1.0)).to_f32_array()
}

fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> [u8; 4] {
    [r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8]
}

fn rect(r: Rect, color: [f32; 4], corner_radius: f32) -> RectInstance {
    RectInstance {
        rect: [r.x, r.y, r.w, r.h],
        color,
        corner_radius,
        _padding: [0.0; 3],
    }
}

const SLATE_300: (u8, u8, u8) = (203, 213, 225);
const SLATE_400: (u8, u8, u8) = (148, 163, 184);
const INDIGO_300: (u8, u8, u8) = (165, 180, 252);
const INDIGO_400: (u8, u8, u8) = (129, 140, 248);

fn shade(c: (u8, u8, u8), alpha: f32) -> [u8; 4] {
    rgba(c.0, c.1, c.2, alpha)
}

/// Builds every rectangle and text block of the page chrome.
pub fn build_shell(layout: &ShellLayout, shell: &ViewShell, content: &OverlayContent) -> OverlayFrame {
    let mut frame = OverlayFrame::default();

    // --- 页头 ---
    let header_alpha = shell.header_opacity();
    let h = layout.header;
    let mut name = TextBlock::ui(&content.name, h.x, h.y, h.w * 0.6, 28.0, rgba(255, 255, 255, header_alpha));
    name.bold = true;
    frame.texts.push(name);
    frame.texts.push(TextBlock::ui(&content.role, h.x, h.y + 40.0, h.w * 0.6, 15.0, shade(INDIGO_300, header_alpha)));
    if layout.wide && !content.contact_summary.is_empty() {
        let w = h.w * 0.4;
        frame.texts.push(TextBlock::ui(
            &content.contact_summary,
            h.right() - w,
            h.y + 4.0,
            w,
            13.0,
            shade(SLATE_400, header_alpha),
        ));
    }

    // --- 介绍 ---
    let intro_alpha = shell.intro_opacity();
    if intro_alpha > 0.0 {
        let i = layout.intro;
        let heading_size = if layout.viewport.x >= 640.0 { 44.0 } else { 28.0 };
        let mut heading = TextBlock::ui(
            "Welcome to my interactive portfolio",
            i.x + i.w / 2.0,
            i.y + heading_size * 0.75,
            i.w,
            heading_size,
            shade(INDIGO_400, intro_alpha),
        );
        heading.bold = true;
        heading.anchor = TextAnchor::Center;
        frame.texts.push(heading);

        let mut blurb = TextBlock::ui(
            "Orbit around the scene and explore the floating nodes to uncover projects, skills, and enterprise experience.",
            i.x + i.w / 2.0,
            i.y + i.h - 32.0,
            i.w,
            15.0,
            shade(SLATE_300, intro_alpha),
        );
        blurb.anchor = TextAnchor::Center;
        frame.texts.push(blurb);
    }

    // --- 提示 ---
    if let Some(hint) = layout.hint {
        frame.rects.push(rect(hint, linear(15, 23, 42, 0.7), hint.h / 2.0));
        let mut text = TextBlock::ui(
            "CLICK THE ORBITING NODES TO EXPLORE",
            hint.x + hint.w / 2.0,
            hint.y + hint.h / 2.0,
            hint.w,
            11.0,
            shade(SLATE_300, 1.0),
        );
        text.anchor = TextAnchor::Center;
        frame.texts.push(text);
    }

    // --- 详情面板 ---
    if layout.panel_visible() && shell.panel_slide() > 0.0 {
        let p = layout.panel;
        let radius = if layout.wide { 24.0 } else { 24.0_f32.min(p.w / 2.0) };
        frame.rects.push(rect(p, linear(15, 23, 42, 0.88), radius));
        frame.rects.push(rect(layout.close_button, linear(255, 255, 255, 0.08), CLOSE_BUTTON_SIZE / 2.0));

        let text_w = (p.w - 3.0 * PANEL_PADDING - CLOSE_BUTTON_SIZE).max(0.0);
        frame.texts.push(TextBlock::ui(
            "FOCUSED EXPLORER",
            p.x + PANEL_PADDING,
            p.y + PANEL_PADDING,
            text_w,
            11.0,
            shade(INDIGO_300, 1.0),
        ));
        let mut title = TextBlock::ui(
            &content.panel_title,
            p.x + PANEL_PADDING,
            p.y + PANEL_PADDING + 20.0,
            text_w,
            24.0,
            rgba(255, 255, 255, 1.0),
        );
        title.bold = true;
        frame.texts.push(title);

        let c = layout.close_button;
        let mut close = TextBlock::ui("×", c.x + c.w / 2.0, c.y + c.h / 2.0, c.w, 24.0, shade(SLATE_300, 1.0));
        close.anchor = TextAnchor::Center;
        frame.texts.push(close);

        let body_area = layout.panel_content;
        let body_text: String = content.panel_body.iter().map(|span| span.text.as_str()).collect();
        let mut body = TextBlock::ui(
            body_text,
            body_area.x,
            body_area.y - shell.content_scroll(),
            body_area.w,
            14.0,
            rgba(226, 232, 240, 1.0),
        );
        body.clip = Some(body_area);
        body.spans = content.panel_body.clone();
        frame.panel_body_index = Some(frame.texts.len());
        frame.texts.push(body);
    }

    // --- 加载遮罩 ---
    if shell.loader.phase() != LoaderPhase::Hidden {
        let alpha = shell.loader.opacity();
        let full = Rect::new(0.0, 0.0, layout.viewport.x, layout.viewport.y);
        frame.rects.push(rect(full, linear(15, 23, 42, 0.8 * alpha), 0.0));
        let center = layout.viewport / 2.0;
        frame.rects.push(rect(Rect::new(center.x - 32.0, center.y - 72.0, 64.0, 64.0), linear(129, 140, 248, 0.9 * alpha), 32.0));
        let mut title = TextBlock::ui("LOADING 3D EXPERIENCE", center.x, center.y + 20.0, layout.viewport.x, 13.0, shade(INDIGO_300, alpha));
        title.anchor = TextAnchor::Center;
        frame.texts.push(title);
        let mut stack = TextBlock::ui("wgpu • winit • glyphon", center.x, center.y + 44.0, layout.viewport.x, 11.0, shade(SLATE_300, alpha));
        stack.anchor = TextAnchor::Center;
        frame.texts.push(stack);
    }

    frame
}

/// Camera-facing labels at each node's projected label position.
pub fn build_labels(camera: &Camera, nodes: &[Node]) -> Vec<TextBlock> {
    nodes
        .iter()
        .filter_map(|node| {
            let world = node.label.world_position();
            let screen = camera.world_to_screen(world)?;
            let font_size = camera.world_size_to_pixels(LABEL_WORLD_SIZE, world) * node.label.font_size / 18.0;
            if font_size < LABEL_MIN_PIXELS {
                return None;
            }
            Some(TextBlock {
                text: node.label.content.clone(),
                left: screen.x,
                top: screen.y,
                width: camera.viewport_size.x,
                font_size,
                line_height: font_size * 1.2,
                color: rgba(255, 255, 255, 0.8),
                bold: false,
                family: TextFamily::Label,
                anchor: TextAnchor::Center,
                clip: None,
                spans: Vec::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use instant::Instant;
    use crate::scene::panel::PanelKey;

    const WIDE: Vec2 = Vec2::new(1280.0, 800.0);
    const NARROW: Vec2 = Vec2::new(390.0, 844.0);

    fn content() -> OverlayContent {
        OverlayContent {
            name: "Aria".into(),
            role: "Engineer".into(),
            contact_summary: "a@b.c".into(),
            panel_title: "Projects".into(),
            panel_body: vec![
                TextSpan { text: "body ".into(), emphasized: false },
                TextSpan { text: "bold".into(), emphasized: true },
            ],
        }
    }

    #[test]
    fn wide_panel_slides_from_right() {
        let open = ShellLayout::compute(WIDE, 1.0);
        assert!(open.wide);
        assert_eq!(open.panel.right(), WIDE.x - 48.0);
        assert_eq!(open.panel.w, PANEL_WIDTH);
        assert!(open.panel_visible());

        let closed = ShellLayout::compute(WIDE, 0.0);
        assert!(closed.panel.x >= WIDE.x);
        assert!(!closed.panel_visible());
        assert_eq!(closed.panel.y, open.panel.y);
    }

    #[test]
    fn narrow_panel_slides_from_bottom() {
        let open = ShellLayout::compute(NARROW, 1.0);
        assert!(!open.wide);
        assert_eq!(open.panel.bottom(), NARROW.y);
        assert!(open.hint.is_none());
        let closed = ShellLayout::compute(NARROW, 0.0);
        assert!(closed.panel.y >= NARROW.y);
        assert_eq!(closed.panel.x, open.panel.x);
    }

    #[test]
    fn close_button_inside_panel() {
        let layout = ShellLayout::compute(WIDE, 1.0);
        let c = layout.close_button;
        assert!(layout.panel.contains(Vec2::new(c.x, c.y)));
        assert!(layout.panel.contains(Vec2::new(c.right(), c.bottom())));
        assert!(layout.panel_content.y > c.bottom());
    }

    #[test]
    fn hit_test_respects_open_state() {
        let t0 = Instant::now();
        let mut shell = ViewShell::new(t0, Duration::from_secs(8));
        let layout = ShellLayout::compute(WIDE, 1.0);
        let in_panel = Vec2::new(layout.panel.x + 10.0, layout.panel.bottom() - 10.0);
        let on_close = Vec2::new(layout.close_button.x + 5.0, layout.close_button.y + 5.0);
        let in_intro = Vec2::new(WIDE.x / 2.0, WIDE.y / 2.0);

        assert_eq!(hit_test(&layout, &shell, in_panel), None);
        assert_eq!(hit_test(&layout, &shell, in_intro), Some(UiHit::Intro));

        shell.open(PanelKey::About, t0);
        shell.tick(t0 + Duration::from_secs(1));
        assert_eq!(hit_test(&layout, &shell, in_panel), Some(UiHit::Panel));
        assert_eq!(hit_test(&layout, &shell, on_close), Some(UiHit::CloseButton));
        assert_eq!(hit_test(&layout, &shell, in_intro), None, "faded intro lets clicks through");
        assert_eq!(hit_test(&layout, &shell, Vec2::new(60.0, 60.0)), Some(UiHit::Header));
    }

    #[test]
    fn shell_frame_contains_panel_only_when_open() {
        let t0 = Instant::now();
        let mut shell = ViewShell::new(t0, Duration::from_secs(8));
        shell.loader.mark_ready(t0);
        shell.tick(t0 + Duration::from_secs(1));

        let frame = build_shell(&ShellLayout::compute(WIDE, shell.panel_slide()), &shell, &content());
        assert!(frame.panel_body_index.is_none());
        assert!(frame.texts.iter().any(|t| t.text.starts_with("Welcome")));

        shell.open(PanelKey::Projects, t0 + Duration::from_secs(1));
        shell.tick(t0 + Duration::from_secs(2));
        let frame = build_shell(&ShellLayout::compute(WIDE, shell.panel_slide()), &shell, &content());
        let body = &frame.texts[frame.panel_body_index.unwrap()];
        assert_eq!(body.text, "body bold");
        assert_eq!(body.spans, content().panel_body);
        assert!(body.spans.iter().any(|span| span.emphasized && span.text == "bold"));
        assert!(body.clip.is_some());
        assert!(frame.texts.iter().any(|t| t.text == "Projects"));
        assert!(!frame.texts.iter().any(|t| t.text.starts_with("Welcome")), "intro fully faded");
    }

    #[test]
    fn loader_overlay_drawn_while_loading() {
        let t0 = Instant::now();
        let shell = ViewShell::new(t0, Duration::from_secs(8));
        let frame = build_shell(&ShellLayout::compute(WIDE, 0.0), &shell, &content());
        assert!(frame.texts.iter().any(|t| t.text == "LOADING 3D EXPERIENCE"));
        assert!(frame.rects.iter().any(|r| r.rect == [0.0, 0.0, WIDE.x, WIDE.y]));
    }
}
