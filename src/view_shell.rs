//! Page chrome state: header, intro copy, slide-in detail panel and the
//! loading indicator. Everything here is driven by the active panel and by
//! time; drawing happens in [`crate::overlay`].

use std::time::Duration;

use instant::Instant;

use crate::animation::{Easing, TweenSlot};
use crate::scene::panel::PanelKey;

pub const HEADER_DIMMED_OPACITY: f32 = 0.4;
pub const HEADER_FADE: Duration = Duration::from_millis(500);
pub const INTRO_FADE_OUT: Duration = Duration::from_millis(400);
pub const INTRO_FADE_IN: Duration = Duration::from_millis(500);
pub const INTRO_FADE_IN_DELAY: Duration = Duration::from_millis(200);
pub const PANEL_SLIDE: Duration = Duration::from_millis(500);
pub const SCROLL_TO_TOP: Duration = Duration::from_millis(300);
pub const LOADER_FADE: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    Loading,
    FadingOut,
    Hidden,
}

/// 加载遮罩：场景就绪或超时之后淡出
#[derive(Debug)]
pub struct LoadingIndicator {
    deadline: Instant,
    ready: bool,
    opacity: TweenSlot<f32>,
}

impl LoadingIndicator {
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            deadline: now + timeout,
            ready: false,
            opacity: TweenSlot::new(1.0),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 第一次调用生效，之后忽略
    pub fn mark_ready(&mut self, now: Instant) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.opacity.start(0.0, LOADER_FADE, Easing::QuadOut, now);
    }

    pub fn tick(&mut self, now: Instant) {
        if !self.ready && now >= self.deadline {
            log::warn!("Scene assets did not settle before the loading timeout; showing the scene anyway.");
            self.mark_ready(now);
        }
        self.opacity.advance(now);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.value()
    }

    pub fn phase(&self) -> LoaderPhase {
        if !self.ready {
            LoaderPhase::Loading
        } else if self.opacity.is_animating() {
            LoaderPhase::FadingOut
        } else {
            LoaderPhase::Hidden
        }
    }
}

#[derive(Debug)]
pub struct ViewShell {
    active_panel: Option<PanelKey>,
    header_opacity: TweenSlot<f32>,
    intro_opacity: TweenSlot<f32>,
    intro_interactive: bool,
    /// 0 = 收起，1 = 完全展开
    panel_slide: TweenSlot<f32>,
    content_scroll: TweenSlot<f32>,
    content_max_scroll: f32,
    pub loader: LoadingIndicator,
}

impl ViewShell {
    pub fn new(now: Instant, loading_timeout: Duration) -> Self {
        Self {
            active_panel: None,
            header_opacity: TweenSlot::new(1.0),
            intro_opacity: TweenSlot::new(1.0),
            intro_interactive: true,
            panel_slide: TweenSlot::new(0.0),
            content_scroll: TweenSlot::new(0.0),
            content_max_scroll: 0.0,
            loader: LoadingIndicator::new(now, loading_timeout),
        }
    }

    pub fn active_panel(&self) -> Option<PanelKey> {
        self.active_panel
    }

    pub fn is_panel_open(&self) -> bool {
        self.active_panel.is_some()
    }

    /// Opens `key`, replacing any open panel. Chrome transitions only run
    /// when the open/closed state actually flips.
    pub fn open(&mut self, key: PanelKey, now: Instant) {
        let was_open = self.is_panel_open();
        self.active_panel = Some(key);
        if was_open {
            return;
        }
        self.header_opacity.start(HEADER_DIMMED_OPACITY, HEADER_FADE, Easing::QuadOut, now);
        self.intro_opacity.start(0.0, INTRO_FADE_OUT, Easing::QuadOut, now);
        self.panel_slide.start(1.0, PANEL_SLIDE, Easing::CubicInOut, now);
        self.scroll_to_top(now);
    }

    pub fn close(&mut self, now: Instant) {
        if self.active_panel.take().is_none() {
            return;
        }
        self.header_opacity.start(1.0, HEADER_FADE, Easing::QuadOut, now);
        self.intro_interactive = true;
        self.intro_opacity.start_delayed(1.0, INTRO_FADE_IN, INTRO_FADE_IN_DELAY, Easing::QuadOut, now);
        self.panel_slide.start(0.0, PANEL_SLIDE, Easing::CubicInOut, now);
        self.scroll_to_top(now);
    }

    fn scroll_to_top(&mut self, now: Instant) {
        self.content_scroll.start(0.0, SCROLL_TO_TOP, Easing::QuadOut, now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.header_opacity.advance(now);
        let fading_out = self.intro_opacity.active().is_some_and(|t| t.to == 0.0);
        self.intro_opacity.advance(now);
        // 淡出动画结束后才禁用交互
        if fading_out && !self.intro_opacity.is_animating() && self.is_panel_open() {
            self.intro_interactive = false;
        }
        self.panel_slide.advance(now);
        self.content_scroll.advance(now);
        self.loader.tick(now);
    }

    pub fn header_opacity(&self) -> f32 {
        self.header_opacity.value()
    }

    pub fn intro_opacity(&self) -> f32 {
        self.intro_opacity.value()
    }

    pub fn intro_interactive(&self) -> bool {
        self.intro_interactive
    }

    pub fn panel_slide(&self) -> f32 {
        self.panel_slide.value()
    }

    pub fn content_scroll(&self) -> f32 {
        self.content_scroll.value()
    }

    /// 渲染器排版后告知内容可滚动的最大距离
    pub fn set_content_max_scroll(&mut self, max_scroll: f32) {
        self.content_max_scroll = max_scroll.max(0.0);
        if !self.content_scroll.is_animating() && self.content_scroll.value() > self.content_max_scroll {
            self.content_scroll.set(self.content_max_scroll);
        }
    }

    /// 正值向下滚动
    pub fn scroll_content_by(&mut self, delta: f32) {
        if !self.is_panel_open() {
            return;
        }
        let next = (self.content_scroll.value() + delta).clamp(0.0, self.content_max_scroll);
        self.content_scroll.set(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> (ViewShell, Instant) {
        let now = Instant::now();
        (ViewShell::new(now, Duration::from_secs(8)), now)
    }

    #[test]
    fn open_then_close_restores_intro() {
        let (mut shell, t0) = shell();
        shell.open(PanelKey::About, t0);
        shell.tick(t0 + Duration::from_secs(1));
        assert_eq!(shell.intro_opacity(), 0.0);
        assert!(!shell.intro_interactive());
        assert_eq!(shell.header_opacity(), HEADER_DIMMED_OPACITY);
        assert_eq!(shell.panel_slide(), 1.0);

        let t1 = t0 + Duration::from_secs(1);
        shell.close(t1);
        assert!(shell.intro_interactive(), "interactive again as soon as the panel closes");
        assert_eq!(shell.active_panel(), None);
        shell.tick(t1 + Duration::from_secs(1));
        assert_eq!(shell.intro_opacity(), 1.0);
        assert_eq!(shell.header_opacity(), 1.0);
        assert_eq!(shell.panel_slide(), 0.0);
    }

    #[test]
    fn intro_stays_interactive_until_fade_completes() {
        let (mut shell, t0) = shell();
        shell.open(PanelKey::Skills, t0);
        shell.tick(t0 + Duration::from_millis(200));
        assert!(shell.intro_interactive());
        shell.tick(t0 + INTRO_FADE_OUT);
        assert!(!shell.intro_interactive());
    }

    #[test]
    fn switching_panels_replaces_key() {
        let (mut shell, t0) = shell();
        shell.open(PanelKey::Skills, t0);
        shell.open(PanelKey::Projects, t0 + Duration::from_millis(50));
        assert_eq!(shell.active_panel(), Some(PanelKey::Projects));
    }

    #[test]
    fn scroll_is_clamped_and_reset_on_open() {
        let (mut shell, t0) = shell();
        shell.scroll_content_by(100.0);
        assert_eq!(shell.content_scroll(), 0.0, "closed panel ignores scrolling");

        shell.open(PanelKey::Experience, t0);
        shell.tick(t0 + Duration::from_secs(1));
        shell.set_content_max_scroll(120.0);
        shell.scroll_content_by(500.0);
        assert_eq!(shell.content_scroll(), 120.0);
        shell.scroll_content_by(-50.0);
        assert_eq!(shell.content_scroll(), 70.0);

        let t1 = t0 + Duration::from_secs(1);
        shell.close(t1);
        shell.tick(t1 + SCROLL_TO_TOP);
        assert_eq!(shell.content_scroll(), 0.0);
    }

    #[test]
    fn loader_times_out() {
        let t0 = Instant::now();
        let mut loader = LoadingIndicator::new(t0, Duration::from_secs(2));
        loader.tick(t0 + Duration::from_secs(1));
        assert_eq!(loader.phase(), LoaderPhase::Loading);
        loader.tick(t0 + Duration::from_secs(2));
        assert!(loader.is_ready());
        assert_eq!(loader.phase(), LoaderPhase::FadingOut);
        loader.tick(t0 + Duration::from_secs(3));
        assert_eq!(loader.phase(), LoaderPhase::Hidden);
        assert_eq!(loader.opacity(), 0.0);
    }

    #[test]
    fn loader_ready_is_idempotent() {
        let t0 = Instant::now();
        let mut loader = LoadingIndicator::new(t0, Duration::from_secs(8));
        loader.mark_ready(t0);
        loader.tick(t0 + LOADER_FADE);
        assert_eq!(loader.phase(), LoaderPhase::Hidden);
        loader.mark_ready(t0 + LOADER_FADE);
        assert_eq!(loader.phase(), LoaderPhase::Hidden);
    }
}
