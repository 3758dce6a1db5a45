//! Time-based eased interpolation.
//!
//! A [`TweenSlot`] holds at most one in-flight [`Tween`] for a single property.
//! Starting a new tween on a slot replaces the previous one, so a property is
//! only ever driven toward one destination.

use std::time::Duration;

use glam::Vec3;
use instant::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// gsap 默认的 power1.out
    QuadOut,
    /// power3.inOut，相机动画使用
    CubicInOut,
}

impl Easing {
    pub fn evaluate(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let f = -2.0 * t + 2.0;
                    1.0 - f * f * f / 2.0
                }
            }
        }
    }
}

pub trait Lerp: Copy {
    fn lerp_to(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tween<T: Lerp> {
    pub from: T,
    pub to: T,
    pub start: Instant,
    pub delay: Duration,
    pub duration: Duration,
    pub easing: Easing,
}

impl<T: Lerp> Tween<T> {
    pub fn progress(&self, now: Instant) -> f32 {
        let elapsed = if now > self.start { now.duration_since(self.start) } else { Duration::ZERO };
        let Some(running) = elapsed.checked_sub(self.delay) else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        (running.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn sample(&self, now: Instant) -> T {
        self.from.lerp_to(self.to, self.easing.evaluate(self.progress(now)))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// One animated property: its current value plus at most one running tween.
#[derive(Debug, Clone, Copy)]
pub struct TweenSlot<T: Lerp> {
    value: T,
    active: Option<Tween<T>>,
}

impl<T: Lerp> TweenSlot<T> {
    pub fn new(value: T) -> Self {
        Self { value, active: None }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn active(&self) -> Option<&Tween<T>> {
        self.active.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// 从当前值出发开始新的动画，替换掉任何进行中的动画
    pub fn start(&mut self, to: T, duration: Duration, easing: Easing, now: Instant) {
        self.start_delayed(to, duration, Duration::ZERO, easing, now);
    }

    pub fn start_delayed(&mut self, to: T, duration: Duration, delay: Duration, easing: Easing, now: Instant) {
        self.active = Some(Tween {
            from: self.value,
            to,
            start: now,
            delay,
            duration,
            easing,
        });
    }

    /// 跳到指定值，取消进行中的动画
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.active = None;
    }

    /// Overwrites the current value from outside (e.g. user orbit) while
    /// leaving any running tween in place.
    pub fn sync(&mut self, value: T) {
        self.value = value;
    }

    /// Advances the slot. Returns `true` while a tween was applied this step;
    /// the step that reaches the end value also returns `true` and clears it.
    pub fn advance(&mut self, now: Instant) -> bool {
        let Some(tween) = self.active else {
            return false;
        };
        self.value = tween.sample(now);
        if tween.is_finished(now) {
            self.value = tween.to;
            self.active = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::QuadOut, Easing::CubicInOut] {
            assert_eq!(easing.evaluate(0.0), 0.0);
            assert!((easing.evaluate(1.0) - 1.0).abs() < 1e-6);
            assert_eq!(easing.evaluate(-1.0), 0.0);
            assert!((easing.evaluate(2.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cubic_in_out_is_symmetric() {
        let e = Easing::CubicInOut;
        assert!((e.evaluate(0.5) - 0.5).abs() < 1e-6);
        assert!(e.evaluate(0.25) < 0.25);
        assert!(e.evaluate(0.75) > 0.75);
        assert!((e.evaluate(0.2) + e.evaluate(0.8) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn slot_reaches_target_and_clears() {
        let t0 = Instant::now();
        let mut slot = TweenSlot::new(0.0f32);
        slot.start(10.0, ms(1000), Easing::Linear, t0);

        assert!(slot.advance(t0 + ms(500)));
        assert!((slot.value() - 5.0).abs() < 1e-3);
        assert!(slot.advance(t0 + ms(1200)));
        assert_eq!(slot.value(), 10.0);
        assert!(!slot.is_animating());
        assert!(!slot.advance(t0 + ms(1300)));
    }

    #[test]
    fn new_tween_supersedes_running_one() {
        let t0 = Instant::now();
        let mut slot = TweenSlot::new(Vec3::ZERO);
        slot.start(Vec3::X * 10.0, ms(1000), Easing::Linear, t0);
        slot.advance(t0 + ms(500));

        slot.start(Vec3::Y * 10.0, ms(1000), Easing::Linear, t0 + ms(500));
        let active = slot.active().unwrap();
        assert_eq!(active.to, Vec3::Y * 10.0);
        assert!((active.from - Vec3::X * 5.0).length() < 1e-3);

        slot.advance(t0 + ms(2000));
        assert!((slot.value() - Vec3::Y * 10.0).length() < 1e-6);
    }

    #[test]
    fn delay_holds_start_value() {
        let t0 = Instant::now();
        let mut slot = TweenSlot::new(1.0f32);
        slot.start_delayed(0.0, ms(400), ms(200), Easing::Linear, t0);
        slot.advance(t0 + ms(100));
        assert_eq!(slot.value(), 1.0);
        slot.advance(t0 + ms(400));
        assert!((slot.value() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let t0 = Instant::now();
        let mut slot = TweenSlot::new(0.0f32);
        slot.start(3.0, Duration::ZERO, Easing::QuadOut, t0);
        assert!(slot.advance(t0));
        assert_eq!(slot.value(), 3.0);
        assert!(!slot.is_animating());
    }
}
