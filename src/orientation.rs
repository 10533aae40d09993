// orientation.rs — 视角参数 (yaw / tilt / 太阳角) 与输入事件

use crate::config::GlobeConfig;

/// Wrap degrees into (-180, 180].
pub fn wrap_degrees(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let w = deg.rem_euclid(360.0);
    if w > 180.0 {
        w - 360.0
    } else {
        w
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationState {
    pub yaw: f64,
    pub tilt: f64,
    pub sun_angle: f64,
}

impl OrientationState {
    pub fn new(yaw: f64, tilt: f64) -> Self {
        let mut s = Self::default();
        s.rotate_yaw(yaw);
        s.rotate_tilt(tilt);
        s
    }

    pub fn rotate_yaw(&mut self, delta: f64) {
        self.yaw = wrap_degrees(self.yaw + delta);
    }

    /// Clamped, never wrapped: tilting past a pole stops at the pole.
    pub fn rotate_tilt(&mut self, delta: f64) {
        let t = self.tilt + delta;
        self.tilt = if t.is_nan() { 0.0 } else { t.clamp(-90.0, 90.0) };
    }

    pub fn advance_sun(&mut self, delta: f64) {
        self.sun_angle = wrap_degrees(self.sun_angle + delta);
    }

    /// One simulation tick: sun first, then any idle spin.
    pub fn tick(&mut self, sun_step: f64, spin_step: f64) {
        self.advance_sun(sun_step);
        if spin_step != 0.0 {
            self.rotate_yaw(spin_step);
        }
    }

    /// Back to the canonical view; the sun keeps its position.
    pub fn reset(&mut self) {
        self.yaw = 0.0;
        self.tilt = 0.0;
    }

    /// Apply an orientation delta. Trigger events are not orientation
    /// changes and are handed back to the caller.
    pub fn apply(&mut self, event: ControlEvent) -> Option<ControlEvent> {
        match event {
            ControlEvent::Yaw(d) => self.rotate_yaw(d),
            ControlEvent::Tilt(d) => self.rotate_tilt(d),
            ControlEvent::ResetView => self.reset(),
            other => return Some(other),
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Yaw(f64),
    Tilt(f64),
    ResetView,
    RequestReprojection,
    CycleMap,
}

/// Platform-neutral keys the input collaborator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    W,
    A,
    S,
    D,
    C,
    M,
    R,
}

pub fn key_event(key: ControlKey, step: f64) -> ControlEvent {
    match key {
        ControlKey::W => ControlEvent::Tilt(-step),
        ControlKey::S => ControlEvent::Tilt(step),
        ControlKey::A => ControlEvent::Yaw(-step),
        ControlKey::D => ControlEvent::Yaw(step),
        ControlKey::C => ControlEvent::RequestReprojection,
        ControlKey::M => ControlEvent::CycleMap,
        ControlKey::R => ControlEvent::ResetView,
    }
}

/// Turns click-drag cursor motion into yaw/tilt deltas.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    pressed: bool,
    last: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
        if !pressed {
            self.last = None;
        }
    }

    /// Horizontal motion spins the globe, vertical motion tilts it.
    pub fn moved(&mut self, x: f64, y: f64, sensitivity: f64) -> Vec<ControlEvent> {
        if !self.pressed {
            return Vec::new();
        }
        let events = match self.last {
            Some((lx, ly)) => {
                let (dx, dy) = (x - lx, y - ly);
                let mut ev = Vec::with_capacity(2);
                if dx != 0.0 {
                    ev.push(ControlEvent::Yaw(dx * sensitivity));
                }
                if dy != 0.0 {
                    ev.push(ControlEvent::Tilt(dy * sensitivity));
                }
                ev
            }
            None => Vec::new(),
        };
        self.last = Some((x, y));
        events
    }
}

/// Tick the orientation with the configured sun and spin rates.
pub fn tick_with(state: &mut OrientationState, config: &GlobeConfig) {
    let sun = if config.enable_sun_light {
        config.sun_step_deg
    } else {
        0.0
    };
    state.tick(sun, config.spin_deg_per_tick);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_clamps_at_pole() {
        let mut s = OrientationState::new(0.0, 85.0);
        s.rotate_tilt(10.0);
        assert_eq!(s.tilt, 90.0);
        s.rotate_tilt(-500.0);
        assert_eq!(s.tilt, -90.0);
    }

    #[test]
    fn yaw_wraps_into_half_open_range() {
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(720.0), 0.0);
        assert_eq!(wrap_degrees(f64::NAN), 0.0);

        let mut s = OrientationState::default();
        for _ in 0..40 {
            s.rotate_yaw(10.0);
        }
        assert!((s.yaw - 40.0).abs() < 1e-9, "yaw {}", s.yaw);
    }

    #[test]
    fn sun_wraps_like_yaw() {
        let mut s = OrientationState::default();
        for _ in 0..130 {
            s.advance_sun(1.5);
        }
        assert!((s.sun_angle - (195.0 - 360.0)).abs() < 1e-9);
    }

    #[test]
    fn tick_advances_sun_then_spin() {
        let mut config = GlobeConfig::default();
        config.spin_deg_per_tick = 0.25;
        let mut s = OrientationState::default();
        tick_with(&mut s, &config);
        assert!((s.sun_angle - 1.5).abs() < 1e-12);
        assert!((s.yaw - 0.25).abs() < 1e-12);

        config.enable_sun_light = false;
        tick_with(&mut s, &config);
        assert!((s.sun_angle - 1.5).abs() < 1e-12);
    }

    #[test]
    fn keys_map_to_deltas_and_triggers() {
        let mut s = OrientationState::default();
        assert_eq!(s.apply(key_event(ControlKey::W, 5.0)), None);
        assert_eq!(s.tilt, -5.0);
        assert_eq!(s.apply(key_event(ControlKey::D, 5.0)), None);
        assert_eq!(s.yaw, 5.0);
        assert_eq!(
            s.apply(key_event(ControlKey::C, 5.0)),
            Some(ControlEvent::RequestReprojection)
        );
        assert_eq!(
            s.apply(key_event(ControlKey::M, 5.0)),
            Some(ControlEvent::CycleMap)
        );
        s.apply(key_event(ControlKey::R, 5.0));
        assert_eq!((s.yaw, s.tilt), (0.0, 0.0));
    }

    #[test]
    fn drag_emits_scaled_deltas_only_while_pressed() {
        let mut drag = DragTracker::default();
        assert!(drag.moved(10.0, 10.0, 0.1).is_empty());

        drag.set_pressed(true);
        assert!(drag.moved(10.0, 10.0, 0.1).is_empty());
        let ev = drag.moved(30.0, 5.0, 0.1);
        assert_eq!(ev.len(), 2);
        match (ev[0], ev[1]) {
            (ControlEvent::Yaw(y), ControlEvent::Tilt(t)) => {
                assert!((y - 2.0).abs() < 1e-12);
                assert!((t + 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected events {other:?}"),
        }

        drag.set_pressed(false);
        assert!(drag.moved(50.0, 50.0, 0.1).is_empty());
    }
}
