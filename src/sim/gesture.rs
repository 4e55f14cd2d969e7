//! Swipe gesture tracking
//!
//! Pointer samples accumulate into a short windowed polyline; hit testing
//! runs against its consecutive segments. Every timer here is a sim-clock
//! deadline owned by the trace, so the whole thing steps under a virtual
//! clock in tests.

use glam::Vec2;
use serde::Serialize;

use super::geometry::angle_of;
use crate::tuning::GestureTuning;

/// One pointer position with its sim-clock timestamp
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PointSample {
    pub pos: Vec2,
    pub t_ms: f64,
}

/// Windowed trace of recent pointer motion
#[derive(Debug, Clone, Default, Serialize)]
pub struct GestureTrace {
    samples: Vec<PointSample>,
    tracking: bool,
    /// Auto-clear when no movement arrives before this deadline ("tap, not swipe")
    idle_deadline_ms: Option<f64>,
    /// After release the last sample lingers until this deadline (trail fade)
    clear_deadline_ms: Option<f64>,
    last_whoosh_ms: Option<f64>,
}

impl GestureTrace {
    /// Begin a new gesture at `pos`. Supersedes any pending clear.
    pub fn pointer_down(&mut self, pos: Vec2, now_ms: f64, tuning: &GestureTuning) {
        self.samples.clear();
        self.samples.push(PointSample { pos, t_ms: now_ms });
        self.tracking = true;
        self.idle_deadline_ms = Some(now_ms + tuning.idle_timeout_ms);
        self.clear_deadline_ms = None;
    }

    /// Append a movement sample. Returns true when this movement is fast
    /// enough to earn a whoosh (speed threshold + cooldown).
    pub fn pointer_move(&mut self, pos: Vec2, now_ms: f64, tuning: &GestureTuning) -> bool {
        if !self.tracking {
            return false;
        }
        self.samples.push(PointSample { pos, t_ms: now_ms });
        self.idle_deadline_ms = Some(now_ms + tuning.idle_timeout_ms);
        self.prune(tuning.window_ms);

        let Some(speed) = self.speed() else {
            return false;
        };
        if speed < tuning.whoosh_speed {
            return false;
        }
        let off_cooldown = match self.last_whoosh_ms {
            Some(t) => now_ms - t >= tuning.whoosh_cooldown_ms,
            None => true,
        };
        if off_cooldown {
            self.last_whoosh_ms = Some(now_ms);
        }
        off_cooldown
    }

    /// End the gesture: keep only the newest sample and schedule the clear.
    pub fn pointer_up(&mut self, now_ms: f64, tuning: &GestureTuning) {
        self.tracking = false;
        self.idle_deadline_ms = None;
        if self.samples.len() > 1 {
            let last = self.samples[self.samples.len() - 1];
            self.samples.clear();
            self.samples.push(last);
        }
        if !self.samples.is_empty() {
            self.clear_deadline_ms = Some(now_ms + tuning.clear_delay_ms);
        }
    }

    /// Expire deadlines. Call once per tick after input is applied.
    pub fn update(&mut self, now_ms: f64) {
        if self.tracking {
            if let Some(deadline) = self.idle_deadline_ms {
                if now_ms >= deadline {
                    self.clear();
                }
            }
        } else if let Some(deadline) = self.clear_deadline_ms {
            if now_ms >= deadline {
                self.clear();
            }
        }
    }

    /// Drop everything immediately (restart, game over).
    pub fn clear(&mut self) {
        self.samples.clear();
        self.tracking = false;
        self.idle_deadline_ms = None;
        self.clear_deadline_ms = None;
    }

    /// Drop samples older than `window_ms` behind the newest.
    fn prune(&mut self, window_ms: f64) {
        let Some(newest) = self.samples.last() else {
            return;
        };
        let cutoff = newest.t_ms - window_ms;
        self.samples.retain(|s| s.t_ms >= cutoff);
    }

    /// Speed between the last two samples, pixels per millisecond.
    pub fn speed(&self) -> Option<f32> {
        if self.samples.len() < 2 {
            return None;
        }
        let a = self.samples[self.samples.len() - 2];
        let b = self.samples[self.samples.len() - 1];
        let dt_ms = (b.t_ms - a.t_ms).max(1.0);
        Some(a.pos.distance(b.pos) / dt_ms as f32)
    }

    /// Overall swipe direction, first sample to last. 0 with fewer than two
    /// samples (the permissive default).
    pub fn swipe_angle(&self) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        angle_of(self.samples[0].pos, self.samples[self.samples.len() - 1].pos)
    }

    /// Hit testing runs only on an active gesture with a real segment.
    pub fn is_active(&self) -> bool {
        self.tracking && self.samples.len() >= 2
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn samples(&self) -> &[PointSample] {
        &self.samples
    }

    /// Consecutive sample pairs, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.samples.windows(2).map(|w| (w[0].pos, w[1].pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tuning() -> GestureTuning {
        crate::tuning::Tuning::default().gesture
    }

    #[test]
    fn test_tap_clears_on_idle_timeout() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::new(100.0, 100.0), 0.0, &t);
        assert!(trace.is_tracking());

        trace.update(100.0);
        assert!(trace.is_tracking());

        trace.update(200.0);
        assert!(!trace.is_tracking());
        assert!(trace.samples().is_empty());
    }

    #[test]
    fn test_moves_keep_the_trace_alive_and_pruned() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);
        for i in 1..=8 {
            let now = i as f64 * 10.0;
            trace.pointer_move(Vec2::new(i as f32 * 5.0, 0.0), now, &t);
            trace.update(now);
        }
        assert!(trace.is_active());
        // Newest sample is at t=80; the down sample at t=0 must be gone
        let first = trace.samples().first().unwrap();
        assert!(first.t_ms >= 80.0 - t.window_ms);
    }

    #[test]
    fn test_pointer_up_keeps_one_sample_then_clears() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);
        trace.pointer_move(Vec2::new(20.0, 0.0), 10.0, &t);
        trace.pointer_up(20.0, &t);

        assert!(!trace.is_tracking());
        assert_eq!(trace.samples().len(), 1);

        trace.update(219.0);
        assert_eq!(trace.samples().len(), 1);
        trace.update(220.0);
        assert!(trace.samples().is_empty());
    }

    #[test]
    fn test_new_gesture_cancels_pending_clear() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);
        trace.pointer_up(10.0, &t);
        trace.pointer_down(Vec2::new(50.0, 50.0), 100.0, &t);

        // The old clear deadline (t=210) must not wipe the new gesture
        trace.update(250.0);
        assert!(trace.is_tracking());
        assert_eq!(trace.samples().len(), 1);
    }

    #[test]
    fn test_speed_clamps_tiny_dt() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);
        // Same timestamp: dt clamps to 1ms instead of dividing by zero
        trace.pointer_move(Vec2::new(5.0, 0.0), 0.0, &t);
        assert_eq!(trace.speed(), Some(5.0));
    }

    #[test]
    fn test_whoosh_threshold_and_cooldown() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);

        // Slow move: 10px over 10ms = 1.0 px/ms, under the 1.5 threshold
        assert!(!trace.pointer_move(Vec2::new(10.0, 0.0), 10.0, &t));
        // Fast move: 100px over 10ms
        assert!(trace.pointer_move(Vec2::new(110.0, 0.0), 20.0, &t));

        // Keep dragging fast; the next whoosh lands exactly when the
        // cooldown from t=20 lapses
        let mut x = 110.0;
        for step in 3..=17 {
            let now = step as f64 * 10.0;
            x += 100.0;
            let whooshed = trace.pointer_move(Vec2::new(x, 0.0), now, &t);
            assert_eq!(whooshed, now - 20.0 >= t.whoosh_cooldown_ms, "at t={now}");
        }
    }

    #[test]
    fn test_swipe_angle_first_to_last() {
        let t = tuning();
        let mut trace = GestureTrace::default();
        trace.pointer_down(Vec2::ZERO, 0.0, &t);
        assert_eq!(trace.swipe_angle(), 0.0); // <2 samples

        trace.pointer_move(Vec2::new(10.0, 10.0), 5.0, &t);
        trace.pointer_move(Vec2::new(30.0, 0.0), 10.0, &t);
        // First (0,0) to last (30,0): horizontal
        assert_eq!(trace.swipe_angle(), 0.0);
    }

    proptest! {
        /// After any op sequence, every retained sample is within the window
        /// of the newest one.
        #[test]
        fn prop_samples_stay_within_window(
            ops in proptest::collection::vec(
                (0u8..4, -60.0f32..60.0, -60.0f32..60.0, 0.0f64..80.0),
                1..100,
            )
        ) {
            let t = tuning();
            let mut trace = GestureTrace::default();
            let mut now = 0.0f64;
            let mut pos = Vec2::new(500.0, 500.0);

            for (op, dx, dy, dt) in ops {
                now += dt;
                pos += Vec2::new(dx, dy);
                match op {
                    0 => trace.pointer_down(pos, now, &t),
                    1 | 2 => {
                        trace.pointer_move(pos, now, &t);
                    }
                    _ => trace.pointer_up(now, &t),
                }
                trace.update(now);

                if let Some(newest) = trace.samples().last() {
                    for s in trace.samples() {
                        prop_assert!(newest.t_ms - s.t_ms <= t.window_ms);
                    }
                }
            }
        }
    }
}
