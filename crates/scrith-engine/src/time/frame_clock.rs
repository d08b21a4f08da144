use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GameTime {
    /// Seconds accumulated over all ticks (sum of clamped deltas).
    pub total: f32,

    /// Time elapsed since the previous tick, in seconds.
    pub delta: f32,

    /// Average frames per second since the clock started.
    pub fps_total: f32,

    /// Frames counted during the last completed second.
    pub fps: f32,

    /// Monotonic frame counter.
    pub frame: u64,
}

/// Frame clock producing `GameTime` snapshots.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    dt_min: Duration,
    dt_max: Duration,

    total: Duration,
    frame: u64,

    window_elapsed: Duration,
    window_frames: u32,
    fps: f32,
}

impl FrameClock {
    /// Creates a new clock with default clamps.
    ///
    /// Clamp rationale:
    /// - minimum prevents zero-dt behavior from tight loops on some platforms
    /// - maximum prevents simulation explosions after long stalls
    pub fn new() -> Self {
        Self::with_clamps(
            Duration::from_micros(100), // 0.0001s
            Duration::from_millis(250), // 0.25s
        )
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            dt_min,
            dt_max,
            total: Duration::ZERO,
            frame: 0,
            window_elapsed: Duration::ZERO,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Resets the delta baseline (after a resize or a long stall).
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock by the wall time since the previous tick.
    pub fn tick(&mut self) -> GameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        self.advance(dt)
    }

    /// Advances the clock by `dt` (clamped).
    pub fn advance(&mut self, dt: Duration) -> GameTime {
        let dt = dt.clamp(self.dt_min, self.dt_max);

        self.total += dt;
        self.frame = self.frame.wrapping_add(1);

        self.window_elapsed += dt;
        self.window_frames += 1;
        if self.window_elapsed >= Duration::from_secs(1) {
            self.fps = self.window_frames as f32 / self.window_elapsed.as_secs_f32();
            self.window_elapsed = Duration::ZERO;
            self.window_frames = 0;
        }

        let total = self.total.as_secs_f32();
        GameTime {
            total,
            delta: dt.as_secs_f32(),
            fps_total: if total > 0.0 { self.frame as f32 / total } else { 0.0 },
            fps: self.fps,
            frame: self.frame,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_clamped() {
        let mut clock = FrameClock::new();
        let t = clock.advance(Duration::from_secs(5));
        assert!((t.delta - 0.25).abs() < 1e-6);
        let t = clock.advance(Duration::ZERO);
        assert!((t.delta - 0.0001).abs() < 1e-7);
    }

    #[test]
    fn fps_updates_after_one_second() {
        let mut clock = FrameClock::new();
        let mut t = GameTime::default();
        for _ in 0..50 {
            t = clock.advance(Duration::from_millis(20));
        }
        assert_eq!(t.frame, 50);
        assert!((t.total - 1.0).abs() < 1e-4);
        assert!((t.fps - 50.0).abs() < 0.5);
        assert!((t.fps_total - 50.0).abs() < 0.5);
    }

    #[test]
    fn fps_is_zero_before_first_second() {
        let mut clock = FrameClock::new();
        let t = clock.advance(Duration::from_millis(16));
        assert_eq!(t.fps, 0.0);
        assert_eq!(t.frame, 1);
    }
}
