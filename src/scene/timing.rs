use std::time::{Duration, Instant};

/// Frames per fps measurement.
pub const FPS_WINDOW: u32 = 5;

/// Frame clock: elapsed time, frame delta and frames per second.
#[derive(Debug, Clone)]
pub struct Timing {
    start_time: Instant,
    last_update: Instant,
    window_start: Instant,
    window_frames: u32,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
    /// Frames per second over the last completed window
    pub fps: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

impl Timing {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    #[must_use]
    pub fn starting_at(now: Instant) -> Self {
        Self {
            start_time: now,
            last_update: now,
            window_start: now,
            window_frames: 0,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Advances the clock to now. Returns the new fps when a window completes.
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.delta = now.saturating_duration_since(self.last_update);
        self.elapsed = now.saturating_duration_since(self.start_time);
        self.last_update = now;
        self.frame_count += 1;

        self.window_frames += 1;
        if self.window_frames < FPS_WINDOW {
            return None;
        }
        let window = now.saturating_duration_since(self.window_start).as_secs_f32();
        if window > 0.0 {
            self.fps = self.window_frames as f32 / window;
        }
        self.window_start = now;
        self.window_frames = 0;
        Some(self.fps)
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}
