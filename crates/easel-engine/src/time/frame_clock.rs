use std::time::{Duration, Instant};

/// Longest delta handed to animations; covers stalls and debugger pauses.
const MAX_DT: Duration = Duration::from_millis(250);

/// Timing snapshot for one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started, the sum of every clamped `dt`.
    pub elapsed: f32,
    pub frame_index: u64,
}

/// Produces one [`FrameTime`] per tick.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: f32,
    frame_index: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: None,
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    /// Advances the clock to now. The first tick reports `dt == 0`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last).min(MAX_DT),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.elapsed += dt.as_secs_f32();

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index += 1;
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_no_delta() {
        let mut clock = FrameClock::new();
        let t = clock.tick_at(Instant::now());
        assert_eq!(t.dt, 0.0);
        assert_eq!(t.frame_index, 0);
    }

    #[test]
    fn deltas_accumulate_and_stalls_are_clamped() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.tick_at(start);

        let t = clock.tick_at(start + Duration::from_millis(100));
        assert!((t.dt - 0.1).abs() < 1e-6);
        assert_eq!(t.frame_index, 1);

        let t = clock.tick_at(start + Duration::from_secs(10));
        assert!((t.dt - 0.25).abs() < 1e-6);
        assert!((t.elapsed - 0.35).abs() < 1e-5);
    }
}
