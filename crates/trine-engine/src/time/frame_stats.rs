use std::time::{Duration, Instant};

/// Per-loop frame statistics.
///
/// Call [`tick`](Self::tick) once per loop iteration. The first frame is
/// measured from the start instant.
#[derive(Debug, Clone)]
pub struct FrameStats {
    start: Instant,
    last: Option<Instant>,
    frames: u64,
    min_frame: Option<Duration>,
    max_frame: Option<Duration>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last: None,
            frames: 0,
            min_frame: None,
            max_frame: None,
        }
    }

    pub fn tick(&mut self) {
        self.record(Instant::now());
    }

    /// Records a frame finished at `now`.
    pub fn record(&mut self, now: Instant) {
        let since = self.last.unwrap_or(self.start);
        let dt = now.saturating_duration_since(since);

        self.min_frame = Some(self.min_frame.map_or(dt, |m| m.min(dt)));
        self.max_frame = Some(self.max_frame.map_or(dt, |m| m.max(dt)));

        self.last = Some(now);
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Time between the start and the last recorded frame.
    pub fn elapsed(&self) -> Duration {
        self.last
            .map_or(Duration::ZERO, |last| last.saturating_duration_since(self.start))
    }

    pub fn min_frame(&self) -> Option<Duration> {
        self.min_frame
    }

    pub fn max_frame(&self) -> Option<Duration> {
        self.max_frame
    }

    /// Mean frames per second over [`elapsed`](Self::elapsed); zero until
    /// time has passed.
    pub fn average_fps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 { self.frames as f64 / secs } else { 0.0 }
    }

    /// One-line summary for shutdown logs.
    pub fn summary(&self) -> String {
        let ms = |d: Option<Duration>| d.map_or(0.0, |d| d.as_secs_f64() * 1000.0);
        format!(
            "{} frames in {:.2}s ({:.1} fps, frame time {:.2}..{:.2} ms)",
            self.frames,
            self.elapsed().as_secs_f64(),
            self.average_fps(),
            ms(self.min_frame),
            ms(self.max_frame),
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
