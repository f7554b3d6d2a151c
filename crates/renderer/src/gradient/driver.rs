/// Largest time step a single frame may advance, in milliseconds.
///
/// Long gaps (a backgrounded window, a debugger pause) advance the animation
/// by one 15 fps frame instead of jumping.
pub const MAX_FRAME_DELTA_MS: f64 = 1000.0 / 15.0;

/// Handle of a frame callback requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Host-side source of animation frames.
///
/// A requested frame eventually arrives as a call to
/// [`super::Gradient::animate`] with the frame's timestamp, unless it is
/// cancelled first.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Accumulates animation time from frame timestamps.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    time: f64,
    last: f64,
    playing: bool,
    pending: Option<FrameRequest>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated animation time in milliseconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Marks the driver as playing and requests the first frame.
    ///
    /// Accumulated time is kept, so a restart resumes where `stop` left off.
    pub fn start(&mut self, scheduler: &mut impl FrameScheduler) {
        self.playing = true;
        self.schedule_next(scheduler);
    }

    /// Stops playback and cancels the outstanding frame, if any.
    pub fn stop(&mut self, scheduler: &mut impl FrameScheduler) {
        self.playing = false;
        if let Some(request) = self.pending.take() {
            scheduler.cancel_frame(request);
        }
    }

    /// Consumes the pending frame and advances time to `timestamp`.
    ///
    /// Returns the new accumulated time, or `None` when stopped.
    pub fn advance(&mut self, timestamp: f64) -> Option<f64> {
        self.pending = None;
        if !self.playing {
            return None;
        }
        let delta = (timestamp - self.last).clamp(0.0, MAX_FRAME_DELTA_MS);
        self.time += delta;
        self.last = timestamp;
        Some(self.time)
    }

    /// Requests the next frame while playing; at most one is outstanding.
    pub fn schedule_next(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.playing && self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }
}
