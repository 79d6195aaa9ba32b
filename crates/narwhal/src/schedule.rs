//! Cooperative single-threaded scheduling on a virtual millisecond clock.
//!
//! A session has exactly one clock. Frame callbacks and a handful of timers (batch/sequential
//! admission, settlement arming) are the only suspension points. Every timer carries the
//! generation it was scheduled under; [`Scheduler::stop`] bumps the generation so anything still
//! in flight is recognizably stale.

/// ~60 frames per second.
pub const FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Admit the next batch or node.
    AdmitNext,
    /// Start monitoring ticks for settlement.
    ArmSettlement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    pub due: f64,
    pub kind: TimerKind,
    pub generation: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Due {
    Timer(Timer),
    Frame(f64),
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: f64,
    generation: u64,
    // Kept sorted by (due, seq).
    timers: Vec<Timer>,
    next_seq: u64,
    frame_at: Option<f64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn schedule(&mut self, delay_ms: f64, kind: TimerKind) {
        let delay = if delay_ms.is_finite() { delay_ms.max(0.0) } else { 0.0 };
        let timer = Timer {
            due: self.now + delay,
            kind,
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let at = self
            .timers
            .partition_point(|t| (t.due, t.seq) <= (timer.due, timer.seq));
        self.timers.insert(at, timer);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    pub fn pending(&self, kind: TimerKind) -> usize {
        self.timers.iter().filter(|t| t.kind == kind).count()
    }

    /// Requests a frame callback one frame interval from now. Repeated requests coalesce.
    pub fn request_frame(&mut self) {
        if self.frame_at.is_none() {
            self.frame_at = Some(self.now + FRAME_INTERVAL_MS);
        }
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_at.is_some()
    }

    /// Cancels every timer and frame request and starts a new generation.
    pub fn stop(&mut self) -> u64 {
        self.timers.clear();
        self.frame_at = None;
        self.generation += 1;
        self.generation
    }

    /// Pops the earliest callback due at or before `until`, advancing the clock to it. Timers win
    /// ties with frames. Returns `None` (and advances the clock to `until`) when nothing is due.
    pub fn pop_due(&mut self, until: f64) -> Option<Due> {
        let timer_due = self.timers.first().map(|t| t.due).filter(|d| *d <= until);
        let frame_due = self.frame_at.filter(|d| *d <= until);
        match (timer_due, frame_due) {
            (Some(td), Some(fd)) if fd < td => self.take_frame(fd),
            (Some(_), _) => {
                let timer = self.timers.remove(0);
                self.now = self.now.max(timer.due);
                Some(Due::Timer(timer))
            }
            (None, Some(fd)) => self.take_frame(fd),
            (None, None) => {
                self.now = self.now.max(until);
                None
            }
        }
    }

    fn take_frame(&mut self, at: f64) -> Option<Due> {
        self.frame_at = None;
        self.now = self.now.max(at);
        Some(Due::Frame(at))
    }
}
