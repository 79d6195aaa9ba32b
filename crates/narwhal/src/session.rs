//! One running graph view.
//!
//! A [`Session`] owns the clock and every component: coordinates, orchestrator, simulation core,
//! and reveal controller. Time only moves through [`Session::advance`]; between calls nothing
//! happens. Each step is a single timer or frame callback, after which pending events are
//! dispatched in emission order.

use crate::coords::{CoordinateSystem, ViewTransform};
use crate::error::Result;
use crate::events::{EngineEvent, EventChannel};
use crate::orchestrator::{Admission, Orchestrator};
use crate::render::Frame;
use crate::reveal::{RevealController, RevealPhase};
use crate::schedule::{Due, FRAME_INTERVAL_MS, Scheduler, Timer, TimerKind};
use crate::simulation::{SimulationCore, SyncDecision};
use narwhal_core::{GraphData, LayoutConfig, NodeMode, RenderMode};

#[derive(Debug)]
pub struct Session {
    config: LayoutConfig,
    coords: CoordinateSystem,
    scheduler: Scheduler,
    events: EventChannel,
    orchestrator: Orchestrator,
    core: SimulationCore,
    reveal: RevealController,
    data: Option<GraphData>,
    settlement_fired: bool,
    stopped: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl Session {
    pub fn new(config: LayoutConfig) -> Self {
        let config = config.validated();
        Self {
            coords: CoordinateSystem::with_perimeter_factor(config.physics.perimeter_radius_factor),
            scheduler: Scheduler::new(),
            events: EventChannel::default(),
            orchestrator: Orchestrator::new(&config),
            core: SimulationCore::new(&config),
            reveal: RevealController::new(&config),
            data: None,
            settlement_fired: false,
            stopped: false,
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn core(&self) -> &SimulationCore {
        &self.core
    }

    pub fn reveal(&self) -> &RevealController {
        &self.reveal
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn coords(&self) -> &CoordinateSystem {
        &self.coords
    }

    pub fn coords_mut(&mut self) -> &mut CoordinateSystem {
        &mut self.coords
    }

    pub fn data(&self) -> Option<&GraphData> {
        self.data.as_ref()
    }

    /// Every event emitted so far, oldest first.
    pub fn events(&self) -> &[EngineEvent] {
        self.events.log()
    }

    /// Replaces the dataset and starts a fresh render.
    pub fn load(&mut self, data: GraphData) {
        self.restart(data);
    }

    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let data = GraphData::from_json(text)?;
        self.load(data);
        Ok(())
    }

    /// New upstream data for the current view. Same node-id set updates in place; anything else
    /// (or `force_restart`) re-renders from scratch.
    pub fn sync(&mut self, data: GraphData, force_restart: bool) -> SyncDecision {
        if self.data.is_none() {
            self.restart(data);
            return SyncDecision::Restart;
        }
        match self.core.sync_decision(&data, force_restart) {
            SyncDecision::Gentle => {
                self.core.gentle_sync(&data);
                if self.reveal.phase() == RevealPhase::Revealed {
                    self.core.set_link_opacity(1.0);
                }
                self.data = Some(data);
                self.scheduler.request_frame();
                SyncDecision::Gentle
            }
            SyncDecision::Restart => {
                self.restart(data);
                SyncDecision::Restart
            }
        }
    }

    pub fn set_mode(&mut self, id: &str, mode: NodeMode) -> bool {
        let changed = self.core.set_mode(id, mode);
        if changed {
            self.scheduler.request_frame();
        }
        changed
    }

    pub fn set_visibility(&mut self, id: &str, visible: bool) -> bool {
        let changed = self.core.set_hidden(id, !visible);
        if changed {
            self.scheduler.request_frame();
        }
        changed
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        let mut config = self.config.clone();
        config.render_mode = mode;
        self.reconfigure(config);
    }

    /// Applies new settings to every component. A running dataset is not restarted.
    pub fn reconfigure(&mut self, config: LayoutConfig) {
        self.config = config.validated();
        self.orchestrator.reconfigure(&self.config);
        self.core.reconfigure(&self.config);
        self.reveal.reconfigure(&self.config);
    }

    pub fn zoom(&mut self, transform: ViewTransform) {
        self.coords.set_transform(transform);
    }

    /// Cancels every pending timer and frame and halts the simulation.
    pub fn stop(&mut self) {
        let generation = self.scheduler.stop();
        self.orchestrator.stop();
        self.core.halt();
        self.stopped = true;
        tracing::info!(target: "narwhal::session", generation, "session.stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Skips the rest of the reveal: every node and edge becomes fully opaque now. Returns `false`
    /// if the graph was already revealed.
    pub fn force_reveal_all(&mut self) -> bool {
        if self.reveal.phase() == RevealPhase::Revealed {
            return false;
        }
        let at = self.scheduler.now();
        self.reveal.force_reveal_all(at, &mut self.core);
        self.events.emit(EngineEvent::RevealComplete {
            generation: self.scheduler.generation(),
            at,
        });
        self.dispatch();
        true
    }

    /// Returns the reveal to hidden. The next time the layout comes to rest it is revealed again.
    pub fn reset_reveal(&mut self) {
        self.reveal.reset(&mut self.core);
        self.settlement_fired = false;
        tracing::info!(target: "narwhal::session", "reveal.reset");
    }

    pub fn frame(&self) -> Frame {
        Frame::capture(&self.core, &self.coords, self.scheduler.now())
    }

    pub fn advance(&mut self, ms: f64) {
        self.advance_with(ms, |_| {});
    }

    /// Advances the clock by `ms`, running every timer and frame callback that falls due.
    /// `observe` sees the graph after each frame callback.
    pub fn advance_with(&mut self, ms: f64, mut observe: impl FnMut(&Frame)) {
        if !ms.is_finite() || ms < 0.0 {
            return;
        }
        let until = self.scheduler.now() + ms;
        while let Some(due) = self.scheduler.pop_due(until) {
            match due {
                Due::Timer(timer) => self.on_timer(timer),
                Due::Frame(at) => {
                    self.on_frame(at);
                    observe(&self.frame());
                }
            }
            self.dispatch();
        }
    }

    /// Advances until the reveal completes or `limit_ms` has elapsed. Returns whether the graph
    /// is fully revealed.
    pub fn run_until_revealed(&mut self, limit_ms: f64) -> bool {
        let deadline = self.scheduler.now() + limit_ms.max(0.0);
        while self.reveal.phase() != RevealPhase::Revealed && self.scheduler.now() < deadline {
            let step = (deadline - self.scheduler.now()).min(FRAME_INTERVAL_MS * 6.0);
            self.advance(step);
        }
        self.reveal.phase() == RevealPhase::Revealed
    }

    fn restart(&mut self, data: GraphData) {
        let generation = self.scheduler.stop();
        self.orchestrator.stop();
        self.core.reset(&data);
        self.reveal.reset(&mut self.core);
        self.settlement_fired = false;
        self.stopped = false;
        tracing::info!(
            target: "narwhal::session",
            generation,
            nodes = data.nodes.len(),
            links = data.links.len(),
            mode = ?self.config.render_mode,
            "render.start"
        );

        let admission = self.orchestrator.start(&data, generation);
        self.data = Some(data);
        self.apply(admission, true);
        self.dispatch();
    }

    fn apply(&mut self, admission: Admission, first: bool) {
        self.core.admit(&admission);
        let at = self.scheduler.now();
        if first {
            self.events.emit(EngineEvent::RenderReady {
                generation: admission.generation,
                at,
            });
        }
        if let Some(delay) = admission.next_delay {
            self.scheduler.schedule(delay, TimerKind::AdmitNext);
        }
        if admission.complete {
            self.events.emit(EngineEvent::RenderComplete {
                generation: admission.generation,
                at,
            });
        }
        self.scheduler.request_frame();
    }

    fn on_timer(&mut self, timer: Timer) {
        if !self.scheduler.is_current(timer.generation) {
            tracing::debug!(
                target: "narwhal::session",
                kind = ?timer.kind,
                stale = timer.generation,
                "timer.ignored=stale_generation"
            );
            return;
        }
        match timer.kind {
            TimerKind::AdmitNext => {
                if let Some(admission) = self.orchestrator.admit_next(timer.generation) {
                    self.apply(admission, false);
                }
            }
            TimerKind::ArmSettlement => {
                self.core.arm_settlement();
                self.scheduler.request_frame();
            }
        }
    }

    fn on_frame(&mut self, at: f64) {
        if self.stopped {
            return;
        }
        if let Some(settlement) = self.core.tick() {
            if !self.settlement_fired {
                self.settlement_fired = true;
                self.events.emit(EngineEvent::SettlementReached {
                    generation: self.scheduler.generation(),
                    at,
                    forced: settlement.forced,
                    ticks: settlement.ticks,
                });
            }
        }
        if self.reveal.is_animating() && self.reveal.update(at, &mut self.core) {
            self.events.emit(EngineEvent::RevealComplete {
                generation: self.scheduler.generation(),
                at,
            });
        }
        if self.core.is_active() || self.reveal.is_animating() {
            self.scheduler.request_frame();
        }
    }

    fn dispatch(&mut self) {
        while let Some(event) = self.events.next_pending() {
            if !self.scheduler.is_current(event.generation()) {
                continue;
            }
            match event {
                EngineEvent::RenderComplete { .. } => {
                    self.core.mark_render_complete();
                    self.scheduler
                        .schedule(self.config.settlement_delay, TimerKind::ArmSettlement);
                }
                EngineEvent::SettlementReached { .. } => {
                    if self.reveal.start(self.scheduler.now(), &mut self.core) {
                        self.scheduler.request_frame();
                    }
                }
                EngineEvent::RenderReady { .. } | EngineEvent::RevealComplete { .. } => {}
            }
        }
    }
}
