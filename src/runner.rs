//! Fixed-timestep loop driver
//!
//! The host calls [`SessionRunner::frame`] from its animation callback. Each
//! call converts elapsed host time into whole simulation ticks. Starting or
//! stopping bumps a generation counter so callbacks still holding an old
//! [`LoopToken`] become no-ops; the host stops rescheduling on `Cancelled`.

use crate::consts::{MAX_FRAME_DT_MS, MAX_SUBSTEPS, SIM_DT_MS};
use crate::session::{GameSession, SessionEvent};
use crate::sim::Intent;

/// Proof that a frame callback belongs to the currently running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopToken {
    generation: u64,
}

impl LoopToken {
    /// Plain number for hosts that cannot hold Rust values
    pub fn id(&self) -> u64 {
        self.generation
    }

    pub fn from_id(id: u64) -> Self {
        Self { generation: id }
    }
}

/// Result of one animation frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Token is stale; the caller must not schedule another frame
    Cancelled,
    Ran {
        ticks: u32,
        events: Vec<SessionEvent>,
    },
}

/// Owns the active session and its loop state
#[derive(Debug, Default)]
pub struct SessionRunner {
    session: Option<GameSession>,
    generation: u64,
    accumulator: f64,
    last_frame: Option<f64>,
    /// Session clock: advances exactly `SIM_DT_MS` per tick
    sim_time: f64,
}

impl SessionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session and start a fresh loop, cancelling any previous one
    pub fn start(&mut self, session: GameSession) -> LoopToken {
        self.generation += 1;
        self.session = Some(session);
        self.accumulator = 0.0;
        self.last_frame = None;
        self.sim_time = 0.0;
        log::debug!("runner: loop {} started", self.generation);
        LoopToken {
            generation: self.generation,
        }
    }

    /// Cancel the loop and hand back the session
    pub fn stop(&mut self) -> Option<GameSession> {
        self.generation += 1;
        self.last_frame = None;
        let session = self.session.take();
        if session.is_some() {
            log::debug!("runner: loop stopped");
        }
        session
    }

    pub fn is_current(&self, token: LoopToken) -> bool {
        self.session.is_some() && token.generation == self.generation
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.session.as_mut()
    }

    /// Session-clock time corresponding to a host timestamp
    pub fn session_time(&self, host_now_ms: f64) -> f64 {
        let since_frame = match self.last_frame {
            Some(last) => (host_now_ms - last).clamp(0.0, MAX_FRAME_DT_MS),
            None => 0.0,
        };
        self.sim_time + self.accumulator + since_frame
    }

    /// Queue an input received at host time `host_now_ms`
    ///
    /// Returns false when no session is running.
    pub fn push_intent(&mut self, intent: Intent, host_now_ms: f64) -> bool {
        let at = self.session_time(host_now_ms);
        match self.session.as_mut() {
            Some(session) => {
                session.push_intent(intent, at);
                true
            }
            None => false,
        }
    }

    /// Run as many fixed ticks as the elapsed host time allows
    pub fn frame(&mut self, token: LoopToken, host_now_ms: f64) -> FrameOutcome {
        if !self.is_current(token) {
            return FrameOutcome::Cancelled;
        }
        let Some(session) = self.session.as_mut() else {
            return FrameOutcome::Cancelled;
        };

        let dt = match self.last_frame {
            Some(last) => (host_now_ms - last).clamp(0.0, MAX_FRAME_DT_MS),
            None => 0.0,
        };
        self.last_frame = Some(host_now_ms);
        self.accumulator += dt;

        let mut ticks = 0;
        let mut events = Vec::new();
        while self.accumulator >= SIM_DT_MS && ticks < MAX_SUBSTEPS {
            self.sim_time += SIM_DT_MS;
            events.extend(session.tick(self.sim_time));
            self.accumulator -= SIM_DT_MS;
            ticks += 1;
        }

        FrameOutcome::Ran { ticks, events }
    }
}
