//! Fixed-step driver around one [`ServerController`].

use crate::controller::ServerController;
use log::warn;
use shared::Span;

/// Step every session advances by, independent of the server tick.
pub const UPDATE_INTERVAL: Span = Span::from_ticks(333_333);

pub struct Session {
    controller: ServerController,
    accumulator: Span,
    interval: Span,
}

impl Session {
    pub fn new(controller: ServerController) -> Self {
        Self::with_interval(controller, UPDATE_INTERVAL)
    }

    pub fn with_interval(controller: ServerController, interval: Span) -> Self {
        let interval = if interval.is_positive() {
            interval
        } else {
            warn!("Session interval must be positive, using {:?}", UPDATE_INTERVAL);
            UPDATE_INTERVAL
        };
        Session {
            controller,
            accumulator: interval,
            interval,
        }
    }

    /// Runs as many fixed steps as `elapsed` covers. Returns the step count.
    pub fn update(&mut self, elapsed: Span) -> usize {
        let mut steps = 0;
        self.accumulator -= elapsed;
        while !self.accumulator.is_positive() {
            self.accumulator += self.interval;
            self.controller.update(self.interval);
            steps += 1;
        }
        steps
    }

    pub fn controller(&self) -> &ServerController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ServerController {
        &mut self.controller
    }

    pub fn is_ended(&self) -> bool {
        self.controller.is_ended()
    }

    pub fn shutdown(&mut self) {
        self.controller.shutdown();
    }
}
