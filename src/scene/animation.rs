use log::debug;
use nalgebra::Vector3;
use std::time::Duration;

/// Accumulated rotation about X, Y and Z, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub angles: Vector3<f32>,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            angles: Vector3::new(x, y, z),
        }
    }

    pub fn advance(&mut self, increments: &Vector3<f32>) {
        self.angles += increments;
    }
}

/// What a tick asked the presentation side to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether the angles moved.
    pub advanced: bool,
    /// A redraw is requested on every tick, paused or not.
    pub redraw: bool,
}

/// Fixed-interval driver that owns the rotation state.
#[derive(Debug, Clone)]
pub struct TickDriver {
    rotation: RotationState,
    increments: Vector3<f32>,
    interval: Duration,
    paused: bool,
    pending: Duration,
    ticks: u64,
}

impl TickDriver {
    pub fn new(increments: Vector3<f32>, interval: Duration) -> Self {
        Self {
            rotation: RotationState::default(),
            increments,
            interval,
            paused: false,
            pending: Duration::ZERO,
            ticks: 0,
        }
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of ticks processed so far, paused ones included.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Flips the suspend flag and returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        debug!("Rotation {}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }

    /// One simulated tick: advances the angles unless paused.
    pub fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;
        if !self.paused {
            self.rotation.advance(&self.increments);
        }
        TickOutcome {
            advanced: !self.paused,
            redraw: true,
        }
    }

    /// Adds wall-clock time and returns how many whole intervals have elapsed.
    /// The remainder carries over to the next call.
    pub fn due_ticks(&mut self, elapsed: Duration) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        self.pending += elapsed;
        let mut due = 0;
        while self.pending >= self.interval {
            self.pending -= self.interval;
            due += 1;
        }
        due
    }
}
