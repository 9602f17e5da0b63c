//! Time management for the fixed-tick simulation loop.

use std::time::{Duration, Instant};

/// One fixed simulation step, as seen by gameplay code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Monotonic tick index, starting at 1 for the first simulated tick.
    pub index: u64,
    /// Fixed timestep in seconds.
    pub dt: f32,
    /// Simulation time at the start of this tick, in seconds.
    pub now: f64,
}

/// Manages render-frame timing and the fixed simulation tick derived from it.
///
/// Render frames feed wall-clock time into an accumulator; every whole fixed
/// step in the accumulator yields one [`Tick`]. Simulation time only advances
/// by whole ticks so every peer computes the same timestamps.
#[derive(Debug)]
pub struct Time {
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Fixed timestep for the simulation (default 60 Hz).
    fixed_timestep: Duration,
    /// Accumulated time for fixed updates.
    accumulator: Duration,
    /// Ticks simulated so far.
    tick: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager ticking at 60 Hz.
    pub fn new() -> Self {
        Self::with_rate(60.0)
    }

    /// Create a time manager with the given fixed rate in Hz.
    pub fn with_rate(hz: f64) -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            frame_count: 0,
            fixed_timestep: Duration::from_secs_f64(1.0 / hz),
            accumulator: Duration::ZERO,
            tick: 0,
        }
    }

    /// Update timing at the start of a new render frame from the wall clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.advance(delta);
    }

    /// Feed an explicit frame duration (headless hosts, tests).
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.frame_count += 1;
        self.accumulator += delta;
    }

    /// Get the last frame delta in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the fixed timestep in seconds.
    pub fn fixed_timestep_seconds(&self) -> f32 {
        self.fixed_timestep.as_secs_f32()
    }

    /// Number of ticks simulated so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds (whole ticks only).
    pub fn simulation_time(&self) -> f64 {
        self.tick as f64 * self.fixed_timestep.as_secs_f64()
    }

    /// Fraction of a fixed step left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f64() / self.fixed_timestep.as_secs_f64()) as f32
    }

    /// Whether the accumulator holds at least one whole fixed step.
    pub fn tick_due(&self) -> bool {
        self.accumulator >= self.fixed_timestep
    }

    /// If a whole fixed step is available, consume it and return the tick to simulate.
    pub fn next_fixed_tick(&mut self) -> Option<Tick> {
        if self.tick_due() {
            self.accumulator -= self.fixed_timestep;
            Some(self.step())
        } else {
            None
        }
    }

    /// Unconditionally produce the next tick, bypassing the accumulator.
    pub fn step(&mut self) -> Tick {
        let tick = Tick {
            index: self.tick + 1,
            dt: self.fixed_timestep_seconds(),
            now: self.simulation_time(),
        };
        self.tick += 1;
        tick
    }
}
