//! PID controller for heater duty.
//!
//! Positional PID with a fixed time step.  Integration is gated off while
//! the error is within `epsilon` of zero so the integral cannot wind up
//! near setpoint; the output is then hard-clamped to the duty range.

use crate::config::PidConfig;

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    enabled: bool,
    kp: f32,
    ki: f32,
    kd: f32,
    dt: f32,
    epsilon: f32,
    output_min: f32,
    output_max: f32,

    setpoint: f32,
    measured: f32,
    error: f32,
    prev_error: f32,
    integral: f32,
    derivative: f32,
    output: f32,
}

impl PidController {
    pub fn new(cfg: &PidConfig) -> Self {
        Self {
            enabled: true,
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
            dt: cfg.dt,
            epsilon: cfg.epsilon,
            output_min: cfg.output_min,
            output_max: cfg.output_max,
            setpoint: 0.0,
            measured: 0.0,
            error: 0.0,
            prev_error: 0.0,
            integral: 0.0,
            derivative: 0.0,
            output: 0.0,
        }
    }

    /// Set output limits
    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.output_min = min;
        self.output_max = max;
    }

    /// Compute the clamped output for one heater period.
    pub fn compute(&mut self, setpoint: f32, measured: f32) -> f32 {
        if !self.enabled {
            self.output = 0.0;
            return 0.0;
        }

        self.setpoint = setpoint;
        self.measured = measured;
        self.error = setpoint - measured;

        // A bad measurement drives the output off and leaves the history alone.
        if !self.error.is_finite() {
            self.output = self.output_min;
            return self.output;
        }

        if self.error.abs() > self.epsilon {
            self.integral += self.error * self.dt;
        }
        self.derivative = (self.error - self.prev_error) / self.dt;

        let raw = self.kp * self.error + self.ki * self.integral + self.kd * self.derivative;
        self.output = if raw.is_nan() {
            self.output_min
        } else {
            raw.clamp(self.output_min, self.output_max)
        };

        self.prev_error = self.error;
        self.output
    }

    /// Cold start: zero the integral and the derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.output = 0.0;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn prev_error(&self) -> f32 {
        self.prev_error
    }

    pub fn error(&self) -> f32 {
        self.error
    }

    pub fn derivative(&self) -> f32 {
        self.derivative
    }

    /// Last computed output.
    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn limits(&self) -> (f32, f32) {
        (self.output_min, self.output_max)
    }
}
