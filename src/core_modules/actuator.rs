// THEORY:
// The `actuator` module is the hardware boundary for the arm and the conveyor.
// Both devices sit behind one physical serial link, so the module exposes a
// single `ActuatorPort` trait covering motion, suction, and belt speed, plus a
// UART-backed implementation that formats one command line per call.
//
// Key architectural principles:
// 1.  **Fire-and-forget protocol**: The link carries no acknowledgments. Every
//     command is written and flushed immediately; pacing between commands is
//     the caller's job (the controller inserts a fixed settle delay after each
//     one).
// 2.  **Trait at the seam**: The controller is generic over `ActuatorPort`, so
//     the whole sorting loop can run against a recording fake in tests, with
//     no serial hardware present.
// 3.  **Scoped transport**: `UartActuator` owns its transport. `close` releases
//     it exactly once; calling it again is a no-op, which is what lets the
//     shutdown path stay idempotent.

use std::io::{self, Write};

use serde::Deserialize;
use thiserror::Error;

const CMD_HOME: &str = "$H";
const CMD_SUCTION_ON: &str = "M3 S1000";
const CMD_SUCTION_OFF: &str = "M5";

/// A point in actuator workspace units (millimeters).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RobotPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RobotPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Failure at the actuator boundary. Any variant is fatal to the sorting loop.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("transport write failed: {0}")]
    Transport(#[from] io::Error),
    #[error("command issued after the transport was closed")]
    Closed,
}

/// Motion, suction, and conveyor-speed primitives for the arm/conveyor pair.
///
/// Commands are fire-and-forget; callers must allow the mechanism its settle
/// time before issuing the next command.
pub trait ActuatorPort {
    /// Drives the arm to its reference position.
    fn home(&mut self) -> Result<(), ActuatorError>;

    /// Linear move to a workspace position.
    fn move_to(&mut self, target: RobotPosition) -> Result<(), ActuatorError>;

    /// Switches the suction pump on or off.
    fn set_suction(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Sets conveyor speed as a duty percentage, 0..=100.
    fn set_conveyor_speed(&mut self, percent: u8) -> Result<(), ActuatorError>;

    /// Releases the underlying transport. Must be idempotent.
    fn close(&mut self) -> Result<(), ActuatorError>;
}

/// `ActuatorPort` over a serial-style byte transport, one G-code-flavored
/// command line per call.
pub struct UartActuator<T: Write> {
    transport: Option<T>,
}

impl<T: Write> UartActuator<T> {
    /// Takes ownership of an already-opened transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    fn send_line(&mut self, command: &str) -> Result<(), ActuatorError> {
        let transport = self.transport.as_mut().ok_or(ActuatorError::Closed)?;
        transport.write_all(command.as_bytes())?;
        transport.write_all(b"\n")?;
        transport.flush()?;
        Ok(())
    }
}

impl<T: Write> ActuatorPort for UartActuator<T> {
    fn home(&mut self) -> Result<(), ActuatorError> {
        self.send_line(CMD_HOME)
    }

    fn move_to(&mut self, target: RobotPosition) -> Result<(), ActuatorError> {
        self.send_line(&format!(
            "G1 X{:.1} Y{:.1} Z{:.1}",
            target.x, target.y, target.z
        ))
    }

    fn set_suction(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.send_line(if on { CMD_SUCTION_ON } else { CMD_SUCTION_OFF })
    }

    fn set_conveyor_speed(&mut self, percent: u8) -> Result<(), ActuatorError> {
        self.send_line(&format!("M220 S{}", percent.min(100)))
    }

    fn close(&mut self) -> Result<(), ActuatorError> {
        if let Some(mut transport) = self.transport.take() {
            transport.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_newline_terminated_lines() {
        let mut wire = Vec::new();
        let mut actuator = UartActuator::new(&mut wire);
        actuator.home().unwrap();
        actuator
            .move_to(RobotPosition::new(200.0, -12.5, 50.0))
            .unwrap();
        actuator.set_suction(true).unwrap();
        actuator.set_suction(false).unwrap();
        actuator.set_conveyor_speed(30).unwrap();
        actuator.close().unwrap();

        let script = String::from_utf8(wire).unwrap();
        assert_eq!(
            script,
            "$H\nG1 X200.0 Y-12.5 Z50.0\nM3 S1000\nM5\nM220 S30\n"
        );
    }

    #[test]
    fn conveyor_speed_is_clamped_to_full_duty() {
        let mut wire = Vec::new();
        let mut actuator = UartActuator::new(&mut wire);
        actuator.set_conveyor_speed(130).unwrap();
        assert_eq!(String::from_utf8(wire).unwrap(), "M220 S100\n");
    }

    #[test]
    fn close_is_idempotent_and_fences_later_commands() {
        let mut wire = Vec::new();
        let mut actuator = UartActuator::new(&mut wire);
        actuator.close().unwrap();
        actuator.close().unwrap();
        assert!(matches!(actuator.home(), Err(ActuatorError::Closed)));
    }
}
