#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use biscuit_sorter::{ActuatorError, ActuatorPort, Frame, FrameSource, RobotPosition};

/// A uniform frame whose intensity dominates both the histogram and the
/// foreground mask. With a bright enough shade the whole frame is one region
/// centered on the frame center.
pub fn uniform_frame(width: u32, height: u32, shade: u8) -> Frame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&[shade, shade, shade, 255]);
    }
    Frame::new(width, height, data)
}

/// An all-dark frame: no foreground region at all.
pub fn empty_belt(width: u32, height: u32) -> Frame {
    uniform_frame(width, height, 10)
}

/// Every actuator command a test run issued, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    Home,
    Move(RobotPosition),
    Suction(bool),
    Speed(u8),
    Close,
}

/// `ActuatorPort` fake that records commands and can be scripted to fail on
/// its first motion command.
pub struct FakeActuator {
    pub log: Rc<RefCell<Vec<Cmd>>>,
    pub fail_on_move: bool,
}

impl FakeActuator {
    pub fn new(log: Rc<RefCell<Vec<Cmd>>>) -> Self {
        Self {
            log,
            fail_on_move: false,
        }
    }

    pub fn failing_on_move(log: Rc<RefCell<Vec<Cmd>>>) -> Self {
        Self {
            log,
            fail_on_move: true,
        }
    }
}

impl ActuatorPort for FakeActuator {
    fn home(&mut self) -> Result<(), ActuatorError> {
        self.log.borrow_mut().push(Cmd::Home);
        Ok(())
    }

    fn move_to(&mut self, target: RobotPosition) -> Result<(), ActuatorError> {
        if self.fail_on_move {
            return Err(ActuatorError::Transport(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "wire break",
            )));
        }
        self.log.borrow_mut().push(Cmd::Move(target));
        Ok(())
    }

    fn set_suction(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.log.borrow_mut().push(Cmd::Suction(on));
        Ok(())
    }

    fn set_conveyor_speed(&mut self, percent: u8) -> Result<(), ActuatorError> {
        self.log.borrow_mut().push(Cmd::Speed(percent));
        Ok(())
    }

    fn close(&mut self) -> Result<(), ActuatorError> {
        self.log.borrow_mut().push(Cmd::Close);
        Ok(())
    }
}

/// `FrameSource` fake that serves a fixed list of frames and then raises the
/// shared stop flag once it runs dry, so `run()` terminates cleanly.
pub struct ScriptedFrames {
    frames: Vec<Frame>,
    stop_when_dry: Arc<AtomicBool>,
    pub releases: Rc<RefCell<u32>>,
}

impl ScriptedFrames {
    pub fn new(frames: Vec<Frame>, stop_when_dry: Arc<AtomicBool>) -> Self {
        Self {
            frames,
            stop_when_dry,
            releases: Rc::new(RefCell::new(0)),
        }
    }
}

impl FrameSource for ScriptedFrames {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.frames.is_empty() {
            self.stop_when_dry.store(true, Ordering::SeqCst);
            return None;
        }
        Some(self.frames.remove(0))
    }

    fn release(&mut self) {
        *self.releases.borrow_mut() += 1;
    }
}
