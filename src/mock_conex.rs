//! Simulated CONEX-CC controller and a manually advanced clock for tests.

use crate::clock::Clock;
use crate::controller_state::{CommandError, ControllerState, StateCategory};
use crate::transport::{Transport, TransportError};
use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SimState {
    pub state: ControllerState,
    pub position_mm: f64,
    pub velocity: f64,
    pub homing_velocity: f64,
    pub min_limit: f64,
    pub max_limit: f64,
    pub positioner_error: u16,
    pub pending_error: char,
    /// Moves never reach their target.
    pub stall_moves: bool,
    /// Homing never finishes.
    pub stall_homing: bool,
    /// Only this many upcoming moves stall; later ones complete.
    pub stalled_moves_left: u32,
    /// Only this many upcoming homings stall; later ones complete.
    pub stalled_homings_left: u32,
    /// The next command is rejected with this `TE` letter.
    pub reject_next: Option<char>,
    /// Every round trip fails at the transport level.
    pub link_down: bool,
    pub closed: bool,
    pub commands: Vec<String>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            state: ControllerState::ReadyFromHoming,
            position_mm: 0.0,
            velocity: 0.0,
            homing_velocity: 0.0,
            min_limit: -1.0,
            max_limit: 37.0,
            positioner_error: 0,
            pending_error: CommandError::NONE,
            stall_moves: false,
            stall_homing: false,
            stalled_moves_left: 0,
            stalled_homings_left: 0,
            reject_next: None,
            link_down: false,
            closed: false,
            commands: Vec::new(),
        }
    }
}

impl SimState {
    fn record(&mut self, command: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.link_down {
            return Err(TransportError::Timeout {
                expected: "\r\n".to_string(),
                actual: String::new(),
            });
        }
        self.commands.push(command.to_string());
        Ok(())
    }

    fn execute(&mut self, command: &str) {
        if let Some(code) = self.reject_next.take() {
            self.pending_error = code;
            return;
        }

        let mnemonic = command.get(1..3).unwrap_or("");
        let argument = command.get(3..).unwrap_or("");
        let value = argument.parse::<f64>().ok();

        match (mnemonic, value) {
            ("MM", Some(mode)) if mode == 0.0 => self.state = ControllerState::DisableFromReady,
            ("MM", Some(_)) => {
                if self.state.category() == StateCategory::Disable {
                    self.state = ControllerState::ReadyFromDisable;
                }
            }
            ("OH", Some(v)) => self.homing_velocity = v,
            ("VA", Some(v)) => self.velocity = v,
            ("OR", None) => {
                if self.stalled_homings_left > 0 {
                    self.stalled_homings_left -= 1;
                    self.state = ControllerState::Homing;
                } else if self.stall_homing {
                    self.state = ControllerState::Homing;
                } else {
                    self.position_mm = 0.0;
                    self.state = ControllerState::ReadyFromHoming;
                }
            }
            ("PA", Some(target)) => self.start_move(target),
            ("PR", Some(delta)) => self.start_move(self.position_mm + delta),
            _ => self.pending_error = 'A',
        }
    }

    fn start_move(&mut self, target_mm: f64) {
        if self.stalled_moves_left > 0 {
            self.stalled_moves_left -= 1;
            self.state = ControllerState::Moving;
        } else if self.stall_moves {
            self.state = ControllerState::Moving;
        } else {
            self.position_mm = target_mm;
            self.state = ControllerState::ReadyFromMoving;
        }
    }

    fn reply(&mut self, command: &str) -> Result<String, TransportError> {
        let echo = command.trim_end_matches('?');
        let payload = match echo.get(1..) {
            Some("TP") => self.position_mm.to_string(),
            Some("TS") => format!("{:04X}{}", self.positioner_error, self.state.code()),
            Some("TE") => {
                let code = self.pending_error;
                self.pending_error = CommandError::NONE;
                code.to_string()
            }
            Some("VA") => self.velocity.to_string(),
            Some("OH") => self.homing_velocity.to_string(),
            Some("SL") => self.min_limit.to_string(),
            Some("SR") => self.max_limit.to_string(),
            Some("VE") => " CONEX-CC 2.0.1".to_string(),
            _ => {
                return Err(TransportError::Timeout {
                    expected: "\r\n".to_string(),
                    actual: String::new(),
                })
            }
        };
        Ok(format!("{}{}", echo, payload))
    }
}

/// Shared handle: clones observe the same simulated controller.
#[derive(Debug, Clone, Default)]
pub struct MockConex {
    sim: Rc<RefCell<SimState>>,
}

impl MockConex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A referenced, ready controller sitting at `position_mm`.
    pub fn ready_at(position_mm: f64) -> Self {
        let mock = Self::new();
        mock.sim().position_mm = position_mm;
        mock
    }

    pub fn sim(&self) -> RefMut<'_, SimState> {
        self.sim.borrow_mut()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sim.borrow().commands.clone()
    }

    /// Number of commands sent with the given two letter mnemonic.
    pub fn count(&self, mnemonic: &str) -> usize {
        self.sim
            .borrow()
            .commands
            .iter()
            .filter(|c| c.get(1..3) == Some(mnemonic))
            .count()
    }

    pub fn clear_log(&self) {
        self.sim.borrow_mut().commands.clear();
    }
}

impl Transport for MockConex {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let mut sim = self.sim.borrow_mut();
        sim.record(command)?;
        sim.execute(command);
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        let mut sim = self.sim.borrow_mut();
        sim.record(command)?;
        sim.reply(command)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.sim.borrow_mut().closed = true;
        Ok(())
    }
}

/// Clock whose time only advances when something sleeps on it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}
