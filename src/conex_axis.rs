use crate::clock::{Clock, SystemClock};
use crate::controller_state::{CommandError, ControllerState, StateReport};
use crate::serial_transport::{SerialSettings, SerialTransport};
use crate::stage_config::AxisConfig;
use crate::transport::Transport;
use std::fmt::Display;
use std::time::Duration;

const UM_PER_MM: f64 = 1e3;

#[derive(Debug, thiserror::Error)]
pub enum ConexError {
    #[error("{operation}: {reason}")]
    Communication {
        operation: &'static str,
        reason: String,
    },

    #[error("Stage not ready. Current state is: {state}")]
    NotReady { state: ControllerState },

    #[error(
        "After waiting {timeout:?} the platform is still not ready for use. Check if the platform is working or if the timeout is correct"
    )]
    Timeout { timeout: Duration },

    #[error("Requested position = {pos} um is out of range = {max_pos} um")]
    RangeExceeded { pos: f64, max_pos: f64 },

    #[error("Move went wrong: {0}")]
    MoveRejected(CommandError),
}

impl ConexError {
    fn communication(operation: &'static str, reason: impl Display) -> Self {
        Self::Communication {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// One motorized axis behind a CONEX-CC controller.
///
/// Positions are micrometers at this boundary and millimeters on the wire.
/// Dropping or closing the axis never stops a motion in progress; disable or
/// home it first if the stage must come to rest.
#[derive(Debug)]
pub struct ConexAxis<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: AxisConfig,
    address: String,
    min_limit: f64,
    max_limit: f64,
}

impl ConexAxis<SerialTransport> {
    /// Open the controller on a serial port and prepare it for motion.
    pub fn open(port: &str, velocity: f64) -> Result<Self, ConexError> {
        let transport = SerialTransport::open(port, &SerialSettings::conex_cc())
            .map_err(|e| ConexError::communication("Open instrument", format!("{}: {}", port, e)))?;
        log::info!("ConexCC: Successfully connected to {}", port);

        Self::new(transport, SystemClock, AxisConfig::default(), velocity)
    }
}

impl<T: Transport, C: Clock> ConexAxis<T, C> {
    /// Wrap an open transport: pushes `velocity` as both move and homing
    /// velocity, then caches the software travel limits.
    pub fn new(transport: T, clock: C, config: AxisConfig, velocity: f64) -> Result<Self, ConexError> {
        let address = config.controller_address.to_string();
        let mut axis = Self {
            transport,
            clock,
            config,
            address,
            min_limit: 0.0,
            max_limit: 0.0,
        };

        axis.set_velocity(velocity)?;
        axis.set_homing_velocity(velocity)?;
        axis.refresh_limits()?;

        log::debug!("Current Position = {:.3} mm", axis.current_position_mm()?);
        Ok(axis)
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn min_limit(&self) -> f64 {
        self.min_limit
    }

    pub fn max_limit(&self) -> f64 {
        self.max_limit
    }

    /// Read the software travel limits (mm) from the controller and cache them.
    pub fn refresh_limits(&mut self) -> Result<(f64, f64), ConexError> {
        let min_limit = self.ask_f64("Negative SW Limit", "SL", "?")?;
        log::debug!("Negative SW Limit = {:.3} mm", min_limit);
        let max_limit = self.ask_f64("Positive SW Limit", "SR", "?")?;
        log::debug!("Positive SW Limit = {:.3} mm", max_limit);

        self.min_limit = min_limit;
        self.max_limit = max_limit;
        Ok((min_limit, max_limit))
    }

    pub fn enable(&mut self) -> Result<(), ConexError> {
        self.set_mode(true)
    }

    pub fn disable(&mut self) -> Result<(), ConexError> {
        self.set_mode(false)
    }

    fn set_mode(&mut self, enabled: bool) -> Result<(), ConexError> {
        let mode = u8::from(enabled);
        log::debug!("Setting state to {}", mode);
        self.send("Set state", "MM", mode)
    }

    pub fn set_homing_velocity(&mut self, velocity: f64) -> Result<(), ConexError> {
        let velocity = self.clamp_velocity(velocity);
        self.send("Homing velocity", "OH", format_args!("{:.6}", velocity))
    }

    pub fn velocity(&mut self) -> Result<f64, ConexError> {
        self.ask_f64("Current Velocity", "VA", "?")
    }

    /// Set the move velocity, clamped to the hardware maximum. Returns the value sent.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<f64, ConexError> {
        let clamped = self.clamp_velocity(velocity);
        if velocity.is_nan() || velocity > self.config.max_velocity {
            log::warn!(
                "Cannot set velocity higher than {:.1}. Velocity set to maximal value.",
                self.config.max_velocity
            );
        }
        self.send("Set velocity", "VA", format_args!("{:.6}", clamped))?;
        log::debug!("Velocity set to {:.1} mm/s", clamped);
        Ok(clamped)
    }

    /// NaN clamps to the maximum.
    fn clamp_velocity(&self, velocity: f64) -> f64 {
        velocity.min(self.config.max_velocity)
    }

    /// Start the home search without waiting for it to finish.
    pub fn init_position_async(&mut self) -> Result<(), ConexError> {
        self.send("Find Home", "OR", "")
    }

    /// Home and wait until the controller is ready again.
    ///
    /// Each attempt gets the full `timeout`; after `retries` extra timed-out
    /// attempts the call fails with [`ConexError::Timeout`].
    pub fn init_position_sync(&mut self, timeout: Duration, retries: u32) -> Result<(), ConexError> {
        let _span = tracing::debug_span!("init_position_sync", ?timeout, retries).entered();

        for attempt in 0..=retries {
            if attempt > 0 {
                log::warn!(
                    "Homing not finished after {:?}, retrying ({}/{})",
                    timeout,
                    attempt,
                    retries
                );
            }
            self.init_position_async()?;
            if self.wait_until_ready(timeout)? {
                return Ok(());
            }
        }
        Err(ConexError::Timeout { timeout })
    }

    /// Re-home and come back to the position held before. Not atomic.
    pub fn init_position_and_come_back(&mut self) -> Result<(), ConexError> {
        let old_pos = self.current_position()?;
        self.init_position_sync(self.config.default_timeout, self.config.default_retries)?;
        self.move_absolute_sync(old_pos, self.config.default_timeout, self.config.default_retries)
    }

    /// Move by `distance_um` without waiting.
    pub fn move_relative_async(&mut self, distance_um: f64) -> Result<(), ConexError> {
        let cur_pos = self.current_position()?;
        self.check_range(cur_pos + distance_um)?;
        self.ensure_ready()?;

        self.send_move("PR", distance_um)?;
        log::debug!("Moving relative by {:.3} um", distance_um);
        Ok(())
    }

    /// Move by `distance_um` and wait for the controller to be ready.
    ///
    /// A timed-out relative move is never retried: the position after a
    /// partial move is unknown, so re-issuing it would land somewhere else.
    pub fn move_relative_sync(&mut self, distance_um: f64, timeout: Duration) -> Result<(), ConexError> {
        let _span = tracing::debug_span!("move_relative_sync", distance_um, ?timeout).entered();

        self.move_relative_async(distance_um)?;
        if self.wait_until_ready(timeout)? {
            Ok(())
        } else {
            Err(ConexError::Timeout { timeout })
        }
    }

    /// Move to `new_pos` (um) without waiting.
    pub fn move_absolute_async(&mut self, new_pos: f64) -> Result<(), ConexError> {
        self.check_range(new_pos)?;
        self.ensure_ready()?;

        self.send_move("PA", new_pos)?;
        log::debug!("Moving to position {:.3} um", new_pos);
        Ok(())
    }

    /// Move to `new_pos` (um) and wait for the controller to be ready.
    ///
    /// On timeout the axis is re-enabled and re-homed before the move is
    /// issued again, up to `retries` times.
    pub fn move_absolute_sync(
        &mut self,
        new_pos: f64,
        timeout: Duration,
        retries: u32,
    ) -> Result<(), ConexError> {
        let _span = tracing::debug_span!("move_absolute_sync", new_pos, ?timeout, retries).entered();

        for attempt in 0..=retries {
            if attempt > 0 {
                log::warn!(
                    "Move to {:.3} um not finished after {:?}, re-homing and retrying ({}/{})",
                    new_pos,
                    timeout,
                    attempt,
                    retries
                );
                self.enable()?;
                self.init_position_sync(self.config.default_timeout, self.config.default_retries)?;
            }
            self.move_absolute_async(new_pos)?;
            if self.wait_until_ready(timeout)? {
                return Ok(());
            }
        }
        Err(ConexError::Timeout { timeout })
    }

    pub fn current_position_mm(&mut self) -> Result<f64, ConexError> {
        self.ask_f64("Current Position", "TP", "")
    }

    /// Current position in micrometers.
    pub fn current_position(&mut self) -> Result<f64, ConexError> {
        Ok(self.current_position_mm()? * UM_PER_MM)
    }

    pub fn state_and_error(&mut self) -> Result<StateReport, ConexError> {
        let payload = self.ask("Get state", "TS", "")?;
        StateReport::parse(&payload).ok_or_else(|| {
            ConexError::communication("Get state", format!("cannot decode state {:?}", payload))
        })
    }

    pub fn state(&mut self) -> Result<ControllerState, ConexError> {
        Ok(self.state_and_error()?.state)
    }

    /// Pending positioner error code, empty when there is none.
    pub fn error(&mut self) -> Result<String, ConexError> {
        Ok(self.state_and_error()?.error.code())
    }

    pub fn is_ready(&mut self) -> Result<bool, ConexError> {
        Ok(self.state()?.is_ready())
    }

    /// Release the transport. Does not stop the stage.
    pub fn close(mut self) -> Result<(), ConexError> {
        self.transport
            .close()
            .map_err(|e| ConexError::communication("Close", e))
    }

    fn check_range(&self, target: f64) -> Result<(), ConexError> {
        if target.is_nan() || target > self.config.max_run {
            return Err(ConexError::RangeExceeded {
                pos: target,
                max_pos: self.config.max_run,
            });
        }
        Ok(())
    }

    fn ensure_ready(&mut self) -> Result<(), ConexError> {
        let state = self.state()?;
        if state.is_ready() {
            Ok(())
        } else {
            Err(ConexError::NotReady { state })
        }
    }

    /// Poll until ready. `Ok(false)` once `timeout` has elapsed.
    fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, ConexError> {
        let start = self.clock.now();
        loop {
            if self.clock.now().duration_since(start) > timeout {
                return Ok(false);
            }
            self.clock.sleep(self.config.poll_interval);
            if self.is_ready()? {
                return Ok(true);
            }
        }
    }

    fn send_move(&mut self, mnemonic: &str, distance_um: f64) -> Result<(), ConexError> {
        let command = format!("{}{}{:.6}", self.address, mnemonic, distance_um / UM_PER_MM);
        log::debug!("-> {}", command);
        self.transport
            .write(&command)
            .map_err(|e| ConexError::communication("Move", e))?;

        match self.pending_command_error("Move")? {
            Some(error) => Err(ConexError::MoveRejected(error)),
            None => Ok(()),
        }
    }

    /// Write a setter command and check the controller accepted it.
    fn send(
        &mut self,
        operation: &'static str,
        mnemonic: &str,
        argument: impl Display,
    ) -> Result<(), ConexError> {
        let command = format!("{}{}{}", self.address, mnemonic, argument);
        log::debug!("-> {}", command);
        self.transport
            .write(&command)
            .map_err(|e| ConexError::communication(operation, e))?;

        match self.pending_command_error(operation)? {
            Some(error) => Err(ConexError::communication(operation, error)),
            None => Ok(()),
        }
    }

    fn pending_command_error(&mut self, operation: &'static str) -> Result<Option<CommandError>, ConexError> {
        let payload = self.ask(operation, "TE", "")?;
        let code = payload.chars().next().ok_or_else(|| {
            ConexError::communication(operation, "empty command error reply")
        })?;
        Ok(CommandError::from_code(code))
    }

    /// Query `mnemonic` and return the reply with the echoed command stripped.
    fn ask(&mut self, operation: &'static str, mnemonic: &str, suffix: &str) -> Result<String, ConexError> {
        let command = format!("{}{}{}", self.address, mnemonic, suffix);
        let reply = self
            .transport
            .query(&command)
            .map_err(|e| ConexError::communication(operation, e))?;

        let echo = format!("{}{}", self.address, mnemonic);
        reply
            .strip_prefix(&echo)
            .map(|payload| payload.trim().to_string())
            .ok_or_else(|| {
                ConexError::communication(
                    operation,
                    format!("unexpected reply {:?} to {}", reply, command),
                )
            })
    }

    fn ask_f64(&mut self, operation: &'static str, mnemonic: &str, suffix: &str) -> Result<f64, ConexError> {
        let payload = self.ask(operation, mnemonic, suffix)?;
        payload.parse().map_err(|_| {
            ConexError::communication(operation, format!("cannot parse {:?} as a number", payload))
        })
    }
}
