use crate::clock::Clock;
use crate::conex_axis::{ConexAxis, ConexError};
use crate::transport::Transport;

/// The operations experiment code needs from any motorized stage.
///
/// Positions are in micrometers. Blocking calls use the implementation's
/// default timeout and retry policy.
pub trait Motor {
    type Error: std::error::Error;

    /// Re-home and return to the current position. Waits until done.
    fn init_position_and_come_back(&mut self) -> Result<(), Self::Error>;

    fn enable(&mut self) -> Result<(), Self::Error>;

    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Move to an absolute position and wait until the stage is ready.
    fn move_to(&mut self, new_pos: f64) -> Result<(), Self::Error>;

    fn current_position(&mut self) -> Result<f64, Self::Error>;

    fn is_ready(&mut self) -> Result<bool, Self::Error>;
}

impl<T: Transport, C: Clock> Motor for ConexAxis<T, C> {
    type Error = ConexError;

    fn init_position_and_come_back(&mut self) -> Result<(), ConexError> {
        Self::init_position_and_come_back(self)
    }

    fn enable(&mut self) -> Result<(), ConexError> {
        Self::enable(self)
    }

    fn disable(&mut self) -> Result<(), ConexError> {
        Self::disable(self)
    }

    fn move_to(&mut self, new_pos: f64) -> Result<(), ConexError> {
        let timeout = self.config().default_timeout;
        let retries = self.config().default_retries;
        self.move_absolute_sync(new_pos, timeout, retries)
    }

    fn current_position(&mut self) -> Result<f64, ConexError> {
        Self::current_position(self)
    }

    fn is_ready(&mut self) -> Result<bool, ConexError> {
        Self::is_ready(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_conex::{ManualClock, MockConex};
    use crate::stage_config::AxisConfig;

    fn scan<M: Motor>(motor: &mut M, positions: &[f64]) -> Result<Vec<f64>, M::Error> {
        positions
            .iter()
            .map(|&p| {
                motor.move_to(p)?;
                motor.current_position()
            })
            .collect()
    }

    #[test]
    fn test_conex_axis_as_motor() {
        let mock = MockConex::ready_at(0.0);
        let mut axis =
            ConexAxis::new(mock.clone(), ManualClock::new(), AxisConfig::default(), 0.3).unwrap();

        let reached = scan(&mut axis, &[250.0, 1_000.0, 500.0]).unwrap();
        assert_eq!(reached, vec![250.0, 1_000.0, 500.0]);
        assert_eq!(mock.count("PA"), 3);
    }

    #[test]
    fn test_boxed_motor() {
        let mock = MockConex::ready_at(4.0);
        let axis = ConexAxis::new(mock, ManualClock::new(), AxisConfig::default(), 0.3).unwrap();
        let mut motor: Box<dyn Motor<Error = ConexError>> = Box::new(axis);

        Motor::disable(motor.as_mut()).unwrap();
        assert!(!motor.is_ready().unwrap());
        motor.enable().unwrap();
        assert!(motor.is_ready().unwrap());

        motor.init_position_and_come_back().unwrap();
        assert_eq!(motor.current_position().unwrap(), 4_000.0);
    }
}
