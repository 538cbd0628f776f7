//! # CONEX-CC RS
//!
//! A Rust library for driving motorized linear stages behind Newport CONEX-CC
//! single-axis controllers.
//!
//! The controller runs its own state machine (not referenced, homing, moving,
//! ready, disable, tracking). This library observes it, refuses to send a
//! motion command unless the stage is ready and the target is within the
//! travel ceiling, and turns "move and wait" into a blocking call with a
//! timeout and bounded retries.
//!
//! ## Features
//!
//! - **Transport agnostic**: any [`Transport`] works; serial (`serialport`) and
//!   Ethernet-to-serial bridges are provided
//! - **Typed controller states**: the two character state codes are a closed enum
//! - **Safe motion**: range and state checks happen before any move is sent
//! - **Bounded retries**: homing and absolute moves re-home and retry on timeout
//! - **Testable**: time comes from a [`Clock`], so polling can be simulated
//!
//! ## Examples
//!
//! ### Connecting and moving
//!
//! ```rust,no_run
//! use conexcc_rs::ConexAxis;
//! use std::time::Duration;
//!
//! let mut axis = ConexAxis::open("/dev/ttyUSB0", 0.4)?;
//!
//! axis.init_position_sync(Duration::from_secs(30), 3)?;
//! axis.move_absolute_sync(12_500.0, Duration::from_secs(30), 3)?; // um
//! println!("Now at {:.1} um", axis.current_position()?);
//!
//! axis.move_relative_sync(-500.0, Duration::from_secs(10))?;
//! axis.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Controller state
//!
//! ```rust
//! use conexcc_rs::{ControllerState, StateCategory};
//!
//! let state = ControllerState::from_code("28").unwrap();
//! assert_eq!(state.category(), StateCategory::Moving);
//! assert!(!state.is_ready());
//! println!("{}", state); // 28 (MOVING)
//! ```
//!
//! ### Device discovery
//!
//! ```rust,no_run
//! use conexcc_rs::ConexConnector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for device in ConexConnector::get_available_ports()? {
//!     println!("USB serial port {} ({:?})", device.port, device.product);
//! }
//!
//! // Probe every USB serial port until a CONEX-CC answers
//! let axis = ConexConnector::connect(None, 0.2)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Through an Ethernet-to-serial bridge
//!
//! ```rust,no_run
//! use conexcc_rs::{AxisConfig, ConexAxis, LanSettings, LanTransport, SystemClock};
//!
//! let transport = LanTransport::connect("192.168.1.50", &LanSettings::default())?;
//! let mut axis = ConexAxis::new(transport, SystemClock, AxisConfig::default(), 0.2)?;
//! println!("Limits: {} .. {} mm", axis.min_limit(), axis.max_limit());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clock;
pub mod conex_axis;
pub mod conex_connector;
pub mod controller_state;
pub mod lan_transport;
pub mod motor;
pub mod serial_transport;
pub mod stage_config;
pub mod transport;

#[cfg(test)]
mod mock_conex;

// Re-export the main types for convenience
pub use clock::{Clock, SystemClock};

pub use conex_axis::{ConexAxis, ConexError};

pub use conex_connector::{ConexConnector, ConexDevice, ConnectorError};

pub use controller_state::{
    CommandError, ControllerState, PositionerError, StateCategory, StateReport,
};

pub use lan_transport::{LanSettings, LanTransport};

pub use motor::Motor;

pub use serial_transport::{SerialSettings, SerialTransport};

pub use stage_config::AxisConfig;

pub use transport::{LineChannel, Transport, TransportError};
