//! CONEX-CC controller state machine codes, positioner faults and command errors.
//!
//! The controller walks its own state machine; the driver only observes it
//! through the `TS` reply, which packs a four hex digit positioner error and a
//! two character state code.

use std::fmt;

/// Coarse grouping of [`ControllerState`] codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCategory {
    NotReferenced,
    Configuration,
    Homing,
    Moving,
    Ready,
    Disable,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    NotReferencedFromReset,
    NotReferencedFromHoming,
    NotReferencedFromConfiguration,
    NotReferencedFromDisable,
    NotReferencedFromReady,
    NotReferencedFromMoving,
    NotReferencedNoParameters,
    Configuration,
    Homing,
    Moving,
    ReadyFromHoming,
    ReadyFromMoving,
    ReadyFromDisable,
    ReadyTFromReady,
    ReadyTFromTracking,
    ReadyTFromDisableT,
    DisableFromReady,
    DisableFromMoving,
    DisableFromTracking,
    DisableFromReadyT,
    TrackingFromReadyT,
    TrackingFromTracking,
}

impl ControllerState {
    pub const ALL: [Self; 22] = [
        Self::NotReferencedFromReset,
        Self::NotReferencedFromHoming,
        Self::NotReferencedFromConfiguration,
        Self::NotReferencedFromDisable,
        Self::NotReferencedFromReady,
        Self::NotReferencedFromMoving,
        Self::NotReferencedNoParameters,
        Self::Configuration,
        Self::Homing,
        Self::Moving,
        Self::ReadyFromHoming,
        Self::ReadyFromMoving,
        Self::ReadyFromDisable,
        Self::ReadyTFromReady,
        Self::ReadyTFromTracking,
        Self::ReadyTFromDisableT,
        Self::DisableFromReady,
        Self::DisableFromMoving,
        Self::DisableFromTracking,
        Self::DisableFromReadyT,
        Self::TrackingFromReadyT,
        Self::TrackingFromTracking,
    ];

    /// Look up a state by its two character code, ignoring case.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.code().eq_ignore_ascii_case(code))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotReferencedFromReset => "0A",
            Self::NotReferencedFromHoming => "0B",
            Self::NotReferencedFromConfiguration => "0C",
            Self::NotReferencedFromDisable => "0D",
            Self::NotReferencedFromReady => "0E",
            Self::NotReferencedFromMoving => "0F",
            Self::NotReferencedNoParameters => "10",
            Self::Configuration => "14",
            Self::Homing => "1E",
            Self::Moving => "28",
            Self::ReadyFromHoming => "32",
            Self::ReadyFromMoving => "33",
            Self::ReadyFromDisable => "34",
            Self::ReadyTFromReady => "36",
            Self::ReadyTFromTracking => "37",
            Self::ReadyTFromDisableT => "38",
            Self::DisableFromReady => "3C",
            Self::DisableFromMoving => "3D",
            Self::DisableFromTracking => "3E",
            Self::DisableFromReadyT => "3F",
            Self::TrackingFromReadyT => "46",
            Self::TrackingFromTracking => "47",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotReferencedFromReset => "NOT REFERENCED from RESET",
            Self::NotReferencedFromHoming => "NOT REFERENCED from HOMING",
            Self::NotReferencedFromConfiguration => "NOT REFERENCED from CONFIGURATION",
            Self::NotReferencedFromDisable => "NOT REFERENCED from DISABLE",
            Self::NotReferencedFromReady => "NOT REFERENCED from READY",
            Self::NotReferencedFromMoving => "NOT REFERENCED from MOVING",
            Self::NotReferencedNoParameters => "NOT REFERENCED - NO PARAMETERS IN MEMORY",
            Self::Configuration => "CONFIGURATION",
            Self::Homing => "HOMING",
            Self::Moving => "MOVING",
            Self::ReadyFromHoming => "READY from HOMING",
            Self::ReadyFromMoving => "READY from MOVING",
            Self::ReadyFromDisable => "READY from DISABLE",
            Self::ReadyTFromReady => "READY T from READY",
            Self::ReadyTFromTracking => "READY T from TRACKING",
            Self::ReadyTFromDisableT => "READY T from DISABLE T",
            Self::DisableFromReady => "DISABLE from READY",
            Self::DisableFromMoving => "DISABLE from MOVING",
            Self::DisableFromTracking => "DISABLE from TRACKING",
            Self::DisableFromReadyT => "DISABLE from READY T",
            Self::TrackingFromReadyT => "TRACKING from READY T",
            Self::TrackingFromTracking => "TRACKING from TRACKING",
        }
    }

    pub fn category(&self) -> StateCategory {
        match self {
            Self::NotReferencedFromReset
            | Self::NotReferencedFromHoming
            | Self::NotReferencedFromConfiguration
            | Self::NotReferencedFromDisable
            | Self::NotReferencedFromReady
            | Self::NotReferencedFromMoving
            | Self::NotReferencedNoParameters => StateCategory::NotReferenced,
            Self::Configuration => StateCategory::Configuration,
            Self::Homing => StateCategory::Homing,
            Self::Moving => StateCategory::Moving,
            Self::ReadyFromHoming
            | Self::ReadyFromMoving
            | Self::ReadyFromDisable
            | Self::ReadyTFromReady
            | Self::ReadyTFromTracking
            | Self::ReadyTFromDisableT => StateCategory::Ready,
            Self::DisableFromReady
            | Self::DisableFromMoving
            | Self::DisableFromTracking
            | Self::DisableFromReadyT => StateCategory::Disable,
            Self::TrackingFromReadyT | Self::TrackingFromTracking => StateCategory::Tracking,
        }
    }

    /// Whether a new motion command may be issued from this state.
    pub fn is_ready(&self) -> bool {
        self.category() == StateCategory::Ready
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}

/// Positioner error bits reported alongside the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionerError(u16);

impl PositionerError {
    const FAULTS: [(u16, &'static str); 10] = [
        (0x0200, "80 W output power exceeded"),
        (0x0100, "DC voltage too low"),
        (0x0080, "Wrong ESP stage"),
        (0x0040, "Homing time out"),
        (0x0020, "Following error"),
        (0x0010, "Short circuit detection"),
        (0x0008, "RMS current limit"),
        (0x0004, "Peak current limit"),
        (0x0002, "Positive end of run"),
        (0x0001, "Negative end of run"),
    ];

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        u16::from_str_radix(hex, 16).ok().map(Self)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The hex code as reported by the controller, or an empty string when no fault is pending.
    pub fn code(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{:04X}", self.0)
        }
    }

    pub fn descriptions(&self) -> Vec<&'static str> {
        Self::FAULTS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, description)| *description)
            .collect()
    }
}

/// State and positioner error read together in a single `TS` round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateReport {
    pub state: ControllerState,
    pub error: PositionerError,
}

impl StateReport {
    /// Decode the payload of a `TS` reply, e.g. `000032`.
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        if payload.len() != 6 || !payload.is_ascii() {
            return None;
        }
        let (error, state) = payload.split_at(4);
        Some(Self {
            state: ControllerState::from_code(state)?,
            error: PositionerError::from_hex(error)?,
        })
    }
}

/// Error letter returned by the `TE` command. `@` means no error is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandError(char);

impl CommandError {
    pub const NONE: char = '@';

    pub fn from_code(code: char) -> Option<Self> {
        if code == Self::NONE {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn code(&self) -> char {
        self.0
    }

    pub fn description(&self) -> &'static str {
        match self.0 {
            'A' => "Unknown message code or floating point controller address",
            'B' => "Controller address not correct",
            'C' => "Parameter missing or out of specified range",
            'D' => "Command not allowed",
            'E' => "Home sequence already started",
            'F' => "ESP stage name unknown",
            'G' => "Displacement out of limits",
            'H' => "Command not allowed in NOT REFERENCED state",
            'I' => "Command not allowed in CONFIGURATION state",
            'J' => "Command not allowed in DISABLE state",
            'K' => "Command not allowed in READY state",
            'L' => "Command not allowed in HOMING state",
            'M' => "Command not allowed in MOVING state",
            'N' => "Current position out of software limit",
            'S' => "Communication time out",
            'U' => "Error during EEPROM access",
            'V' => "Error during command execution",
            'W' => "Command not allowed for PP version",
            'X' => "Command not allowed for CC version",
            _ => "Unknown error code",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_and_are_unique() {
        for state in ControllerState::ALL {
            assert_eq!(ControllerState::from_code(state.code()), Some(state));
        }
        let mut codes: Vec<_> = ControllerState::ALL.iter().map(|s| s.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ControllerState::ALL.len());
    }

    #[test]
    fn test_from_code_ignores_case_and_rejects_unknown() {
        assert_eq!(
            ControllerState::from_code("3c"),
            Some(ControllerState::DisableFromReady)
        );
        assert_eq!(ControllerState::from_code("99"), None);
        assert_eq!(ControllerState::from_code(""), None);
    }

    #[test]
    fn test_ready_states() {
        let ready: Vec<_> = ControllerState::ALL
            .into_iter()
            .filter(ControllerState::is_ready)
            .map(|s| s.code())
            .collect();
        assert_eq!(ready, vec!["32", "33", "34", "36", "37", "38"]);
        assert!(!ControllerState::Moving.is_ready());
        assert!(!ControllerState::Homing.is_ready());
    }

    #[test]
    fn test_display_mentions_code_and_label() {
        assert_eq!(ControllerState::Moving.to_string(), "28 (MOVING)");
    }

    #[test]
    fn test_parse_state_report() {
        let report = StateReport::parse("000033").unwrap();
        assert_eq!(report.state, ControllerState::ReadyFromMoving);
        assert!(report.error.is_empty());
        assert_eq!(report.error.code(), "");

        let report = StateReport::parse("00420A").unwrap();
        assert_eq!(report.state, ControllerState::NotReferencedFromReset);
        assert_eq!(report.error.code(), "0042");
        assert_eq!(
            report.error.descriptions(),
            vec!["Homing time out", "Positive end of run"]
        );
    }

    #[test]
    fn test_parse_rejects_garbled_reports() {
        assert_eq!(StateReport::parse("0000"), None);
        assert_eq!(StateReport::parse("00ZZ32"), None);
        assert_eq!(StateReport::parse("000099"), None);
    }

    #[test]
    fn test_command_error_decoding() {
        assert_eq!(CommandError::from_code('@'), None);
        let error = CommandError::from_code('M').unwrap();
        assert_eq!(error.code(), 'M');
        assert_eq!(
            error.to_string(),
            "M: Command not allowed in MOVING state"
        );
    }
}
