//! Control commands understood by the acquisition board.
//!
//! Every command is one ASCII line `0<ch>00000000CC<code>\r\n`, addressed to a
//! single channel.

use super::channel::Channel;
use std::fmt;

/// LED drive pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    /// 10 Hz, 40 % duty
    Hz10Pulsed,
    /// 10 Hz, constant
    Hz10Constant,
    /// 50 Hz, 40 % duty
    Hz50Pulsed,
    /// 50 Hz, constant
    Hz50Constant,
    /// 100 Hz, 40 % duty
    Hz100Pulsed,
    /// 100 Hz, constant
    Hz100Constant,
}

impl LedMode {
    /// Every mode in menu order.
    pub const ALL: [LedMode; 6] = [
        LedMode::Hz10Pulsed,
        LedMode::Hz10Constant,
        LedMode::Hz50Pulsed,
        LedMode::Hz50Constant,
        LedMode::Hz100Pulsed,
        LedMode::Hz100Constant,
    ];

    /// Operator-facing label, e.g. `50Hz/40%`.
    pub fn label(self) -> &'static str {
        match self {
            LedMode::Hz10Pulsed => "10Hz/40%",
            LedMode::Hz10Constant => "10Hz/const",
            LedMode::Hz50Pulsed => "50Hz/40%",
            LedMode::Hz50Constant => "50Hz/const",
            LedMode::Hz100Pulsed => "100Hz/40%",
            LedMode::Hz100Constant => "100Hz/const",
        }
    }

    /// Mode for a label, if it names one.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.label() == label)
    }

    fn code(self) -> char {
        match self {
            LedMode::Hz10Pulsed => 'A',
            LedMode::Hz10Constant => 'B',
            LedMode::Hz50Pulsed => 'C',
            LedMode::Hz50Constant => 'D',
            LedMode::Hz100Pulsed => 'E',
            LedMode::Hz100Constant => 'F',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }
}

/// What a command asks the board to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    /// Start streaming samples (`J`)
    StartStream,
    /// Stop streaming samples (`K`)
    StopStream,
    /// Switch the LED on (`H`)
    LedOn,
    /// Switch the LED off (`I`)
    LedOff,
    /// Change LED pattern (`G` + mode letter)
    LedMode(LedMode),
}

/// One addressed board command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCommand {
    /// Target channel
    pub channel: Channel,
    /// Action
    pub code: CommandCode,
}

impl DeviceCommand {
    /// Command `code` for `channel`.
    pub fn new(channel: Channel, code: CommandCode) -> Self {
        Self { channel, code }
    }

    /// Wire form, terminator included.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }

    /// Parse a wire line (terminator optional).
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim_end_matches(['\r', '\n']);
        let rest = body.strip_prefix('0')?;
        let mut chars = rest.chars();
        let number = chars.next()?.to_digit(10)?;
        let channel = Channel::from_number(number as u8).ok()?;
        let code = chars.as_str().strip_prefix("00000000CC")?;

        let mut code_chars = code.chars();
        let code = match (code_chars.next()?, code_chars.next(), code_chars.next()) {
            ('J', None, _) => CommandCode::StartStream,
            ('K', None, _) => CommandCode::StopStream,
            ('H', None, _) => CommandCode::LedOn,
            ('I', None, _) => CommandCode::LedOff,
            ('G', Some(mode), None) => CommandCode::LedMode(LedMode::from_code(mode)?),
            _ => return None,
        };
        Some(Self { channel, code })
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0{}00000000CC", self.channel.number())?;
        match self.code {
            CommandCode::StartStream => write!(f, "J")?,
            CommandCode::StopStream => write!(f, "K")?,
            CommandCode::LedOn => write!(f, "H")?,
            CommandCode::LedOff => write!(f, "I")?,
            CommandCode::LedMode(mode) => write!(f, "G{}", mode.code())?,
        }
        write!(f, "\r\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_board_protocol() {
        assert_eq!(
            DeviceCommand::new(Channel::One, CommandCode::StartStream).to_wire(),
            "0100000000CCJ\r\n"
        );
        assert_eq!(
            DeviceCommand::new(Channel::Two, CommandCode::StopStream).to_wire(),
            "0200000000CCK\r\n"
        );
        assert_eq!(
            DeviceCommand::new(Channel::Two, CommandCode::LedMode(LedMode::Hz50Constant)).to_wire(),
            "0200000000CCGD\r\n"
        );
    }

    #[test]
    fn parse_inverts_to_wire() {
        for mode in LedMode::ALL {
            let cmd = DeviceCommand::new(Channel::One, CommandCode::LedMode(mode));
            assert_eq!(DeviceCommand::parse(&cmd.to_wire()), Some(cmd));
        }
        assert_eq!(DeviceCommand::parse("0300000000CCJ\r\n"), None);
        assert_eq!(DeviceCommand::parse("0100000000CCX"), None);
        assert_eq!(DeviceCommand::parse("0100000000CCJK"), None);
    }

    #[test]
    fn led_mode_labels() {
        assert_eq!(LedMode::from_label("100Hz/40%"), Some(LedMode::Hz100Pulsed));
        assert_eq!(LedMode::from_label("7Hz"), None);
    }
}
