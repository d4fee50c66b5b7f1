//! Serial port settings.
//!
//! Every setting has a canonical upper-case name (`BR_115200`, `EIGHT`,
//! `NONE`, `ONE`) used on command lines and in configuration files.

use crate::error::SerialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = SerialError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(SerialError::UnknownSetting {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

named_enum! {
    /// Line speed.
    BaudRate, "baud rate" {
        Br1200 => "BR_1200",
        Br2400 => "BR_2400",
        Br4800 => "BR_4800",
        Br9600 => "BR_9600",
        Br19200 => "BR_19200",
        Br38400 => "BR_38400",
        Br57600 => "BR_57600",
        Br115200 => "BR_115200",
    }
}

named_enum! {
    /// Character size.
    DataBits, "data bits" {
        Five => "FIVE",
        Six => "SIX",
        Seven => "SEVEN",
        Eight => "EIGHT",
    }
}

named_enum! {
    ParityType, "parity" {
        None => "NONE",
        Even => "EVEN",
        Odd => "ODD",
    }
}

named_enum! {
    StopBits, "stop bits" {
        One => "ONE",
        Two => "TWO",
    }
}

impl BaudRate {
    /// Bits per second.
    pub fn bits_per_second(&self) -> u32 {
        match self {
            BaudRate::Br1200 => 1200,
            BaudRate::Br2400 => 2400,
            BaudRate::Br4800 => 4800,
            BaudRate::Br9600 => 9600,
            BaudRate::Br19200 => 19200,
            BaudRate::Br38400 => 38400,
            BaudRate::Br57600 => 57600,
            BaudRate::Br115200 => 115200,
        }
    }
}

/// Everything needed to open a serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub device: String,
    pub baud_rate: BaudRate,
    pub data_bits: DataBits,
    pub parity: ParityType,
    pub stop_bits: StopBits,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: BaudRate::Br115200,
            data_bits: DataBits::Eight,
            parity: ParityType::None,
            stop_bits: StopBits::One,
        }
    }
}

impl SerialSettings {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: BaudRate) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: ParityType) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.device, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}
