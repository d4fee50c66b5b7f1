//! Low-level serial port access.
//!
//! `SerialIo` is the seam between the driver and the operating system. The
//! driver only ever talks to a port through it, so tests substitute a
//! scripted implementation.

use crate::settings::{BaudRate, DataBits, ParityType, SerialSettings, StopBits};
use nix::fcntl::OFlag;
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;

/// Read returns after this many tenths of a second without data.
pub const READ_TIMEOUT_DECISECONDS: u8 = 5;

/// Terminal attributes of an open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAttributes {
    pub input_flags: InputFlags,
    pub output_flags: OutputFlags,
    pub control_flags: ControlFlags,
    pub local_flags: LocalFlags,
    /// Minimum number of bytes for a read to return.
    pub vmin: u8,
    /// Read timeout in tenths of a second.
    pub vtime: u8,
    pub speed: termios::BaudRate,
}

impl Default for PortAttributes {
    fn default() -> Self {
        Self {
            input_flags: InputFlags::empty(),
            output_flags: OutputFlags::empty(),
            control_flags: ControlFlags::empty(),
            local_flags: LocalFlags::empty(),
            vmin: 0,
            vtime: 0,
            speed: termios::BaudRate::B9600,
        }
    }
}

impl PortAttributes {
    /// Switches to raw mode and applies the line settings.
    ///
    /// Reads return whatever is available, or nothing after
    /// `READ_TIMEOUT_DECISECONDS`.
    pub fn apply_settings(&mut self, settings: &SerialSettings) {
        self.speed = speed_of(settings.baud_rate);

        // insert/remove keep the bits nix has no name for.
        self.control_flags
            .insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
        self.control_flags.remove(ControlFlags::CRTSCTS);

        self.control_flags.remove(ControlFlags::CSIZE);
        self.control_flags.insert(match settings.data_bits {
            DataBits::Five => ControlFlags::CS5,
            DataBits::Six => ControlFlags::CS6,
            DataBits::Seven => ControlFlags::CS7,
            DataBits::Eight => ControlFlags::CS8,
        });

        self.control_flags.set(
            ControlFlags::PARENB,
            settings.parity != ParityType::None,
        );
        self.control_flags
            .set(ControlFlags::PARODD, settings.parity == ParityType::Odd);
        self.control_flags
            .set(ControlFlags::CSTOPB, settings.stop_bits == StopBits::Two);

        self.input_flags.remove(
            InputFlags::IGNBRK
                | InputFlags::BRKINT
                | InputFlags::PARMRK
                | InputFlags::ISTRIP
                | InputFlags::INLCR
                | InputFlags::IGNCR
                | InputFlags::ICRNL
                | InputFlags::IXON,
        );
        self.local_flags.remove(
            LocalFlags::ECHO
                | LocalFlags::ECHONL
                | LocalFlags::ICANON
                | LocalFlags::ISIG
                | LocalFlags::IEXTEN,
        );
        self.output_flags.remove(OutputFlags::OPOST);

        self.vmin = 0;
        self.vtime = READ_TIMEOUT_DECISECONDS;
    }
}

fn speed_of(baud_rate: BaudRate) -> termios::BaudRate {
    match baud_rate {
        BaudRate::Br1200 => termios::BaudRate::B1200,
        BaudRate::Br2400 => termios::BaudRate::B2400,
        BaudRate::Br4800 => termios::BaudRate::B4800,
        BaudRate::Br9600 => termios::BaudRate::B9600,
        BaudRate::Br19200 => termios::BaudRate::B19200,
        BaudRate::Br38400 => termios::BaudRate::B38400,
        BaudRate::Br57600 => termios::BaudRate::B57600,
        BaudRate::Br115200 => termios::BaudRate::B115200,
    }
}

/// Operating system access to serial ports.
///
/// A port is closed when its `Port` value is dropped. `read` and `write`
/// may be called concurrently on the same port.
pub trait SerialIo: Send + Sync + 'static {
    type Port: Send + Sync + 'static;

    fn open(&self, device: &str) -> io::Result<Self::Port>;

    fn get_attributes(&self, port: &Self::Port) -> io::Result<PortAttributes>;

    fn set_attributes(&self, port: &Self::Port, attrs: &PortAttributes) -> io::Result<()>;

    /// Reads available bytes. `Ok(0)` means the read timed out, or the
    /// device went away; `get_attributes` tells the two apart.
    fn read(&self, port: &Self::Port, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, port: &Self::Port, data: &[u8]) -> io::Result<usize>;
}

/// `SerialIo` over POSIX termios.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermiosIo;

impl SerialIo for TermiosIo {
    type Port = File;

    fn open(&self, device: &str) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags((OFlag::O_NOCTTY | OFlag::O_SYNC).bits())
            .open(device)
    }

    fn get_attributes(&self, port: &File) -> io::Result<PortAttributes> {
        let tty = termios::tcgetattr(port)?;
        Ok(PortAttributes {
            input_flags: tty.input_flags,
            output_flags: tty.output_flags,
            control_flags: tty.control_flags,
            local_flags: tty.local_flags,
            vmin: tty.control_chars[SpecialCharacterIndices::VMIN as usize],
            vtime: tty.control_chars[SpecialCharacterIndices::VTIME as usize],
            speed: termios::cfgetospeed(&tty),
        })
    }

    fn set_attributes(&self, port: &File, attrs: &PortAttributes) -> io::Result<()> {
        let mut tty = termios::tcgetattr(port)?;
        tty.input_flags = attrs.input_flags;
        tty.output_flags = attrs.output_flags;
        tty.control_flags = attrs.control_flags;
        tty.local_flags = attrs.local_flags;
        tty.control_chars[SpecialCharacterIndices::VMIN as usize] = attrs.vmin;
        tty.control_chars[SpecialCharacterIndices::VTIME as usize] = attrs.vtime;
        termios::cfsetispeed(&mut tty, attrs.speed)?;
        termios::cfsetospeed(&mut tty, attrs.speed)?;
        termios::tcsetattr(port, SetArg::TCSANOW, &tty)?;
        Ok(())
    }

    fn read(&self, port: &File, buf: &mut [u8]) -> io::Result<usize> {
        let mut port = port;
        port.read(buf)
    }

    fn write(&self, port: &File, data: &[u8]) -> io::Result<usize> {
        let mut port = port;
        port.write(data)
    }
}
