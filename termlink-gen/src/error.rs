//! Generator errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("payload rate must be 1-{max}ms, got {rate}")]
    RateOutOfRange { rate: u32, max: u32 },

    #[error("payload size must be 1-{max} bytes, got {size}")]
    SizeOutOfRange { size: usize, max: usize },

    #[error("max server clients must be 1-{max}, got {count}")]
    ClientsOutOfRange { count: u8, max: u8 },

    #[error(transparent)]
    Frame(#[from] termlink_frame::FrameError),

    #[error(transparent)]
    Serial(#[from] termlink_serial::SerialError),

    #[error(transparent)]
    Client(#[from] termlink_client::ClientError),

    #[error(transparent)]
    Server(#[from] termlink_server::ServerError),
}
