//! What a generator sends, and how often.

use crate::error::GenError;
use std::time::Duration;
use termlink_frame::{encode_frame, DataMode, MAX_PAYLOAD_LENGTH};

/// Longest accepted send period.
pub const MAX_RATE_MS: u32 = 10_000;

/// Largest accepted `size`.
pub const MAX_SIZE: usize = MAX_PAYLOAD_LENGTH;

/// Payload options as given on the command line.
///
/// When `text` is set it replaces the generated payload and `size` is
/// ignored. Otherwise the payload is `size` ASCII `'0'` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSpec {
    pub rate_ms: u32,
    pub size: usize,
    pub text: Option<String>,
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self {
            rate_ms: 100,
            size: 100,
            text: None,
        }
    }
}

impl PayloadSpec {
    pub fn with_rate(mut self, rate_ms: u32) -> Self {
        self.rate_ms = rate_ms;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets explicit payload text. Empty text is ignored.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = (!text.is_empty()).then_some(text);
        self
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if !(1..=MAX_RATE_MS).contains(&self.rate_ms) {
            return Err(GenError::RateOutOfRange {
                rate: self.rate_ms,
                max: MAX_RATE_MS,
            });
        }
        if self.text.is_none() && !(1..=MAX_SIZE).contains(&self.size) {
            return Err(GenError::SizeOutOfRange {
                size: self.size,
                max: MAX_SIZE,
            });
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(u64::from(self.rate_ms))
    }

    /// Bytes handed to the transport's `write` on every tick.
    ///
    /// Delimiter mode terminates the payload with `\n`; header mode sends
    /// it as is, the transport adds the length prefix. The result is
    /// checked against the frame limit of `mode`.
    pub fn build(&self, mode: DataMode) -> Result<Vec<u8>, GenError> {
        let mut bytes = self.body()?;
        if mode == DataMode::NewLineDelimiter {
            bytes.push(b'\n');
        }
        encode_frame(mode, &bytes)?;
        Ok(bytes)
    }

    /// Same as `build` for transports without a frame limit.
    pub fn build_unbounded(&self) -> Result<Vec<u8>, GenError> {
        let mut bytes = self.body()?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn body(&self) -> Result<Vec<u8>, GenError> {
        self.validate()?;
        Ok(match &self.text {
            Some(text) => text.as_bytes().to_vec(),
            None => vec![b'0'; self.size],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termlink_frame::FrameError;

    #[test]
    fn test_default_payload() {
        let bytes = PayloadSpec::default()
            .build(DataMode::NewLineDelimiter)
            .unwrap();
        assert_eq!(bytes.len(), 101);
        assert!(bytes[..100].iter().all(|&b| b == b'0'));
        assert_eq!(bytes[100], b'\n');
    }

    #[test]
    fn test_text_overrides_size() {
        let spec = PayloadSpec::default().with_size(7).with_text("HELLO");
        assert_eq!(spec.build(DataMode::NewLineDelimiter).unwrap(), b"HELLO\n");
        assert_eq!(spec.build(DataMode::PayloadHeader).unwrap(), b"HELLO");

        let spec = PayloadSpec::default().with_size(3).with_text("");
        assert_eq!(spec.text, None);
        assert_eq!(spec.build(DataMode::PayloadHeader).unwrap(), b"000");
    }

    #[test]
    fn test_rate_bounds() {
        assert!(PayloadSpec::default().with_rate(1).validate().is_ok());
        assert!(PayloadSpec::default().with_rate(10_000).validate().is_ok());
        assert!(matches!(
            PayloadSpec::default().with_rate(0).validate(),
            Err(GenError::RateOutOfRange { rate: 0, .. })
        ));
        assert!(matches!(
            PayloadSpec::default().with_rate(10_001).validate(),
            Err(GenError::RateOutOfRange { .. })
        ));
        assert_eq!(
            PayloadSpec::default().with_rate(250).period(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_size_bounds() {
        assert!(matches!(
            PayloadSpec::default().with_size(0).validate(),
            Err(GenError::SizeOutOfRange { size: 0, .. })
        ));
        assert!(matches!(
            PayloadSpec::default().with_size(MAX_SIZE + 1).validate(),
            Err(GenError::SizeOutOfRange { .. })
        ));
        assert!(PayloadSpec::default().with_size(MAX_SIZE).validate().is_ok());
    }

    #[test]
    fn test_frame_limit_per_mode() {
        let spec = PayloadSpec::default().with_size(MAX_SIZE - 1);
        assert_eq!(spec.build(DataMode::NewLineDelimiter).unwrap().len(), MAX_SIZE);
        assert!(matches!(
            spec.build(DataMode::PayloadHeader),
            Err(GenError::Frame(FrameError::FrameTooLarge { .. }))
        ));

        let spec = PayloadSpec::default().with_size(MAX_SIZE);
        assert!(spec.build(DataMode::NewLineDelimiter).is_err());
        assert_eq!(spec.build_unbounded().unwrap().len(), MAX_SIZE + 1);
    }
}
