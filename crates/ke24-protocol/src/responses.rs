//! Response frame parsing.
//!
//! A response is one comma-separated line. The first field must be
//! `#<prefix>` acknowledging the sent command; the remaining fields carry
//! the payload. All numeric fields are decimal.

use crate::error::{ProtocolError, ProtocolResult};

/// Firmware version reported by the `FW` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

/// The only firmware version this crate supports.
pub const SUPPORTED_FIRMWARE: FirmwareVersion = FirmwareVersion { major: 2, minor: 0 };

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A validated response frame.
///
/// Holds the payload fields of a response whose acknowledgement prefix was
/// already checked against the sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sent: String,
    received: String,
    fields: Vec<String>,
}

impl Frame {
    /// Parse and validate a response line against the command it answers.
    ///
    /// `sent` is the unframed command string, `received` the response line
    /// with the terminator already stripped. The first response field must
    /// equal `"#" + <prefix>` where `<prefix>` is the text before the first
    /// comma of `sent`.
    pub fn parse(sent: &str, received: &str) -> ProtocolResult<Frame> {
        let prefix = sent.split(',').next().unwrap_or(sent);
        let mut parts = received.split(',');

        let ack = parts.next().unwrap_or("");
        if ack.strip_prefix('#') != Some(prefix) {
            return Err(ProtocolError::Mismatch {
                sent: sent.to_string(),
                received: received.to_string(),
            });
        }

        Ok(Frame {
            sent: sent.to_string(),
            received: received.to_string(),
            fields: parts.map(str::to_string).collect(),
        })
    }

    /// Number of payload fields (acknowledgement excluded).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the frame carries no payload fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The payload fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Build a [`ProtocolError::Malformed`] for this frame.
    pub fn malformed(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Malformed {
            sent: self.sent.clone(),
            received: self.received.clone(),
            reason: reason.into(),
        }
    }

    /// Get a payload field by position.
    pub fn field(&self, index: usize) -> ProtocolResult<&str> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.malformed(format!("missing field {}", index)))
    }

    /// Get a payload field as a decimal integer.
    pub fn field_u8(&self, index: usize) -> ProtocolResult<u8> {
        let raw = self.field(index)?;
        raw.parse()
            .map_err(|_| self.malformed(format!("field {} is not a number: `{}`", index, raw)))
    }

    /// Get a payload field as a boolean (`0` or `1`).
    pub fn field_bool(&self, index: usize) -> ProtocolResult<bool> {
        match self.field_u8(index)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.malformed(format!("field {} is not 0 or 1: {}", index, other))),
        }
    }

    /// Parse a `<major>.<minor>` version payload field.
    pub fn field_version(&self, index: usize) -> ProtocolResult<FirmwareVersion> {
        let raw = self.field(index)?;
        let parse = || -> Option<FirmwareVersion> {
            let (major, minor) = raw.split_once('.')?;
            Some(FirmwareVersion {
                major: major.parse().ok()?,
                minor: minor.parse().ok()?,
            })
        };
        parse().ok_or_else(|| self.malformed(format!("field {} is not a version: `{}`", index, raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acknowledged_frame() {
        let frame = Frame::parse("RDR,1", "#RDR,1,0").unwrap();
        assert_eq!(frame.fields(), &["1", "0"]);
        assert_eq!(frame.field_u8(0).unwrap(), 1);
        assert!(!frame.field_bool(1).unwrap());
    }

    #[test]
    fn test_prefix_is_text_before_first_comma() {
        // IO,SET acknowledges with "#IO", leaving "SET" as a payload field.
        let frame = Frame::parse("IO,SET,3,1", "#IO,SET,OK").unwrap();
        assert_eq!(frame.fields(), &["SET", "OK"]);
    }

    #[test]
    fn test_wrong_ack_is_mismatch() {
        let err = Frame::parse("RDR,1", "#REL,OK").unwrap_err();
        assert!(matches!(err, ProtocolError::Mismatch { .. }));
    }

    #[test]
    fn test_missing_hash_is_mismatch() {
        let err = Frame::parse("FW", "FW,2.0").unwrap_err();
        assert!(matches!(err, ProtocolError::Mismatch { .. }));
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let frame = Frame::parse("SER", "#SER").unwrap();
        assert!(matches!(
            frame.field(0),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let frame = Frame::parse("RDR,1", "#RDR,one,0").unwrap();
        assert!(matches!(
            frame.field_u8(0),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_version_field() {
        let frame = Frame::parse("FW", "#FW,2.0").unwrap();
        let version = frame.field_version(0).unwrap();
        assert_eq!(version, FirmwareVersion { major: 2, minor: 0 });
        assert_eq!(version.to_string(), "2.0");
    }

    #[test]
    fn test_bad_version_field() {
        let frame = Frame::parse("FW", "#FW,two.oh").unwrap();
        assert!(frame.field_version(0).is_err());
    }
}
