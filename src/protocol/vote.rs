//! The decoded vote record.

use serde::{Deserialize, Serialize};

use super::fields::{field_to_string, read_fields};
use super::{FIELD_COUNT, OPCODE};

/// Reasons a decrypted block is not a well-formed vote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The plaintext ended before all fields were read.
    #[error("expected {expected} fields, found {found}")]
    MissingField { expected: usize, found: usize },

    /// The leading field was not the `VOTE` opcode.
    #[error("unexpected opcode {0:?}")]
    BadOpcode(String),
}

/// One reported vote: which service, which user, from where, and when.
///
/// Immutable once built; equality is field equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    service_name: String,
    username: String,
    address: String,
    timestamp: String,
}

impl Vote {
    pub fn new(
        service_name: impl Into<String>,
        username: impl Into<String>,
        address: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            username: username.into(),
            address: address.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Parse a decrypted block.
    ///
    /// Reads exactly five fields; the first must be `VOTE`. Whatever follows
    /// the fifth field is ignored.
    pub fn decode(plaintext: &[u8]) -> Result<Self, ProtocolError> {
        let mut fields = read_fields(plaintext);

        let opcode = fields.next().ok_or(ProtocolError::MissingField {
            expected: FIELD_COUNT,
            found: 0,
        })?;
        if opcode != OPCODE.as_bytes() {
            return Err(ProtocolError::BadOpcode(field_to_string(opcode)));
        }

        let mut values: [String; FIELD_COUNT - 1] = Default::default();
        for (i, slot) in values.iter_mut().enumerate() {
            let field = fields.next().ok_or(ProtocolError::MissingField {
                expected: FIELD_COUNT,
                found: i + 1,
            })?;
            *slot = field_to_string(field);
        }

        let [service_name, username, address, timestamp] = values;
        Ok(Self {
            service_name,
            username,
            address,
            timestamp,
        })
    }

    /// Plaintext form a sender encrypts: `VOTE\n<service>\n<user>\n<address>\n<timestamp>\n`.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}\n{}\n{}\n",
            OPCODE, self.service_name, self.username, self.address, self.timestamp
        )
        .into_bytes()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Vote (from:{} username:{} address:{} timeStamp:{})",
            self.service_name, self.username, self.address, self.timestamp
        )
    }
}
