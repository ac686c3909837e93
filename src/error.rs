// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use thiserror::Error;

/// A record whose fields could not be decoded as declared.
///
/// Decoding failures are local to one record. The dump loop reports them
/// and falls back to a hex dump of whatever could not be consumed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A field read ran past the end of the record payload.
    #[error("record truncated at offset {offset:#x}, {wanted} byte(s) wanted")]
    Truncated { offset: usize, wanted: usize },

    /// A field carried a value the record grammar does not allow.
    #[error("{0}")]
    Invalid(String),
}

impl DecodeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
