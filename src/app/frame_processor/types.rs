// SPDX-License-Identifier: MPL-2.0

//! Decoder output

/// Text payload of a decoded barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
}

impl Decoded {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
