// SPDX-License-Identifier: MPL-2.0

//! Decoder implementations

pub mod qr_detector;
