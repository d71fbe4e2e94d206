// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Typed helpers for the standard SMCCC services which tests call most often.
//!
//! Unlike the [transport](crate::smc), these interpret the status words they get back.

pub mod arch;
pub mod psci;
