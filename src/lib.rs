// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Multiprocessor synchronisation and SMC dispatch primitives for the RF-A secure test framework.
//!
//! Test code running on several physical cores at once uses this crate to:
//!
//! - serialise access to shared state with a [`SpinLock`](spinlock::SpinLock),
//! - find its own linear core index from `MPIDR_EL1` ([`platform::my_core_pos`]),
//! - discover the platform's protected memory regions ([`regions::protected_regions`]),
//! - issue SMC or HVC calls to a higher exception level through a [`Conduit`](smc::Conduit),
//! - print diagnostics without interleaving lines from different cores ([`mp_println!`]).

#![cfg_attr(not(test), no_std)]

pub mod logger;
pub mod platform;
pub mod regions;
pub mod services;
pub mod smc;
pub mod spinlock;
pub mod topology;
