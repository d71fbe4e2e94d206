// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Constants and hooks for the Arm FVP Base RevC model.

use super::Platform;
use crate::{
    regions::{MemRegion, catalog_is_valid},
    spinlock::{SpinLocked, SpinLockedGuard},
    topology::Topology,
};
use arm_pl011_uart::{PL011Registers, Uart, UniqueMmioPointer};
use core::{fmt::Write, ptr::NonNull};
use spin::Once;

/// Base address of the primary PL011 UART.
const PL011_BASE_ADDRESS: NonNull<PL011Registers> = NonNull::new(0x1C09_0000 as _).unwrap();

const FVP_CLUSTER_COUNT: usize = 2;
const FVP_MAX_CPUS_PER_CLUSTER: usize = 4;
const FVP_MAX_PE_PER_CPU: usize = 1;

const DRAM1_BASE: usize = 0x8000_0000;
const DRAM1_SIZE: usize = 0x8000_0000;
const DRAM2_BASE: usize = 0x8_8000_0000;
const DRAM2_SIZE: usize = 0x8000_0000;

/// The normal world image is loaded here, and everything above it in the first DRAM bank is free
/// for tests to use.
const NS_IMAGE_BASE: usize = 0x8800_0000;
const NS_IMAGE_MAX_SIZE: usize = 32 << 21;
const NS_IMAGE_LIMIT: usize = NS_IMAGE_BASE + NS_IMAGE_MAX_SIZE;

const SZ_1G: usize = 0x4000_0000;

static UART: Once<SpinLocked<Uart>> = Once::new();

/// The Arm Fixed Virtual Platform Base RevC model.
pub struct Fvp;

impl Platform for Fvp {
    const TOPOLOGY: Topology =
        Topology::new(FVP_CLUSTER_COUNT, FVP_MAX_CPUS_PER_CLUSTER, FVP_MAX_PE_PER_CPU);

    const DRAM: &'static [MemRegion] = &[
        MemRegion::new(DRAM1_BASE, DRAM1_SIZE),
        MemRegion::new(DRAM2_BASE, DRAM2_SIZE),
    ];

    const PROTECTED_REGIONS: &'static [MemRegion] = &[
        MemRegion::new(NS_IMAGE_LIMIT, SZ_1G),
        MemRegion::new(DRAM2_BASE, SZ_1G),
    ];

    fn make_log_sink() -> &'static mut (dyn Write + Send) {
        let uart = UART.call_once(|| {
            // SAFETY: `PL011_BASE_ADDRESS` is the base address of a PL011 device, and nothing else
            // accesses that address range.
            SpinLocked::new(Uart::new(unsafe {
                UniqueMmioPointer::new(PL011_BASE_ADDRESS)
            }))
        });
        let uart: &'static mut Uart = SpinLockedGuard::leak(uart.lock());
        uart
    }
}

const _: () = assert!(catalog_is_valid(Fvp::PROTECTED_REGIONS, Fvp::DRAM));
