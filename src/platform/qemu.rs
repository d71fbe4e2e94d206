// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Constants and hooks for the QEMU `virt` machine.

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
const PL011_BASE_ADDRESS: NonNull<PL011Registers> = NonNull::new(0x0900_0000 as _).unwrap();

/// The number of CPU clusters.
const CLUSTER_COUNT: usize = 1;
const PLATFORM_CPU_PER_CLUSTER_SHIFT: usize = 2;
/// The maximum number of CPUs in each cluster.
const MAX_CPUS_PER_CLUSTER: usize = 1 << PLATFORM_CPU_PER_CLUSTER_SHIFT;

const DRAM_BASE: usize = 0x4000_0000;
const DRAM_SIZE: usize = 0x4000_0000;

/// The end of the normal world image and its heap.
const NS_IMAGE_LIMIT: usize = 0x6400_0000;

static UART: Once<SpinLocked<Uart>> = Once::new();

/// The QEMU `virt` machine.
pub struct Qemu;

impl Platform for Qemu {
    const TOPOLOGY: Topology = Topology::new(CLUSTER_COUNT, MAX_CPUS_PER_CLUSTER, 1);

    const DRAM: &'static [MemRegion] = &[MemRegion::new(DRAM_BASE, DRAM_SIZE)];

    // Everything from the end of the image to the end of DRAM.
    const PROTECTED_REGIONS: &'static [MemRegion] = &[MemRegion::new(
        NS_IMAGE_LIMIT,
        DRAM_BASE + DRAM_SIZE - NS_IMAGE_LIMIT,
    )];

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

const _: () = assert!(catalog_is_valid(Qemu::PROTECTED_REGIONS, Qemu::DRAM));
