// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Per-platform constants and hooks, and resolution of the running core's identity.

pub mod fvp;
pub mod qemu;

use crate::{
    regions::MemRegion,
    topology::{Topology, TopologyError},
};
use arm_sysregs::{MpidrEl1, read_mpidr_el1};
use core::fmt::Write;
use log::error;
use percore::Cores;

/// The platform which the image is built for.
#[cfg(test)]
pub type PlatformImpl = test::TestPlatform;
/// The platform which the image is built for.
#[cfg(all(not(test), platform = "qemu"))]
pub type PlatformImpl = qemu::Qemu;
/// The platform which the image is built for.
#[cfg(all(not(test), not(platform = "qemu")))]
pub type PlatformImpl = fvp::Fvp;

/// The constants and hooks provided by each platform.
pub trait Platform {
    /// The shape of the CPU topology.
    const TOPOLOGY: Topology;

    /// The number of CPU cores.
    const CORE_COUNT: usize = Self::TOPOLOGY.core_count();

    /// The banks of DRAM available to the normal world.
    const DRAM: &'static [MemRegion];

    /// The regions of memory which the platform asks to be protected, e.g. by PSCI `MEM_PROTECT`.
    ///
    /// These must be non-empty, pairwise disjoint and each lie within a single bank of
    /// [`Self::DRAM`].
    const PROTECTED_REGIONS: &'static [MemRegion];

    /// Returns something to which logs should be sent.
    ///
    /// This should only be called once, and may panic on subsequent calls.
    fn make_log_sink() -> &'static mut (dyn Write + Send);

    /// Given an MPIDR value, returns the corresponding linear core index.
    ///
    /// Never returns the same index for two different MPIDR values, and never returns an index
    /// greater than or equal to [`Self::CORE_COUNT`]. The primary core must have index 0.
    fn core_position(mpidr: MpidrEl1) -> Result<usize, TopologyError> {
        Self::TOPOLOGY.core_position(mpidr)
    }

    /// Given a linear core index, returns the corresponding PSCI MPIDR value.
    ///
    /// This is not quite the inverse function of `core_position`, as it doesn't include the MT and
    /// U bits which `core_position` may expect. Whether the affinity fields are laid out for a
    /// multithreaded system is taken from the MT bit of the calling core.
    fn psci_mpidr_for_core(core_index: usize) -> Result<u64, TopologyError> {
        Self::TOPOLOGY.mpidr_for_core(core_index, read_mpidr_el1().contains(MpidrEl1::MT))
    }
}

/// Returns the linear index of the core with the given MPIDR value on the linked platform.
pub fn core_position(mpidr: MpidrEl1) -> Result<usize, TopologyError> {
    PlatformImpl::core_position(mpidr)
}

/// Returns the linear index of the calling core.
///
/// The result is always less than [`Platform::CORE_COUNT`], and stays the same for as long as the
/// core is running.
///
/// # Panics
///
/// Panics if the core's MPIDR value isn't part of the platform's topology. That can only happen if
/// the image was built for a different platform from the one it is running on, and continuing would
/// let two cores share per-core state.
pub fn my_core_pos() -> usize {
    core_position_or_panic(read_mpidr_el1())
}

fn core_position_or_panic(mpidr: MpidrEl1) -> usize {
    match core_position(mpidr) {
        Ok(index) => index,
        Err(e) => {
            error!("Can't find own core position: {e}");
            panic!("{e}");
        }
    }
}

// SAFETY: `my_core_pos` either returns a unique index below `CORE_COUNT` for each core, because
// `Topology::core_position` rejects rather than clamps out of range fields, or doesn't return.
unsafe impl Cores for PlatformImpl {
    fn core_index() -> usize {
        my_core_pos()
    }
}
