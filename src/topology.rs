// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Mapping between MPIDR affinity values and dense linear core indices.

use arm_sysregs::MpidrEl1;
use thiserror::Error;

/// The maximum value which fits in a single MPIDR affinity field, plus one.
const AFFINITY_FIELD_VALUES: usize = 1 << MpidrEl1::AFFINITY_BITS;

/// The shape of a platform's CPU topology.
///
/// Every cluster is assumed to have the same number of cores, and every core the same number of
/// hardware threads.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Topology {
    /// The number of clusters.
    pub cluster_count: usize,
    /// The maximum number of cores in each cluster.
    pub cores_per_cluster: usize,
    /// The number of hardware threads (processing elements) in each core.
    pub threads_per_core: usize,
}

/// The topology position of a single processing element, decoded from its MPIDR value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AffinityFields {
    /// The cluster index.
    pub cluster: usize,
    /// The core index within the cluster.
    pub core: usize,
    /// The thread index within the core.
    pub thread: usize,
}

/// An error resolving a core's identity.
///
/// Either of these means that the image was built for a different platform from the one it is
/// running on, so they are usually fatal.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TopologyError {
    /// The MPIDR value has an affinity field outside the declared topology.
    #[error("MPIDR {mpidr:#x} is not part of the platform topology")]
    UnknownAffinity {
        /// The MPIDR value which was rejected.
        mpidr: u64,
    },
    /// The linear core index doesn't correspond to any core.
    #[error("Core index {index} is out of range for {core_count} cores")]
    CoreIndexOutOfRange {
        /// The index which was rejected.
        index: usize,
        /// The number of cores in the topology.
        core_count: usize,
    },
}

impl Topology {
    /// Creates a new topology description.
    ///
    /// Panics (at compile time, when used for a constant) if any count is zero or doesn't fit in
    /// an MPIDR affinity field.
    pub const fn new(cluster_count: usize, cores_per_cluster: usize, threads_per_core: usize) -> Self {
        assert!(cluster_count > 0 && cluster_count <= AFFINITY_FIELD_VALUES);
        assert!(cores_per_cluster > 0 && cores_per_cluster <= AFFINITY_FIELD_VALUES);
        assert!(threads_per_core > 0 && threads_per_core <= AFFINITY_FIELD_VALUES);
        Self {
            cluster_count,
            cores_per_cluster,
            threads_per_core,
        }
    }

    /// Returns the total number of processing elements.
    pub const fn core_count(&self) -> usize {
        self.cluster_count * self.cores_per_cluster * self.threads_per_core
    }

    /// Splits the given MPIDR value into its cluster, core and thread fields.
    ///
    /// If the MT bit is set then Aff0 is the thread, Aff1 the core and Aff2 the cluster. Otherwise
    /// Aff0 is the core and Aff1 the cluster, as if the value had been shifted up one affinity
    /// level with a thread of 0. Affinity levels above the cluster must be zero.
    ///
    /// This doesn't check the fields against the topology; see [`Self::core_position`].
    pub fn affinity_fields(mpidr: MpidrEl1) -> Result<AffinityFields, TopologyError> {
        let unknown = TopologyError::UnknownAffinity {
            mpidr: mpidr.bits(),
        };
        if mpidr.aff3() != 0 {
            return Err(unknown);
        }
        if mpidr.contains(MpidrEl1::MT) {
            Ok(AffinityFields {
                cluster: mpidr.aff2().into(),
                core: mpidr.aff1().into(),
                thread: mpidr.aff0().into(),
            })
        } else if mpidr.aff2() == 0 {
            Ok(AffinityFields {
                cluster: mpidr.aff1().into(),
                core: mpidr.aff0().into(),
                thread: 0,
            })
        } else {
            Err(unknown)
        }
    }

    /// Given an MPIDR value, returns the corresponding linear core index.
    ///
    /// The index is `cluster * cores_per_cluster * threads_per_core + core * threads_per_core +
    /// thread`. Any MPIDR value with a field outside the topology is rejected rather than being
    /// clamped, so no two values ever map to the same index.
    pub fn core_position(&self, mpidr: MpidrEl1) -> Result<usize, TopologyError> {
        let fields = Self::affinity_fields(mpidr)?;
        if fields.cluster >= self.cluster_count
            || fields.core >= self.cores_per_cluster
            || fields.thread >= self.threads_per_core
        {
            return Err(TopologyError::UnknownAffinity {
                mpidr: mpidr.bits(),
            });
        }
        Ok((fields.cluster * self.cores_per_cluster + fields.core) * self.threads_per_core
            + fields.thread)
    }

    /// Given a linear core index, returns the corresponding PSCI MPIDR value.
    ///
    /// `multithreaded` selects the layout of the affinity fields, and should match the MT bit of
    /// the cores in the system. A system without the MT bit can only have one thread per core, so
    /// for such a system indices of other threads are rejected.
    ///
    /// This is the inverse of [`Self::core_position`], except that it never sets the MT or U bits.
    pub fn mpidr_for_core(&self, index: usize, multithreaded: bool) -> Result<u64, TopologyError> {
        let core_count = self.core_count();
        if index >= core_count {
            return Err(TopologyError::CoreIndexOutOfRange { index, core_count });
        }

        let thread = (index % self.threads_per_core) as u64;
        let core = ((index / self.threads_per_core) % self.cores_per_cluster) as u64;
        let cluster = (index / self.threads_per_core / self.cores_per_cluster) as u64;

        if multithreaded {
            Ok(thread << MpidrEl1::AFF0_SHIFT
                | core << MpidrEl1::AFF1_SHIFT
                | cluster << MpidrEl1::AFF2_SHIFT)
        } else if thread == 0 {
            Ok(core << MpidrEl1::AFF0_SHIFT | cluster << MpidrEl1::AFF1_SHIFT)
        } else {
            Err(TopologyError::CoreIndexOutOfRange { index, core_count })
        }
    }
}
