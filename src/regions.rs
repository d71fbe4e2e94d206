// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The catalog of memory regions which the platform asks to be protected.
//!
//! Each platform compiles in its own table as [`Platform::PROTECTED_REGIONS`], and the table is
//! checked against the platform's DRAM banks at build time.

use crate::platform::{Platform, PlatformImpl};
use core::fmt::{self, Debug, Formatter};

/// A range of physical memory, described by its base address and size in bytes.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct MemRegion {
    /// The first address in the region.
    pub base: usize,
    /// The size of the region in bytes.
    pub size: usize,
}

impl MemRegion {
    /// Creates a new region starting at `base` and covering `size` bytes.
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Returns the last address in the region, or `None` if the region is empty or wraps around
    /// the end of the address space.
    pub const fn last(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            self.base.checked_add(self.size - 1)
        }
    }

    /// Returns whether the region covers no memory.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns whether the given address lies within the region.
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address - self.base < self.size
    }

    /// Returns whether any address lies in both this region and `other`.
    pub const fn overlaps(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            false
        } else if self.base <= other.base {
            other.base - self.base < self.size
        } else {
            self.base - other.base < other.size
        }
    }

    /// Returns whether this region lies entirely within `other`.
    pub const fn is_within(&self, other: &Self) -> bool {
        if self.base < other.base {
            return false;
        }
        let offset = self.base - other.base;
        offset <= other.size && self.size <= other.size - offset
    }
}

impl Debug for MemRegion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.last() {
            Some(last) => write!(f, "{:#014x}..={:#014x}", self.base, last),
            None => write!(f, "{:#014x} (size {:#x})", self.base, self.size),
        }
    }
}

/// Returns the linked platform's protected regions.
///
/// The slice is a static table specific to the platform the image was built for; its length is
/// the number of regions, and it may be empty.
pub fn protected_regions() -> &'static [MemRegion] {
    PlatformImpl::PROTECTED_REGIONS
}

/// Returns whether a table of protected regions is well-formed for the given DRAM banks.
///
/// A table is valid if every region is non-empty and doesn't wrap around the address space, no
/// two regions overlap, and each region lies entirely within a single DRAM bank.
pub const fn catalog_is_valid(regions: &[MemRegion], dram: &[MemRegion]) -> bool {
    let mut bank = 0;
    while bank < dram.len() {
        if !dram[bank].is_empty() && dram[bank].last().is_none() {
            return false;
        }
        bank += 1;
    }

    let mut i = 0;
    while i < regions.len() {
        let region = &regions[i];
        if region.last().is_none() {
            return false;
        }

        let mut in_dram = false;
        let mut bank = 0;
        while bank < dram.len() {
            if region.is_within(&dram[bank]) {
                in_dram = true;
            }
            bank += 1;
        }
        if !in_dram {
            return false;
        }
        i += 1;
    }

    let mut i = 0;
    while i < regions.len() {
        let mut j = i + 1;
        while j < regions.len() {
            if regions[i].overlaps(&regions[j]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}
