// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Calls to the standard Arm Architecture SMCCC functions.

use crate::smc::{Conduit, FunctionId, SmcArgs};
use smccc::{
    arch::{Error, Version},
    error::positive_or_error_32,
};

/// Returns the version of the SMC Calling Convention implemented.
pub const SMCCC_VERSION: FunctionId = FunctionId(0x8000_0000);
/// Queries whether an Arm Architecture function is implemented.
pub const SMCCC_ARCH_FEATURES: FunctionId = FunctionId(0x8000_0001);
/// Returns the SoC ID, with SMC32 results.
pub const SMCCC_ARCH_SOC_ID_32: FunctionId = FunctionId(0x8000_0002);
/// Returns the SoC ID, with SMC64 results.
pub const SMCCC_ARCH_SOC_ID_64: FunctionId = FunctionId(0xc000_0002);

const VERSION_MAJOR_SHIFT: u32 = 16;
const VERSION_MAJOR_MASK: u32 = 0x7fff;

/// Returns the version of the SMC Calling Convention which the firmware implements.
///
/// SMCCC 1.0 firmware doesn't implement this call, and returns `NotSupported`.
pub fn version(conduit: &impl Conduit) -> Result<Version, Error> {
    let version =
        positive_or_error_32::<Error>(conduit.call(&SmcArgs::new(SMCCC_VERSION)).status() as u32)?;
    Ok(Version {
        major: ((version >> VERSION_MAJOR_SHIFT) & VERSION_MAJOR_MASK) as u16,
        minor: version as u16,
    })
}

/// Queries whether the given Arm Architecture function is implemented.
///
/// On success returns the function-specific non-negative value, e.g. 0 if supported and no
/// further information is provided.
pub fn features(conduit: &impl Conduit, function: FunctionId) -> Result<u32, Error> {
    let result = conduit.call(&SmcArgs::new(SMCCC_ARCH_FEATURES).arg(0, function.0.into()));
    positive_or_error_32(result.status() as u32)
}
