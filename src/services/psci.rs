// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Calls to the Power State Coordination Interface.
//!
//! These check the status word of each result, which the transport itself never does, and turn
//! negative PSCI return codes into [`Error`]s.

use crate::smc::{Conduit, FunctionId, SmcArgs, SmcResult};
use arm_psci::FunctionId as PsciFunction;
use smccc::{
    error::positive_or_error_32,
    psci::{AffinityState, Error, LowestAffinityLevel, Version},
};

const VERSION_MAJOR_SHIFT: u32 = 16;

/// Makes a PSCI call with the given operands and checks its status word.
fn call(conduit: &impl Conduit, function: PsciFunction, operands: &[u64]) -> Result<u32, Error> {
    check(conduit.call(&SmcArgs::with_args(function.into(), operands)))
}

/// Checks the status word of a PSCI result, returning it if it is not an error.
fn check(result: SmcResult) -> Result<u32, Error> {
    positive_or_error_32(result.status() as u32)
}

/// Returns the version of PSCI implemented by the firmware.
pub fn version(conduit: &impl Conduit) -> Result<Version, Error> {
    let version = call(conduit, PsciFunction::PsciVersion, &[])?;
    Ok(Version {
        major: (version >> VERSION_MAJOR_SHIFT) as u16,
        minor: version as u16,
    })
}

/// Queries whether the given PSCI function is implemented.
///
/// On success returns the feature flags for the function, which are 0 for most functions.
pub fn features(conduit: &impl Conduit, function: FunctionId) -> Result<u32, Error> {
    call(conduit, PsciFunction::PsciFeatures, &[function.0.into()])
}

/// Powers up the core with the given MPIDR, to start executing at `entry_point` with
/// `context_id` in X0.
pub fn cpu_on(
    conduit: &impl Conduit,
    target_mpidr: u64,
    entry_point: u64,
    context_id: u64,
) -> Result<(), Error> {
    call(
        conduit,
        PsciFunction::CpuOn64,
        &[target_mpidr, entry_point, context_id],
    )?;
    Ok(())
}

/// Powers down the calling core.
///
/// This only returns if the call failed.
pub fn cpu_off(conduit: &impl Conduit) -> Error {
    failure(call(conduit, PsciFunction::CpuOff, &[]))
}

/// Returns the power state of the affinity instance with the given MPIDR.
///
/// `lowest_affinity_level` says which affinity fields of `target_affinity` are valid.
pub fn affinity_info(
    conduit: &impl Conduit,
    target_affinity: u64,
    lowest_affinity_level: LowestAffinityLevel,
) -> Result<AffinityState, Error> {
    match call(
        conduit,
        PsciFunction::AffinityInfo64,
        &[target_affinity, lowest_affinity_level as u64],
    )? {
        0 => Ok(AffinityState::On),
        1 => Ok(AffinityState::Off),
        2 => Ok(AffinityState::OnPending),
        state => Err(Error::from(state as i32)),
    }
}

/// Shuts down the system.
///
/// This only returns if the call failed.
pub fn system_off(conduit: &impl Conduit) -> Error {
    failure(call(conduit, PsciFunction::SystemOff, &[]))
}

/// Resets the system.
///
/// This only returns if the call failed.
pub fn system_reset(conduit: &impl Conduit) -> Error {
    failure(call(conduit, PsciFunction::SystemReset, &[]))
}

/// Enables or disables memory protection, returning whether it was previously enabled.
pub fn mem_protect(conduit: &impl Conduit, enable: bool) -> Result<bool, Error> {
    Ok(call(conduit, PsciFunction::MemProtect, &[enable.into()])? != 0)
}

/// Checks whether the given physical address range is protected by `MEM_PROTECT`.
///
/// Returns `Ok(())` if it is, or `Error::Denied` if any part of it isn't.
pub fn mem_protect_check_range(
    conduit: &impl Conduit,
    base: u64,
    length: u64,
) -> Result<(), Error> {
    call(conduit, PsciFunction::MemProtectCheckRange64, &[base, length])?;
    Ok(())
}

/// Converts the result of a call which should never return into an error.
fn failure(result: Result<u32, Error>) -> Error {
    match result {
        Ok(status) => Error::from(status as i32),
        Err(e) => e,
    }
}
