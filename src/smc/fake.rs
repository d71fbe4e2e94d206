// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! A fake higher exception level handler, for unit tests of code which makes SMC calls.

use super::{Conduit, FunctionId, NOT_SUPPORTED, SUCCESS, SmcArgs, SmcResult};
use crate::{
    platform::{Platform, test::TestPlatform},
    regions::MemRegion,
    services::arch,
    spinlock::SpinLocked,
};
use arm_psci::{ErrorCode, FunctionId as PsciFunction, Version};
use arm_sysregs::MpidrEl1;
use core::sync::atomic::{AtomicUsize, Ordering};

const FAST_CALL: u32 = 0x8000_0000;
const OEN_SHIFT: u32 = 24;
const OEN_MASK: u32 = 0x3f;
const SVE_HINT: u32 = 1 << 16;
const RESERVED_BITS: u32 = 0x7f << 17;

const OEN_ARM_ARCHITECTURE: u32 = 0;
const OEN_OEM: u32 = 3;
const OEN_STANDARD_SECURE: u32 = 4;

/// Returns the first three operands after a success status.
const ECHO: u16 = 1;

const CORE_COUNT: usize = TestPlatform::CORE_COUNT;

/// A service which handles some range of function IDs.
trait Service {
    /// Returns whether this service is intended to handle the given function ID.
    fn owns(&self, function: FunctionId) -> bool;

    /// Handles a call to a function which the service owns.
    fn handle(&self, args: &SmcArgs) -> SmcResult;
}

/// Returns the Owning Entity Number of a fast call, or `None` for a yielding call.
fn fast_call_oen(function: FunctionId) -> Option<u32> {
    (function.0 & FAST_CALL != 0).then_some((function.0 >> OEN_SHIFT) & OEN_MASK)
}

fn error(code: ErrorCode) -> SmcResult {
    i32::from(code).into()
}

/// Stands in for the firmware at EL3, handling a few Arm Architecture and PSCI calls for the test
/// platform.
///
/// Every call is recorded, so tests can check exactly what was passed and how many times.
pub struct FakeMonitor {
    calls: AtomicUsize,
    last_call: SpinLocked<Option<SmcArgs>>,
    arch: Arch,
    psci: Psci,
    oem: Oem,
}

impl FakeMonitor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_call: SpinLocked::new(None),
            arch: Arch,
            psci: Psci::new(),
            oem: Oem,
        }
    }

    /// Returns the number of calls handled so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the arguments of the most recent call, if any.
    pub fn last_call(&self) -> Option<SmcArgs> {
        *self.last_call.lock()
    }

    fn dispatch(&self, args: &SmcArgs) -> SmcResult {
        // Bits 17-23 of a fast call are reserved and must be zero.
        if fast_call_oen(args.function).is_some() && args.function.0 & RESERVED_BITS != 0 {
            return SmcResult::NOT_SUPPORTED;
        }
        let function = FunctionId(args.function.0 & !SVE_HINT);

        let services: [&dyn Service; 3] = [&self.arch, &self.psci, &self.oem];
        match services.iter().find(|service| service.owns(function)) {
            Some(service) => service.handle(&SmcArgs {
                function,
                args: args.args,
            }),
            None => SmcResult::NOT_SUPPORTED,
        }
    }
}

impl Conduit for FakeMonitor {
    fn call(&self, args: &SmcArgs) -> SmcResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock() = Some(*args);
        self.dispatch(args)
    }
}

struct Arch;

impl Service for Arch {
    fn owns(&self, function: FunctionId) -> bool {
        fast_call_oen(function) == Some(OEN_ARM_ARCHITECTURE)
    }

    fn handle(&self, args: &SmcArgs) -> SmcResult {
        match args.function {
            arch::SMCCC_VERSION => SmcResult::from(0x0001_0005_u64),
            arch::SMCCC_ARCH_FEATURES => match FunctionId(args.args[0] as u32) {
                arch::SMCCC_VERSION
                | arch::SMCCC_ARCH_FEATURES
                | arch::SMCCC_ARCH_SOC_ID_32
                | arch::SMCCC_ARCH_SOC_ID_64 => SUCCESS.into(),
                _ => NOT_SUPPORTED.into(),
            },
            _ => SmcResult::NOT_SUPPORTED,
        }
    }
}

struct PsciState {
    cores_on: [bool; CORE_COUNT],
    mem_protect: bool,
}

struct Psci {
    state: SpinLocked<PsciState>,
}

impl Psci {
    fn new() -> Self {
        let mut cores_on = [false; CORE_COUNT];
        // The primary core is running the test.
        cores_on[0] = true;
        Self {
            state: SpinLocked::new(PsciState {
                cores_on,
                mem_protect: false,
            }),
        }
    }

    fn core_index(mpidr: u64) -> Result<usize, ErrorCode> {
        TestPlatform::core_position(MpidrEl1::from_bits_retain(mpidr))
            .map_err(|_| ErrorCode::InvalidParameters)
    }

    fn cpu_on(&self, target: u64, entry_point: u64) -> Result<(), ErrorCode> {
        let index = Self::core_index(target)?;
        if entry_point == 0 {
            return Err(ErrorCode::InvalidAddress);
        }
        let mut state = self.state.lock();
        if state.cores_on[index] {
            return Err(ErrorCode::AlreadyOn);
        }
        state.cores_on[index] = true;
        Ok(())
    }

    fn affinity_info(&self, target: u64) -> Result<u64, ErrorCode> {
        let index = Self::core_index(target)?;
        Ok(if self.state.lock().cores_on[index] { 0 } else { 1 })
    }

    fn mem_protect(&self, enable: bool) -> u64 {
        let mut state = self.state.lock();
        let previous = state.mem_protect;
        state.mem_protect = enable;
        previous.into()
    }

    fn mem_protect_check_range(&self, base: u64, length: u64) -> Result<(), ErrorCode> {
        let range = MemRegion::new(base as usize, length as usize);
        if self.state.lock().mem_protect
            && TestPlatform::PROTECTED_REGIONS
                .iter()
                .any(|region| range.is_within(region))
        {
            Ok(())
        } else {
            Err(ErrorCode::Denied)
        }
    }

    fn features(function: u64) -> Result<(), ErrorCode> {
        let function = u32::try_from(function).map_err(|_| ErrorCode::NotSupported)?;
        match PsciFunction::try_from(function) {
            Ok(
                PsciFunction::PsciVersion
                | PsciFunction::PsciFeatures
                | PsciFunction::CpuOn64
                | PsciFunction::CpuOff
                | PsciFunction::AffinityInfo64
                | PsciFunction::MemProtect
                | PsciFunction::MemProtectCheckRange64,
            ) => Ok(()),
            _ => Err(ErrorCode::NotSupported),
        }
    }
}

impl Service for Psci {
    fn owns(&self, function: FunctionId) -> bool {
        fast_call_oen(function) == Some(OEN_STANDARD_SECURE) && function.0 & 0xffff <= 0x1f
    }

    fn handle(&self, args: &SmcArgs) -> SmcResult {
        let [arg1, arg2, ..] = args.args;
        let Ok(function) = PsciFunction::try_from(args.function.0) else {
            return error(ErrorCode::NotSupported);
        };
        let result = match function {
            PsciFunction::PsciVersion => {
                return u64::from(u32::from(Version { major: 1, minor: 3 })).into();
            }
            PsciFunction::PsciFeatures => Self::features(arg1).map(|()| 0),
            PsciFunction::CpuOn64 => self.cpu_on(arg1, arg2).map(|()| 0),
            // The test is running on the only core which is on.
            PsciFunction::CpuOff => Err(ErrorCode::Denied),
            PsciFunction::AffinityInfo64 => self.affinity_info(arg1),
            PsciFunction::MemProtect => Ok(self.mem_protect(arg1 != 0)),
            PsciFunction::MemProtectCheckRange64 => {
                self.mem_protect_check_range(arg1, arg2).map(|()| 0)
            }
            _ => Err(ErrorCode::NotSupported),
        };
        match result {
            Ok(value) => value.into(),
            Err(code) => error(code),
        }
    }
}

/// A vendor-specific echo service.
struct Oem;

impl Service for Oem {
    fn owns(&self, function: FunctionId) -> bool {
        fast_call_oen(function) == Some(OEN_OEM)
    }

    fn handle(&self, args: &SmcArgs) -> SmcResult {
        if args.function.0 as u16 == ECHO {
            [SUCCESS as u64, args.args[0], args.args[1], args.args[2]].into()
        } else {
            SmcResult::NOT_SUPPORTED
        }
    }
}
