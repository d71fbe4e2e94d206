// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Transport for synchronous calls to a higher exception level, using SMC or HVC.
//!
//! A call is marshalled into registers following the SMC Calling Convention (the function ID in
//! W0 and up to seven operands in X1-X7), the calling core traps to the handler at the higher
//! exception level, and when the handler returns X0-X3 are copied back into an [`SmcResult`].
//!
//! The transport never interprets the result. In particular, a function ID which the handler
//! doesn't know comes back as an ordinary result whose status word is
//! [`NOT_SUPPORTED`]; it is up to whoever made the call to check.
//! Each call traps exactly once, and there is no retry.
//!
//! There is no shared state in the transport, so different cores may make calls at the same time.
//! A call must not be made from within another call in flight on the same core, such as from an
//! exception handler which interrupted it.

#[cfg(test)]
pub(crate) mod fake;

use core::fmt::{self, Debug, Display, Formatter};
#[cfg(target_arch = "aarch64")]
use smccc::{Call, Hvc, Smc};

/// The call completed successfully.
pub const SUCCESS: i32 = 0;

/// The call is not supported by the implementation.
pub const NOT_SUPPORTED: i32 = -1;

/// An SMCCC function ID.
///
/// This goes in W0 of a call; the upper 32 bits of X0 are always zero.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct FunctionId(pub u32);

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "FunctionId({:#010x})", self.0)
    }
}

impl From<u32> for FunctionId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<FunctionId> for u32 {
    fn from(function: FunctionId) -> Self {
        function.0
    }
}

impl From<arm_psci::FunctionId> for FunctionId {
    fn from(function: arm_psci::FunctionId) -> Self {
        Self(function.into())
    }
}

/// The arguments for an SMC or HVC call: a function ID and a fixed number of operand words.
///
/// Unused operands are zero.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SmcArgs {
    /// The function being called.
    pub function: FunctionId,
    /// The operands, passed in X1-X7.
    pub args: [u64; SmcArgs::MAX_ARGS],
}

impl SmcArgs {
    /// The maximum number of operands which can be passed, not counting the function ID.
    pub const MAX_ARGS: usize = 7;

    /// Creates arguments for a call to the given function with all operands zero.
    pub const fn new(function: FunctionId) -> Self {
        Self {
            function,
            args: [0; Self::MAX_ARGS],
        }
    }

    /// Creates arguments for a call to the given function with the given leading operands.
    ///
    /// Panics if more than [`MAX_ARGS`](Self::MAX_ARGS) operands are given.
    pub fn with_args(function: FunctionId, operands: &[u64]) -> Self {
        assert!(
            operands.len() <= Self::MAX_ARGS,
            "{} operands given for {function}, at most {} are allowed",
            operands.len(),
            Self::MAX_ARGS
        );
        let mut args = [0; Self::MAX_ARGS];
        args[..operands.len()].copy_from_slice(operands);
        Self { function, args }
    }

    /// Returns a copy with operand `index` (0 for X1) set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [`MAX_ARGS`](Self::MAX_ARGS).
    pub const fn arg(mut self, index: usize, value: u64) -> Self {
        assert!(index < Self::MAX_ARGS, "SMC operand index out of range");
        self.args[index] = value;
        self
    }

    /// Returns the values of X0-X7 for the call.
    pub fn registers(&self) -> [u64; Self::MAX_ARGS + 1] {
        let mut registers = [0; Self::MAX_ARGS + 1];
        registers[0] = self.function.0.into();
        registers[1..].copy_from_slice(&self.args);
        registers
    }
}

impl Debug for SmcArgs {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SmcArgs({}", self.function)?;
        for arg in &self.args {
            write!(f, ", {arg:#x}")?;
        }
        write!(f, ")")
    }
}

/// The values returned from an SMC or HVC call in X0-X3.
///
/// By convention the first word is a status code, or the function's single return value, and the
/// rest are payload.
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct SmcResult {
    values: [u64; SmcResult::WORDS],
}

impl SmcResult {
    /// The number of result words returned by a call.
    pub const WORDS: usize = 4;

    /// A result as returned for an unknown function ID.
    pub const NOT_SUPPORTED: Self = Self {
        values: [NOT_SUPPORTED as u64, 0, 0, 0],
    };

    /// Returns all the result words.
    pub fn values(&self) -> &[u64; Self::WORDS] {
        &self.values
    }

    /// Returns the first result word, from X0.
    pub fn status(&self) -> u64 {
        self.values[0]
    }

    /// Returns the status word as a signed 32-bit value, which is how SMCCC status codes are
    /// encoded.
    pub fn status_i32(&self) -> i32 {
        self.values[0] as i32
    }

    /// Returns the payload words after the status, from X1-X3.
    pub fn payload(&self) -> &[u64] {
        &self.values[1..]
    }

    /// Returns whether the status word is `NOT_SUPPORTED`.
    pub fn is_not_supported(&self) -> bool {
        self.status_i32() == NOT_SUPPORTED
    }
}

impl From<[u64; SmcResult::WORDS]> for SmcResult {
    fn from(values: [u64; SmcResult::WORDS]) -> Self {
        Self { values }
    }
}

impl From<u64> for SmcResult {
    fn from(value: u64) -> Self {
        Self {
            values: [value, 0, 0, 0],
        }
    }
}

impl From<i32> for SmcResult {
    fn from(value: i32) -> Self {
        Self::from(value as u64)
    }
}

impl Debug for SmcResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "SmcResult([{:#x}, {:#x}, {:#x}, {:#x}])",
            self.values[0], self.values[1], self.values[2], self.values[3]
        )
    }
}

/// A way of calling into a higher exception level.
///
/// Implementations must pass the arguments and results unchanged, trap exactly once per call, and
/// must not keep any reference to the arguments after returning.
pub trait Conduit {
    /// Makes the given call and waits for it to return.
    fn call(&self, args: &SmcArgs) -> SmcResult;
}

impl<C: Conduit + ?Sized> Conduit for &C {
    fn call(&self, args: &SmcArgs) -> SmcResult {
        (**self).call(args)
    }
}

/// Calls to EL3 using the `smc` instruction.
#[cfg(target_arch = "aarch64")]
impl Conduit for Smc {
    fn call(&self, args: &SmcArgs) -> SmcResult {
        call_with::<Smc>(args)
    }
}

/// Calls to EL2 using the `hvc` instruction.
#[cfg(target_arch = "aarch64")]
impl Conduit for Hvc {
    fn call(&self, args: &SmcArgs) -> SmcResult {
        call_with::<Hvc>(args)
    }
}

/// Makes an SMC64 call with the given conduit, keeping only X0-X3 of the result.
#[cfg(target_arch = "aarch64")]
fn call_with<C: Call>(args: &SmcArgs) -> SmcResult {
    let mut operands = [0; 17];
    operands[..SmcArgs::MAX_ARGS].copy_from_slice(&args.args);
    let returned = C::call64(args.function.0, operands);
    let mut values = [0; SmcResult::WORDS];
    values.copy_from_slice(&returned[..SmcResult::WORDS]);
    SmcResult { values }
}
