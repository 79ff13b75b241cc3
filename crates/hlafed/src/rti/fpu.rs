// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Floating-point control word guard for RTI calls.
//!
//! Some RTI implementations change the x87 precision or rounding mode and
//! never restore it. [`FpuGuard`] saves the control word on creation and
//! writes it back when dropped. On targets without an x87 unit the guard is
//! a no-op.

/// Saves the x87 control word and restores it on drop.
#[derive(Debug)]
pub struct FpuGuard {
    saved: u16,
    validate: bool,
    call: &'static str,
}

impl FpuGuard {
    /// Save the current control word. With `validate`, a change observed
    /// at drop time is logged before the word is restored.
    pub fn new(call: &'static str, validate: bool) -> Self {
        Self {
            saved: read_control_word(),
            validate: validate || cfg!(feature = "fpu-validate"),
            call,
        }
    }

    /// Control word captured at creation.
    pub fn saved(&self) -> u16 {
        self.saved
    }
}

impl Drop for FpuGuard {
    fn drop(&mut self) {
        if self.validate {
            let current = read_control_word();
            if current != self.saved {
                log::warn!(
                    "[fpu] {} changed control word {:#06x} -> {:#06x}, restoring",
                    self.call,
                    self.saved,
                    current
                );
            }
        }
        write_control_word(self.saved);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn read_control_word() -> u16 {
    let mut word: u16 = 0;
    // SAFETY: fnstcw stores two bytes into the provided local.
    unsafe {
        core::arch::asm!("fnstcw [{}]", in(reg) &mut word, options(nostack, preserves_flags));
    }
    word
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn write_control_word(word: u16) {
    // SAFETY: fldcw loads a control word previously read by fnstcw.
    unsafe {
        core::arch::asm!("fldcw [{}]", in(reg) &word, options(nostack, preserves_flags));
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn read_control_word() -> u16 {
    0
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn write_control_word(_word: u16) {}
