// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::{atomic::AtomicBool, atomic::Ordering};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::warn!(target: concat!("pulses.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::warn!(target: concat!("pulses.rust::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at info level if diagnostics logging is enabled.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if $crate::is_diagnostics_enabled() {
             $crate::_log::info!(target: concat!("pulses.rust::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if $crate::is_diagnostics_enabled() {
            $crate::_log::info!(target: concat!("pulses.rust::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Initialize the logging.
///
/// Meant to be called once by the embedding application. No concrete logger
/// is installed here: records go to whatever `log` implementation the
/// application registered. The call only toggles the diagnostics flag, which
/// gates the extra scheduling statistics emitted through [`diagnostic!`].
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}
