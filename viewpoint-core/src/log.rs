//! Minimal diagnostic logger. Grounded on `fyrox-core::log::Log`: a global
//! `Mutex`-guarded sink with three severities, gated by a verbosity
//! threshold. Unlike the engine's logger this never touches the filesystem —
//! a library has no application working directory to write into — it only
//! ever writes to stdout/stderr.

use parking_lot::Mutex;
use std::fmt::Display;

lazy_static::lazy_static! {
    static ref LOG: Mutex<Log> = Mutex::new(Log {
        verbosity: MessageKind::Information,
    });
}

/// Severity of a logged message.
#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Debug)]
#[repr(u32)]
pub enum MessageKind {
    Information = 0,
    Warning = 1,
    Error = 2,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

struct Log {
    verbosity: MessageKind,
}

impl Log {
    fn write(&self, kind: MessageKind, msg: &str) {
        if kind < self.verbosity {
            return;
        }
        if kind == MessageKind::Error {
            eprintln!("{}{msg}", kind.prefix());
        } else {
            println!("{}{msg}", kind.prefix());
        }
    }
}

/// Writes an informational message.
pub fn info<S: Display>(msg: S) {
    LOG.lock().write(MessageKind::Information, &msg.to_string());
}

/// Writes a warning message.
pub fn warn<S: Display>(msg: S) {
    LOG.lock().write(MessageKind::Warning, &msg.to_string());
}

/// Writes an error message.
pub fn err<S: Display>(msg: S) {
    LOG.lock().write(MessageKind::Error, &msg.to_string());
}

/// Sets the minimum severity that gets written; messages below it are
/// silently dropped. Useful for quieting the solver's diagnostics in tests.
pub fn set_verbosity(kind: MessageKind) {
    LOG.lock().verbosity = kind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_gate_does_not_panic() {
        set_verbosity(MessageKind::Error);
        info("swallowed");
        warn("swallowed");
        err("shown");
        set_verbosity(MessageKind::Information);
    }
}
