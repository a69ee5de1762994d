//! Nice QSnap output formatting.

use std::fmt;
use std::time::Duration;

use log;

const QSNAP_BANNER_LENGTH: usize = 67;

/// Logs a warning to the `qsnap-output` logger.
macro_rules! qsnap_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "qsnap-output", $fmt, $($($arg)*)?); }
}

/// Logs a main output line to the `qsnap-output` logger.
macro_rules! qsnap_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "qsnap-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {qsnap_output, qsnap_warn};

/// Writes a nicely formatted section title.
pub(crate) fn write_title(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let length = title.chars().count().max(QSNAP_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    writeln!(f, "┌──{bar}──┐")?;
    writeln!(f, "│§ {title:^length$} §│")?;
    writeln!(f, "└──{bar}──┘")?;
    Ok(())
}

/// Logs a nicely formatted section title to the `qsnap-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(QSNAP_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    qsnap_output!("┌──{bar}──┐");
    qsnap_output!("│§ {title:^length$} §│");
    qsnap_output!("└──{bar}──┘");
}

/// Writes a nicely formatted subtitle.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    let length = subtitle.chars().count();
    let bar = "═".repeat(length);
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{bar}")?;
    Ok(())
}

/// Logs a nicely formatted subtitle to the `qsnap-output` logger.
pub(crate) fn log_subtitle(subtitle: &str) {
    let length = subtitle.chars().count();
    let bar = "═".repeat(length);
    qsnap_output!("{}", subtitle);
    qsnap_output!("{}", bar);
}

/// Turns a boolean into a string of `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// Formats a duration accumulated over `nsteps` steps as milliseconds per step.
pub(crate) fn ms_per_step(duration: Duration, nsteps: usize) -> f64 {
    1000.0 * duration.as_secs_f64() / nsteps.max(1) as f64
}

/// A trait for logging `QSnap` outputs nicely.
pub(crate) trait QSnapOutput: fmt::Display {
    /// Logs display output nicely.
    fn log_output_display(&self) {
        let lines = self.to_string();
        lines.lines().for_each(|line| {
            qsnap_output!("{line}");
        })
    }
}

// Blanket implementation
impl<T> QSnapOutput for T where T: fmt::Display {}
