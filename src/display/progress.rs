//! Progress bars for long-running phases
//!
//! Bars are drawn on stderr. A hidden reporter accepts every call and draws
//! nothing, so library code never has to branch on `--quiet`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "  {msg:<14} [{bar:40.cyan/blue}] {percent:>3}% {pos}/{len} | {elapsed_precise} elapsed";
const BYTES_TEMPLATE: &str =
    "  {msg:<14} [{bar:40.cyan/blue}] {percent:>3}% {bytes}/{total_bytes} | {elapsed_precise} elapsed";

/// Factory for per-phase progress bars
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    enabled: bool,
}

impl ProgressReporter {
    /// A reporter that draws bars on stderr
    pub fn visible() -> Self {
        Self { enabled: true }
    }

    /// A reporter that draws nothing
    pub fn hidden() -> Self {
        Self { enabled: false }
    }

    /// Bar counting snapshot pages
    pub fn pages(&self, message: &'static str) -> PhaseProgress {
        self.bar(message, BAR_TEMPLATE, 0)
    }

    /// Bar counting bytes, with a known total
    pub fn bytes(&self, message: &'static str, total: u64) -> PhaseProgress {
        self.bar(message, BYTES_TEMPLATE, total)
    }

    fn bar(&self, message: &'static str, template: &str, total: u64) -> PhaseProgress {
        if !self.enabled {
            return PhaseProgress {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("█▓▒░ "));
        }
        bar.set_message(message);
        PhaseProgress { bar }
    }
}

/// Progress of one phase (snapshot, compress, restore)
#[derive(Debug)]
pub struct PhaseProgress {
    bar: ProgressBar,
}

impl PhaseProgress {
    /// Set absolute position and total
    pub fn update(&self, done: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(done);
    }

    /// Advance by `delta`
    pub fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish and leave the bar on screen
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Remove the bar without finishing it (used on failure)
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
