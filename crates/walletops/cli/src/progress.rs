//! Terminal progress: one spinner line per account.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use walletops_ops::ProgressReporter;

pub struct SpinnerReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Reporter that tracks state but draws nothing.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar(&self, label: &str) -> Option<ProgressBar> {
        let mut bars = self.bars.lock().ok()?;
        let bar = bars.entry(label.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {prefix:.bold} {msg}") {
                bar.set_style(style);
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        Some(bar.clone())
    }

    /// Accounts that have reported at least once.
    pub fn tracked(&self) -> usize {
        self.bars.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Stop every spinner still running.
    pub fn clear(&self) {
        if let Ok(bars) = self.bars.lock() {
            for bar in bars.values().filter(|b| !b.is_finished()) {
                bar.abandon();
            }
        }
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, label: &str, message: &str) {
        if let Some(bar) = self.bar(label) {
            bar.set_message(message.to_string());
        }
    }

    fn finish(&self, label: &str, success: bool, message: &str) {
        if let Some(bar) = self.bar(label) {
            let mark = if success { "✓".green() } else { "✗".red() };
            bar.finish_with_message(format!("{} {}", mark, message));
        }
    }
}
