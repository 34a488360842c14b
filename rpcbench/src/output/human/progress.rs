use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Single progress bar tracking the run against its configured duration.
pub(crate) struct HumanProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub(crate) fn set_total(&self, total: Duration) {
        let pb = ProgressBar::with_draw_target(
            Some(duration_ms(total)),
            ProgressDrawTarget::stderr_with_hz(5),
        );
        pb.set_style(bar_style());
        pb.set_prefix("run");

        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(old) = bar.replace(pb) {
            old.finish_and_clear();
        }
    }

    pub(crate) fn update(&self, elapsed: Duration, message: String) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(pb) = bar.as_ref() else {
            return;
        };

        let total = pb.length().unwrap_or(0);
        pb.set_position(duration_ms(elapsed).min(total));
        pb.set_message(message);
    }

    pub(crate) fn finish(&self) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(pb) = bar {
            pb.finish_and_clear();
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
