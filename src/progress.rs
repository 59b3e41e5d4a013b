//! Progress bars for long-running phases

use ecpflasher_core::flash::{Phase, Progress};
use indicatif::{ProgressBar, ProgressStyle};

/// Draws one indicatif bar per phase on stderr
#[derive(Default)]
pub struct BarProgress {
    bar: Option<(Phase, ProgressBar)>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for BarProgress {
    fn start(&mut self, phase: Phase, total: usize) {
        self.finish();
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{msg:9} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(phase.label());
        self.bar = Some((phase, pb));
    }

    fn advance(&mut self, done: usize) {
        if let Some((_, pb)) = &self.bar {
            pb.set_position(done as u64);
        }
    }

    fn finish(&mut self) {
        if let Some((phase, pb)) = self.bar.take() {
            pb.finish_with_message(format!("{} done", phase.label()));
        }
    }
}
