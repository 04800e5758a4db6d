use chaosmag::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

/// Bar and bookkeeping of the phase currently shown.
struct PhaseView {
    bar: ProgressBar,
    phase: &'static str,
    started: Instant,
}

impl PhaseView {
    fn start_phase(&mut self, name: &'static str) {
        self.phase = name;
        self.started = Instant::now();
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("");
        self.bar.set_message(name);
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    }

    fn finish_phase(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        debug!(phase = self.phase, elapsed, "Phase finished.");
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(format!("{} ({:.1}s)", self.phase, elapsed));
    }

    /// Switches from the phase spinner to a bar over `steps` items (sources
    /// to evaluate, frame batches or matrix elements to transform).
    fn start_task(&mut self, steps: u64) {
        self.bar.disable_steady_tick();
        self.bar.reset();
        self.bar.set_style(bar_style());
        self.bar.set_prefix(self.phase);
        self.bar.set_message("");
        self.bar.set_length(steps);
    }

    fn finish_task(&mut self) {
        if let Some(length) = self.bar.length() {
            self.bar.set_position(length);
        }
        self.bar.finish();
    }

    fn note(&self, text: String) {
        if self.bar.is_finished() {
            self.bar.set_message(text);
        } else {
            self.bar.println(format!("  {}", text));
        }
    }
}

/// Renders workflow progress events (model loading, source evaluation,
/// spectrum sampling and transforms) on stderr.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<PhaseView>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        bar.finish_and_clear();
        Self {
            display: Arc::new(Mutex::new(PhaseView {
                bar,
                phase: "",
                started: Instant::now(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();
        Box::new(move |event: Progress| {
            let Ok(mut display) = display.lock() else {
                warn!("Progress display lock is poisoned; dropping event.");
                return;
            };
            match event {
                Progress::PhaseStart { name } => display.start_phase(name),
                Progress::PhaseFinish => display.finish_phase(),
                Progress::TaskStart { total_steps } => display.start_task(total_steps),
                Progress::TaskIncrement => display.bar.inc(1),
                Progress::TaskFinish => display.finish_task(),
                Progress::Message(text) => display.note(text),
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<28} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}
