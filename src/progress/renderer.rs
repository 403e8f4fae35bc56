use std::collections::HashMap;
use std::time::Duration;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use super::events::AssessmentEvent;

/// One spinner per host on stderr while assessments run.
pub struct AssessmentProgress {
    multi: MultiProgress,
    host_bars: HashMap<String, ProgressBar>,
}

impl AssessmentProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
            host_bars: HashMap::new(),
        }
    }

    /// A renderer that draws nothing, for `-q`.
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            host_bars: HashMap::new(),
        }
    }

    fn bar(&mut self, host: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.host_bars.entry(host.to_string()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new_spinner());
            if let Ok(template) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {prefix:.bold} {msg}") {
                bar.set_style(template);
            }
            bar.set_prefix(host.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        })
    }

    pub fn handle_event(&mut self, event: &AssessmentEvent) {
        match event {
            AssessmentEvent::Started { host, mode } => {
                self.bar(host).set_message(format!("starting ({})", mode));
            }
            AssessmentEvent::CacheHit { host } => {
                if let Some(bar) = self.host_bars.remove(host) {
                    bar.finish_with_message(format!("{} cached report", style("✓").green()));
                } else {
                    self.println(&format!("  {} {} cached report", style("✓").green(), host));
                }
            }
            AssessmentEvent::HostStatusChanged { host, status } => {
                self.bar(host).set_message(status.to_string());
            }
            AssessmentEvent::EndpointProgress { host, ip_address, status, progress } => {
                let pct = progress.filter(|p| *p >= 0).unwrap_or(0);
                self.bar(host).set_message(format!("{} {}% {}", ip_address, pct, status));
            }
            AssessmentEvent::Backoff { host, delay_ms, reason } => {
                self.println(&format!(
                    "  {} {}: waiting {} ({})",
                    style("⚠").yellow(), host, format_elapsed(*delay_ms), reason
                ));
            }
            AssessmentEvent::DetailFetched { host, ip_address } => {
                self.bar(host).set_message(format!("detail {}", ip_address));
            }
            AssessmentEvent::Completed { host, endpoints, grade, duration_ms } => {
                if let Some(bar) = self.host_bars.remove(host) {
                    let grade = grade.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string());
                    bar.finish_with_message(format!(
                        "{} {} endpoint(s) | grade {} | {}",
                        style("✓").green(), endpoints, style(grade).bold(), format_elapsed(*duration_ms)
                    ));
                }
            }
            AssessmentEvent::Failed { host, error } => {
                if let Some(bar) = self.host_bars.remove(host) {
                    bar.abandon_with_message(format!("{} {}", style("✗").red(), error));
                } else {
                    self.println(&format!("  {} {}: {}", style("✗").red(), host, error));
                }
            }
        }
    }

    /// Print a line through the multi-progress (won't interfere with bars).
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for AssessmentProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    if mins > 0 {
        format!("{}m{}s", mins, remaining_secs)
    } else {
        format!("{}s", secs)
    }
}
