//! Headless render target.
//!
//! Text mode prints the result to stdout as it is rendered and progress to
//! stderr. JSON mode keeps stdout clean for the final snapshot and only
//! reports progress on stderr. Errors are not printed here: every headless
//! failure is returned to `main`, which reports it once.

use crate::cli::OutputLine;
use crate::model::{Action, GaugeReading, ModelLabel, RecommendedMeasure, SimilarCase, View};
use crate::render::RenderTarget;
use tokio::sync::mpsc::UnboundedSender;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    Text,
    Json,
}

pub(crate) struct TextRenderer {
    out: UnboundedSender<OutputLine>,
    mode: OutputMode,
    // Result lines are held back until a request has started, so the empty
    // state rendered at construction never reaches stdout.
    requested: bool,
}

impl TextRenderer {
    pub fn new(out: UnboundedSender<OutputLine>, mode: OutputMode) -> Self {
        Self {
            out,
            mode,
            requested: false,
        }
    }

    fn stdout(&self, line: String) {
        if self.mode == OutputMode::Text && self.requested {
            let _ = self.out.send(OutputLine::Stdout(line));
        }
    }

    fn stderr(&self, line: String) {
        let _ = self.out.send(OutputLine::Stderr(line));
    }
}

pub(crate) fn gauge_line(gauge: &GaugeReading) -> String {
    format!(
        "Probability: {}% ({}° of 360°)",
        gauge.percent, gauge.angle_deg
    )
}

pub(crate) fn similar_bar_line(case: &SimilarCase, label_width: usize) -> String {
    let pct = case.width_percent();
    let filled = (usize::from(pct) * BAR_WIDTH + 50) / 100;
    format!(
        "  {:<label_width$}  {}{} {:>3}%",
        case.measure,
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        pct
    )
}

impl RenderTarget for TextRenderer {
    fn set_gauge(&mut self, gauge: GaugeReading) {
        self.stdout(gauge_line(&gauge));
    }

    fn set_recommendations(&mut self, items: &[RecommendedMeasure]) {
        if items.is_empty() {
            return;
        }
        self.stdout("Recommended measures:".into());
        for (i, rec) in items.iter().enumerate() {
            if rec.reason.is_empty() {
                self.stdout(format!("  {}. {}", i + 1, rec.measure));
            } else {
                self.stdout(format!("  {}. {}: {}", i + 1, rec.measure, rec.reason));
            }
        }
    }

    fn set_similar_bars(&mut self, items: &[SimilarCase]) {
        if items.is_empty() {
            return;
        }
        let width = items
            .iter()
            .map(|c| c.measure.chars().count())
            .max()
            .unwrap_or(0);
        self.stdout("Similar cases:".into());
        for case in items {
            self.stdout(similar_bar_line(case, width));
        }
    }

    fn set_labels(&mut self, labels: &[ModelLabel]) {
        if labels.is_empty() {
            return;
        }
        let joined = labels
            .iter()
            .map(|l| format!("{}={:.3}", l.id, l.score))
            .collect::<Vec<_>>()
            .join(" ");
        self.stdout(format!("Model labels: {joined}"));
    }

    fn set_view(&mut self, view: View) {
        self.stderr(format!("== {view} =="));
    }

    fn show_error(&mut self, message: &str) {
        tracing::debug!(%message, "headless error");
    }

    fn set_selected_file(&mut self, name: Option<&str>) {
        if let Some(name) = name {
            self.stderr(format!("File: {name}"));
        }
    }

    fn set_session(&mut self, session_id: Option<&str>) {
        if let Some(id) = session_id {
            self.stderr(format!("Session: {id}"));
        }
    }

    fn set_loading(&mut self, action: Action, loading: bool) {
        if loading {
            self.requested = true;
            self.stderr(format!("{action} in progress…"));
        }
    }

    fn show_info(&mut self, message: &str) {
        self.stderr(message.to_string());
    }
}
