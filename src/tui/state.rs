use super::animation::BarTween;
use crate::model::{Action, GaugeReading, ModelLabel, RecommendedMeasure, SimilarCase, View};
use std::time::{Duration, Instant};

/// How long the augmentation box stays highlighted after a focus request.
pub const FOCUS_FLASH: Duration = Duration::from_millis(800);

/// Controller-to-UI messages. One per render call.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Gauge(GaugeReading),
    Recommendations(Vec<RecommendedMeasure>),
    SimilarBars(Vec<SimilarCase>),
    Labels(Vec<ModelLabel>),
    View(View),
    SelectedFile(Option<String>),
    Session(Option<String>),
    Loading(Action, bool),
    ClearAugmentInput,
    FocusAugmentInput,
    Info(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

pub struct SimilarBar {
    pub case: SimilarCase,
    pub tween: BarTween,
}

pub struct UiState {
    pub tab: usize,
    pub view: View,
    pub base_url: String,

    pub path_input: String,
    pub augment_input: String,
    pub selected_file: Option<String>,
    pub session_id: Option<String>,

    pub gauge: GaugeReading,
    pub recommendations: Vec<RecommendedMeasure>,
    pub bars: Vec<SimilarBar>,
    pub labels: Vec<ModelLabel>,

    pub upload_pending: bool,
    pub augment_pending: bool,
    pub notice: Option<Notice>,
    pub focus_flash: Option<Instant>,
}

impl UiState {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            tab: 0,
            view: View::Uploading,
            base_url: base_url.into(),
            path_input: String::new(),
            augment_input: String::new(),
            selected_file: None,
            session_id: None,
            gauge: GaugeReading::empty(),
            recommendations: Vec::new(),
            bars: Vec::new(),
            labels: Vec::new(),
            upload_pending: false,
            augment_pending: false,
            notice: None,
            focus_flash: None,
        }
    }

    pub fn apply(&mut self, ev: UiEvent, now: Instant) {
        match ev {
            UiEvent::Gauge(g) => self.gauge = g,
            UiEvent::Recommendations(items) => self.recommendations = items,
            UiEvent::SimilarBars(items) => {
                // Every new result restarts the bars from zero.
                self.bars = items
                    .into_iter()
                    .map(|case| SimilarBar {
                        tween: BarTween::new(case.width_percent(), now),
                        case,
                    })
                    .collect();
            }
            UiEvent::Labels(labels) => self.labels = labels,
            UiEvent::View(view) => {
                if view != self.view {
                    self.path_input.clear();
                    self.augment_input.clear();
                }
                self.view = view;
            }
            UiEvent::SelectedFile(name) => {
                if name.is_some() {
                    self.path_input.clear();
                }
                self.selected_file = name;
            }
            UiEvent::Session(id) => self.session_id = id,
            UiEvent::Loading(Action::Upload, on) => self.upload_pending = on,
            UiEvent::Loading(Action::Augment, on) => self.augment_pending = on,
            UiEvent::ClearAugmentInput => self.augment_input.clear(),
            UiEvent::FocusAugmentInput => self.focus_flash = Some(now),
            UiEvent::Info(text) => {
                self.notice = Some(Notice {
                    text,
                    is_error: false,
                })
            }
            UiEvent::Error(text) => {
                self.notice = Some(Notice {
                    text,
                    is_error: true,
                })
            }
        }
    }

    pub fn can_submit_upload(&self) -> bool {
        self.view == View::Uploading && self.selected_file.is_some() && !self.upload_pending
    }

    pub fn can_submit_augment(&self) -> bool {
        self.view == View::Reviewing
            && self.session_id.is_some()
            && !self.augment_pending
            && !self.augment_input.trim().is_empty()
    }

    /// The text input that keystrokes go to in the current view.
    pub fn active_input_mut(&mut self) -> &mut String {
        match self.view {
            View::Uploading => &mut self.path_input,
            View::Reviewing => &mut self.augment_input,
        }
    }

    pub fn is_focus_flashing(&self, now: Instant) -> bool {
        self.focus_flash
            .is_some_and(|at| now.saturating_duration_since(at) < FOCUS_FLASH)
    }

    pub fn bars_animating(&self, now: Instant) -> bool {
        self.bars.iter().any(|b| !b.tween.is_done(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(measure: &str, frequency: f64) -> SimilarCase {
        SimilarCase {
            measure: measure.into(),
            frequency,
        }
    }

    #[test]
    fn upload_enabled_only_with_file_and_idle() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        assert!(!s.can_submit_upload());
        s.apply(UiEvent::SelectedFile(Some("report.pdf".into())), now);
        assert!(s.can_submit_upload());
        s.apply(UiEvent::Loading(Action::Upload, true), now);
        assert!(!s.can_submit_upload());
        s.apply(UiEvent::Loading(Action::Upload, false), now);
        assert!(s.can_submit_upload());
    }

    #[test]
    fn augment_enabled_only_with_text_and_idle() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        s.apply(UiEvent::Session(Some("s1".into())), now);
        s.apply(UiEvent::View(View::Reviewing), now);
        assert!(!s.can_submit_augment());
        s.active_input_mut().push_str("   ");
        assert!(!s.can_submit_augment());
        s.active_input_mut().push_str("fever");
        assert!(s.can_submit_augment());
        s.apply(UiEvent::Loading(Action::Augment, true), now);
        assert!(!s.can_submit_augment());
    }

    #[test]
    fn new_bars_start_at_zero_width() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        s.apply(UiEvent::SimilarBars(vec![bar("B", 0.4), bar("C", 1.7)]), now);
        assert_eq!(s.bars.len(), 2);
        assert_eq!(s.bars[0].tween.value_at(now), 0.0);
        assert_eq!(s.bars[0].tween.target(), 40.0);
        assert_eq!(s.bars[1].tween.target(), 100.0);
        assert!(s.bars_animating(now));
    }

    #[test]
    fn leaving_a_view_clears_inputs() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        s.apply(UiEvent::View(View::Reviewing), now);
        s.active_input_mut().push_str("half typed");
        s.apply(UiEvent::View(View::Uploading), now);
        assert!(s.augment_input.is_empty());
        assert!(s.path_input.is_empty());
    }

    #[test]
    fn errors_replace_info_notices() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        s.apply(UiEvent::Info("Backend status: ok".into()), now);
        s.apply(UiEvent::Error("backend error: HTTP 500".into()), now);
        let notice = s.notice.unwrap();
        assert!(notice.is_error);
        assert!(notice.text.contains("500"));
    }

    #[test]
    fn focus_request_flashes_briefly() {
        let mut s = UiState::new("http://localhost:8000");
        let now = Instant::now();
        assert!(!s.is_focus_flashing(now));
        s.apply(UiEvent::FocusAugmentInput, now);
        assert!(s.is_focus_flashing(now + Duration::from_millis(100)));
        assert!(!s.is_focus_flashing(now + FOCUS_FLASH));
    }
}
