//! Render-target seam between the controller and any display surface.
//!
//! The controller never touches a terminal directly; it calls these methods and
//! each front end (TUI, headless text, test recorder) decides what they mean.

use crate::model::{
    Action, GaugeReading, InferenceResult, ModelLabel, RecommendedMeasure, SimilarCase, View,
};

pub trait RenderTarget {
    fn set_gauge(&mut self, gauge: GaugeReading);
    fn set_recommendations(&mut self, items: &[RecommendedMeasure]);
    /// Targets that can animate should ease each bar from empty to its width.
    fn set_similar_bars(&mut self, items: &[SimilarCase]);
    fn set_view(&mut self, view: View);
    fn show_error(&mut self, message: &str);

    fn set_selected_file(&mut self, _name: Option<&str>) {}
    fn set_session(&mut self, _session_id: Option<&str>) {}
    fn set_labels(&mut self, _labels: &[ModelLabel]) {}
    fn set_loading(&mut self, _action: Action, _loading: bool) {}
    fn clear_augment_input(&mut self) {}
    fn focus_augment_input(&mut self) {}
    fn show_info(&mut self, _message: &str) {}
}

/// Render a result (or the empty state) in gauge, list, bars order.
pub fn render_result<R: RenderTarget + ?Sized>(target: &mut R, result: Option<&InferenceResult>) {
    match result {
        Some(r) => {
            target.set_gauge(GaugeReading::from_probability(r.probability));
            target.set_recommendations(&r.recommended);
            target.set_similar_bars(&r.similar_cases);
            target.set_labels(&r.labels);
        }
        None => {
            target.set_gauge(GaugeReading::empty());
            target.set_recommendations(&[]);
            target.set_similar_bars(&[]);
            target.set_labels(&[]);
        }
    }
}
