use crate::app::views::View;
use crate::pipeline::AnalysisStats;
use chrono::Utc;
use std::sync::{Arc, Mutex};

pub struct StatsView {
    stats: Arc<Mutex<AnalysisStats>>,
}

impl StatsView {
    pub fn new(stats: Arc<Mutex<AnalysisStats>>) -> Self {
        Self { stats }
    }
}

impl View for StatsView {
    fn draw(&mut self, ui: &mut egui::Ui) {
        ui.heading("Analysis");
        let Ok(stats) = self.stats.lock().map(|stats| stats.clone()) else {
            ui.label("Statistics unavailable");
            return;
        };

        ui.label(format!("Frames analyzed: {}", stats.frames_analyzed));
        ui.label(format!("Frames failed: {}", stats.frames_failed));
        ui.label(format!("People in view: {}", stats.persons_last_frame));
        ui.separator();
        ui.label(format!("Conversion: {:.1} ms", stats.avg_conversion_ms));
        ui.label(format!("Inference: {:.1} ms", stats.avg_inference_ms));
        if let Some(last) = stats.last_frame_at {
            let age = Utc::now().signed_duration_since(last);
            ui.label(format!("Last frame: {} ms ago", age.num_milliseconds()));
        }
    }
}
