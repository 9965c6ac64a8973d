use crate::app::notices::Toasts;
use crate::app::permissions::DENIED_MESSAGE;
use crate::app::views::View;
use crate::app::views::stats_view::StatsView;
use crate::app::views::viewfinder::Viewfinder;
use crate::camera::CapturePipeline;
use crate::config::UiSettings;
use crate::error::AppError;
use crate::pipeline::AnalysisStats;
use crate::pipeline::overlay::OverlaySubscriber;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const APP_TITLE: &str = "PeopleCam";

enum Screen {
    Running {
        pipeline: Arc<CapturePipeline>,
        viewfinder: Viewfinder,
        stats: StatsView,
        toasts: Toasts,
    },
    /// Terminal: explains why and closes the window once `close_at` passes.
    Denied { close_at: Instant },
}

pub struct CameraApp {
    screen: Screen,
}

impl CameraApp {
    pub fn running(
        pipeline: Arc<CapturePipeline>,
        overlay_feed: OverlaySubscriber,
        stats: Arc<Mutex<AnalysisStats>>,
        toasts: Toasts,
    ) -> Self {
        let viewfinder = Viewfinder::new(pipeline.preview(), overlay_feed);
        Self {
            screen: Screen::Running {
                pipeline,
                viewfinder,
                stats: StatsView::new(stats),
                toasts,
            },
        }
    }

    pub fn denied(close_after: Duration) -> Self {
        Self {
            screen: Screen::Denied {
                close_at: Instant::now() + close_after,
            },
        }
    }

    /// Opens the window and blocks until it is closed.
    pub fn start_gui(settings: &UiSettings, app: CameraApp) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(settings.window_width, settings.window_height))
                .with_title(APP_TITLE),
            ..Default::default()
        };
        eframe::run_native(APP_TITLE, options, Box::new(move |_cc| Ok(Box::new(app))))
            .map_err(|e| AppError::Ui(e.to_string()))
    }
}

fn draw_denied(ctx: &egui::Context, close_at: Instant) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.centered_and_justified(|ui| {
            ui.heading(DENIED_MESSAGE);
        });
    });
    let remaining = close_at.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        info!("Closing: camera permission denied");
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    } else {
        ctx.request_repaint_after(remaining);
    }
}

fn draw_toasts(ctx: &egui::Context, toasts: &Toasts) {
    if toasts.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -72.0))
        .show(ctx, |ui| {
            for toast in toasts.visible() {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    let color = if toast.notice.is_error() {
                        egui::Color32::LIGHT_RED
                    } else {
                        ui.visuals().text_color()
                    };
                    ui.label(egui::RichText::new(toast.notice.message()).color(color));
                });
            }
        });
}

impl eframe::App for CameraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (pipeline, viewfinder, stats, toasts) = match &mut self.screen {
            Screen::Denied { close_at } => {
                draw_denied(ctx, *close_at);
                return;
            }
            Screen::Running {
                pipeline,
                viewfinder,
                stats,
                toasts,
            } => (pipeline, viewfinder, stats, toasts),
        };

        toasts.refresh(Instant::now());

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let capture = ui.add_sized([160.0, 36.0], egui::Button::new("Take Photo"));
                if capture.clicked() {
                    debug!("Capture requested");
                    // The outcome arrives as a notice.
                    drop(pipeline.take_photo());
                }
            });
        });

        egui::SidePanel::right("stats")
            .resizable(false)
            .show(ctx, |ui| stats.draw(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::BLACK))
            .show(ctx, |ui| viewfinder.draw(ui));

        draw_toasts(ctx, toasts);
        ctx.request_repaint();
    }
}
