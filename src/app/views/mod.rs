pub mod stats_view;
pub mod viewfinder;

pub trait View {
    fn draw(&mut self, ui: &mut egui::Ui);
}
