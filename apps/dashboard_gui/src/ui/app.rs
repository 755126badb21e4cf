//! Dashboard window: drains store updates, then renders the projected view.

use std::time::Duration;

use client_core::{
    projector::{
        project, PaneView, ResultsView, SegmentationView, TopCustomersView, UploadView,
    },
    Alert, DatasetHandle, StateUpdate, ViewStateStore,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::{
    backend_bridge::commands::BackendCommand, controller::orchestration::dispatch_backend_command,
};

pub struct DashboardApp {
    store: ViewStateStore,
    cmd_tx: Sender<BackendCommand>,
    update_rx: Receiver<StateUpdate>,
}

impl DashboardApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        update_rx: Receiver<StateUpdate>,
        default_top_n: i64,
    ) -> Self {
        Self {
            store: ViewStateStore::new(default_top_n),
            cmd_tx,
            update_rx,
        }
    }

    fn process_updates(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.store.apply(update);
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.store);
    }

    fn pick_dataset(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV", &["csv"])
            .pick_file()
        else {
            return;
        };
        match DatasetHandle::from_path(&path) {
            Ok(dataset) => {
                tracing::info!(file = dataset.name(), size_bytes = dataset.len(), "dataset selected");
                self.store.set_dataset(dataset);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read dataset: {err}");
                self.store
                    .set_status(format!("Could not read {}: {err}", path.display()));
            }
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        let tabs = project(&self.store).tabs;
        egui::TopBottomPanel::top("dashboard_header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Customer Value Prediction Dashboard");
            ui.horizontal(|ui| {
                for tab in tabs {
                    let clicked = ui
                        .add_enabled_ui(tab.enabled, |ui| ui.selectable_label(tab.selected, tab.label))
                        .inner
                        .clicked();
                    if clicked {
                        self.store.select_pane(tab.pane);
                    }
                }
            });
            ui.add_space(4.0);
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context, status: Option<&str>) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.store.is_loading() {
                    ui.spinner();
                }
                ui.label(status.unwrap_or(""));
            });
        });
    }

    fn show_upload(&mut self, ui: &mut egui::Ui, view: &UploadView) {
        ui.heading("Upload Transaction Data");
        ui.add_space(8.0);
        if ui.button(view.file_label.as_str()).clicked() {
            self.pick_dataset();
        }
        ui.add_space(8.0);
        let submit = ui.add_enabled(view.submit_enabled, egui::Button::new(view.submit_label));
        if submit.clicked() {
            let cmd = BackendCommand::Upload {
                dataset: self.store.dataset().cloned(),
                top_n: self.store.top_n(),
            };
            self.dispatch(cmd);
        }
    }

    fn show_results(&mut self, ui: &mut egui::Ui, view: &ResultsView) {
        ui.heading(format!("Predictions for {} customers", view.prediction_count));
        ui.add_space(8.0);

        if let Some(cards) = &view.metric_cards {
            ui.horizontal(|ui| {
                for card in cards {
                    ui.group(|ui| {
                        ui.vertical(|ui| {
                            ui.label(egui::RichText::new(card.title).weak());
                            ui.label(egui::RichText::new(&card.value).size(20.0).strong());
                        });
                    });
                }
            });
            ui.add_space(12.0);
        }

        if let Some(top) = &view.top_customers {
            self.show_top_customers(ui, top);
        }
    }

    fn show_top_customers(&mut self, ui: &mut egui::Ui, view: &TopCustomersView) {
        ui.horizontal(|ui| {
            ui.strong("Top Customers");
            let mut raw = view.top_n_input;
            if ui.add(egui::DragValue::new(&mut raw).speed(1.0)).changed() {
                self.store.set_top_n(raw);
            }
            if ui.button("Update").clicked() {
                if let Some(generation) = self.store.generation() {
                    let cmd = BackendCommand::RefreshTopCustomers {
                        generation,
                        top_n: self.store.top_n(),
                    };
                    self.dispatch(cmd);
                }
            }
            if ui.button("Export All Predictions").clicked() {
                self.dispatch(BackendCommand::Export {
                    target: view.export,
                });
            }
        });
        ui.add_space(6.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("top_customers_grid")
                .striped(true)
                .num_columns(3)
                .show(ui, |ui| {
                    ui.strong("Rank");
                    ui.strong("Customer ID");
                    ui.strong("Predicted Value");
                    ui.end_row();
                    for row in &view.rows {
                        ui.label(row.rank.to_string());
                        ui.label(&row.customer_id);
                        ui.label(&row.value);
                        ui.end_row();
                    }
                });
        });
    }

    fn show_segmentation(&mut self, ui: &mut egui::Ui, view: &SegmentationView) {
        ui.heading("Customer Segmentation");
        ui.label(format!("75th percentile: {}", view.p75));
        ui.label(format!("90th percentile: {}", view.p90));
        ui.add_space(8.0);

        let mut export = None;
        ui.horizontal(|ui| {
            for tier in &view.tiers {
                ui.group(|ui| {
                    ui.vertical(|ui| {
                        ui.strong(tier.label);
                        ui.label(egui::RichText::new(tier.count.to_string()).size(24.0));
                        ui.label(&tier.threshold);
                        if let Some(share) = &tier.share {
                            ui.label(egui::RichText::new(share).weak());
                        }
                        if ui.button("Export").clicked() {
                            export = Some(tier.export);
                        }
                    });
                });
            }
        });
        if let Some(target) = export {
            self.dispatch(BackendCommand::Export { target });
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context, alert: &Alert) {
        let mut acknowledged = false;
        egui::Window::new("Alert")
            .id(egui::Id::new("dashboard_alert"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(&alert.message);
                if let Some(detail) = &alert.detail {
                    ui.label(egui::RichText::new(detail).weak().small());
                }
                ui.add_space(6.0);
                acknowledged = ui.button("OK").clicked();
            });
        if acknowledged {
            self.store.dismiss_alert();
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_updates();

        self.show_header(ctx);
        let view = project(&self.store);
        self.show_status_bar(ctx, view.status.as_deref());

        egui::CentralPanel::default().show(ctx, |ui| {
            // Panels stay inert behind an unacknowledged alert.
            ui.add_enabled_ui(view.alert.is_none(), |ui| match &view.body {
                PaneView::Upload(upload) => self.show_upload(ui, upload),
                PaneView::Results(results) => self.show_results(ui, results),
                PaneView::Segmentation(segmentation) => self.show_segmentation(ui, segmentation),
            });
        });

        if let Some(alert) = &view.alert {
            self.show_alert(ctx, alert);
        }

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
