//! UI layer: the dashboard window.

pub mod app;

pub use app::DashboardApp;
