//! Backend commands queued from UI to backend worker.

use client_core::DatasetHandle;
use shared::{domain::Generation, protocol::ExportTarget};

pub enum BackendCommand {
    Upload {
        dataset: Option<DatasetHandle>,
        top_n: i64,
    },
    RefreshTopCustomers {
        generation: Generation,
        top_n: i64,
    },
    Export {
        target: ExportTarget,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Upload { .. } => "upload",
            BackendCommand::RefreshTopCustomers { .. } => "refresh_top_customers",
            BackendCommand::Export { .. } => "export",
        }
    }
}
