pub mod consent;
pub mod deleter;
pub mod export_storage;
pub mod exporter;
pub mod gdpr;

pub use consent::{ConsentChange, ConsentGate};
pub use deleter::{DataDeleter, DeletionOutcome};
pub use export_storage::{ExportStorage, LocalExportStorage};
pub use exporter::{DataExporter, ExportArtifact};
pub use gdpr::{ClientInfo, GdprService};
