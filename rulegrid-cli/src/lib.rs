// All pipeline functionality is in rulegrid-core
// This CLI acts as a thin wrapper: workbook decoding in, artifacts out

// CLI-specific modules
pub mod writer;
pub mod xlsx;

// Re-export core types for convenience
pub use rulegrid_core::*;

// Re-export CLI utilities
pub use writer::DirectorySink;
pub use xlsx::XlsxWorkbook;
