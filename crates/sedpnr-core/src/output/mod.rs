//! Output
//!
//! Metrics recording during the run and the files written from it.

pub mod recorder;
pub mod writer;

pub use recorder::{record_metrics, MetricsRecorder};
pub use writer::{
    ensure_dir, write_results_csv, write_summary_json, OutputError, SpatialWriter, RESULTS_FILE,
    SPATIAL_FILE, SUMMARY_FILE,
};
