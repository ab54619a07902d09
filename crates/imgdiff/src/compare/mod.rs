pub mod diff;

use imgdiff_core::EngineReport;

/// Status of a single snapshot comparison.
pub enum SnapshotStatus {
    /// No reference existed; the capture was stored.
    Added { promoted: bool },
    /// Differed from the reference, which was overwritten.
    Updated { report: EngineReport },
    Matched,
    Failed {
        report: EngineReport,
        dimension_mismatch: Option<(u32, u32, u32, u32)>,
    },
    Error(String),
}
