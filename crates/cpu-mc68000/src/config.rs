//! Build and run-time options.

/// Processor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Keep scanning the pattern table after an opcode is installed and fail
    /// the build if a second entry also accepts it.
    pub check_pattern_overlaps: bool,
    /// Log every bus transaction at `trace` level.
    pub trace_bus: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_pattern_overlaps: cfg!(debug_assertions),
            trace_bus: false,
        }
    }
}
