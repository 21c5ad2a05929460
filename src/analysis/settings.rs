use crate::jvm::BinaryName;

/// Knobs for [`super::Analyzer`]
#[derive(Clone, Debug)]
pub struct Settings {
    /// Maximum number of blocks popped off the worklist for a single method
    ///
    /// The analysis always terminates on its own, but a method with a huge number of join points
    /// can still take a long time to get there. Running out of visits is reported as
    /// [`super::AnalysisError::IterationLimit`]. `None` means no limit.
    pub max_block_visits: Option<usize>,

    /// Exception pushed onto the stack when entering a catch-all (`finally`) handler
    pub default_exception_type: BinaryName,
}

impl Settings {
    pub const DEFAULT_MAX_BLOCK_VISITS: usize = 100_000;

    /// Settings with no ceiling on the number of block visits
    pub fn unbounded() -> Settings {
        Settings {
            max_block_visits: None,
            ..Settings::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            max_block_visits: Some(Self::DEFAULT_MAX_BLOCK_VISITS),
            default_exception_type: BinaryName::THROWABLE,
        }
    }
}
