//! Engine configuration.

use basalt_primitives::{CostSchedule, MAX_ACTION_RESULT_SIZE};

/// Configuration for the contract execution engine.
///
/// The gas limit is per request, not per engine; everything here is policy
/// shared by all executions driven through one engine instance.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum linear memory pages a contract may use (1 page = 64 KiB).
    pub max_memory_pages: u32,

    /// Gas cost policy.
    pub costs: CostSchedule,

    /// Maximum size of a result payload and of the encoded action result.
    pub max_result_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            costs: CostSchedule::default(),
            max_result_size: MAX_ACTION_RESULT_SIZE,
        }
    }
}
