//! Interpreter limits.
//!
//! A zero value disables the corresponding limit, matching the engine's own
//! convention.

use rhai::Engine;
use serde::{Deserialize, Serialize};

pub type Fuel = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Maximum number of interpreter operations per run
    pub fuel_limit: Fuel,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    /// Also bounds blobs, and therefore the size of a single host read
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            fuel_limit: 10_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 1 << 20,
            max_array_size: 1 << 20,
            max_map_size: 1 << 16,
        }
    }
}

impl VmConfig {
    pub(crate) fn apply(&self, engine: &mut Engine) {
        engine.set_max_operations(self.fuel_limit);
        engine.set_max_call_levels(self.max_call_levels);
        engine.set_max_expr_depths(self.max_expr_depth, self.max_expr_depth);
        engine.set_max_string_size(self.max_string_size);
        engine.set_max_array_size(self.max_array_size);
        engine.set_max_map_size(self.max_map_size);
    }
}
