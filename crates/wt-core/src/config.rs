//! Organization-wide policy knobs.

use serde::{Deserialize, Serialize};

/// Length of a working day in hours.
pub const DEFAULT_WORKDAY_HOURS: u32 = 9;

/// Annual leave days accrued over twelve months of employment.
pub const DEFAULT_ANNUAL_LEAVE_DAYS: f64 = 14.0;

/// Policy parameters injected into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours credited per business day when converting days to capacity.
    /// Default: 9.
    pub workday_hours: u32,

    /// Annual leave accrued per year of employment, earned in twelfths.
    /// Default: 14.0.
    pub annual_leave_days: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workday_hours: DEFAULT_WORKDAY_HOURS,
            annual_leave_days: DEFAULT_ANNUAL_LEAVE_DAYS,
        }
    }
}
