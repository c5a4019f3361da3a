//! Per-resource records, queries and hooks.
//!
//! | resource | reads | writes |
//! |---|---|---|
//! | schools | [`use_schools`], [`use_school`] | create, update, delete |
//! | units | [`use_units`], [`use_unit`] | create, update, delete |
//! | reports | [`use_reports`], [`use_report`] | create, update, delete |
//! | audit | [`use_audit_logs`] | [`use_create_audit_log`] |
//! | stats | [`use_dashboard_stats`] | none |

mod audit;
mod reports;
mod schools;
mod stats;
mod units;

pub use audit::*;
pub use reports::*;
pub use schools::*;
pub use stats::*;
pub use units::*;
