//! Funnel conversion analytics.
//!
//! Three independent calculators over a validated event slice:
//! - Funnel flow (per-step visitors, conversions, dwell time)
//! - Drop-off (who stopped where, and the pages they left from)
//! - Attribution (conversions and revenue by source and campaign)
//!
//! All of them are pure functions of their input and safe to run
//! concurrently over the same slice.

pub mod attribution;
pub mod dropoff;
pub mod flow;
pub mod index;
pub mod report;
pub mod slice;

pub use attribution::*;
pub use dropoff::*;
pub use flow::*;
pub use report::FunnelReport;
pub use slice::*;
