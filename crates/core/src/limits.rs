//! Size limits for events and event slices.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Identifier Limits (chars) ===

/// Actor (visitor/customer) ID max length.
/// UUIDs=36, emails=~50, custom IDs up to 128.
pub const MAX_ACTOR_ID_LEN: usize = 128;

/// Target ID max length (funnel, step, element, or product).
pub const MAX_TARGET_ID_LEN: usize = 128;

/// Funnel and step ID max length in metadata.
pub const MAX_METADATA_ID_LEN: usize = 128;

// === Metadata String Limits (chars) ===

/// Page path max length.
pub const MAX_PATH_LEN: usize = 2000;

/// Referrer URL max length.
/// Matches HTTP Referer header limit.
pub const MAX_REFERRER_LEN: usize = 2048;

/// Campaign, medium, and content tag max length.
/// UTM values are usually short slugs.
pub const MAX_UTM_LEN: usize = 256;

// === Time Limits ===

/// Latest accepted event timestamp (9999-12-31T23:59:59.999Z, Unix ms).
/// Timestamps below 0 are rejected as well.
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

// === Slice Limits ===

/// Default maximum number of events a caller should hand to one analysis run.
///
/// The calculators do no pagination; a slice is held in memory several
/// times over as per-actor indexes.
pub const MAX_SLICE_EVENTS: usize = 1_000_000;

/// Number of exit pages reported per drop-off step.
pub const TOP_EXIT_PAGES: usize = 5;
