/// Default page size for message history fetches
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// How far apart (in seconds) an optimistic entry and its persisted echo may
/// be stamped and still reconcile to the same logical send
pub const RECONCILE_WINDOW_SECS: i64 = 120;

/// Upper-bound sentinel closing the half-open range used for name prefix
/// queries, mirroring the backend query interface. Prefixes at or past this
/// code point fall outside the range the backend can express.
pub const PREFIX_RANGE_SENTINEL: char = '\u{f8ff}';
