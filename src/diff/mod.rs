//! Notice diffing: which notices in a fresh listing are new since the cursor.
//!
//! The notice board is scraped independently on every tick, with no pagination or
//! identifiers beyond title digests. The diff walks the fresh listing from newest to
//! oldest until it meets the cursor (the "boundary"); everything before the boundary
//! is new.
//!
//! # Rules
//!
//! 1. **First observation** (cursor unset): the cursor is set to the newest notice and
//!    nothing is reported. A freshly added branch starts silent instead of flooding
//!    subscribers with the whole backlog.
//! 2. **Boundary found**: the notices before it are returned oldest-first and the
//!    cursor advances to the newest notice.
//! 3. **Boundary not found** within the lookback limit: the cursor is reset to the
//!    newest notice and nothing is reported. This bounds re-notification when the
//!    last-seen notice has rotated off the page.
//! 4. **Empty listing**: the cursor is left untouched.
//!
//! Duplicate titles share an ID; only the newest occurrence matters for the scan, and
//! a title repeated before the boundary is reported once, at its newest position.


use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cursor::Cursor;
use crate::types::{BranchId, Notice, NoticeId};

/// Default number of newest entries scanned for the boundary.
pub const DEFAULT_LOOKBACK_LIMIT: usize = 50;

/// How a diff moved the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorChange {
    /// The listing was empty; the cursor was not touched.
    EmptyListing,
    /// First observation of the branch; the cursor now points at the newest notice.
    Initialized { to: NoticeId },
    /// The newest notice is the cursor itself.
    Unchanged,
    /// New notices were found before the boundary.
    Advanced { from: NoticeId, to: NoticeId },
    /// The boundary was not found within the lookback limit.
    Reset { from: NoticeId, to: NoticeId },
}

/// The result of diffing one listing against one cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// Notices newer than the previous cursor, oldest first.
    pub new_notices: Vec<Notice>,
    /// The cursor transition that was applied.
    pub change: CursorChange,
}

impl Diff {
    fn silent(change: CursorChange) -> Self {
        Diff {
            new_notices: Vec::new(),
            change,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_notices.is_empty()
    }
}

/// Computes diffs and applies the resulting cursor moves.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    lookback_limit: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK_LIMIT)
    }
}

impl DiffEngine {
    /// Creates an engine that scans at most `lookback_limit` entries (minimum 1).
    pub fn new(lookback_limit: usize) -> Self {
        DiffEngine {
            lookback_limit: lookback_limit.max(1),
        }
    }

    pub fn lookback_limit(&self) -> usize {
        self.lookback_limit
    }

    /// Diffs `listing` (newest first) against `cursor`, updating the cursor in place.
    ///
    /// The cursor update is complete when this returns; delivery of the returned
    /// notices has no bearing on it.
    pub fn diff(&self, branch: &BranchId, cursor: &mut Cursor, listing: &[Notice]) -> Diff {
        let Some(newest) = listing.first() else {
            debug!(%branch, "Empty listing, cursor untouched");
            return Diff::silent(CursorChange::EmptyListing);
        };
        let newest_id = newest.id();

        let previous = match *cursor {
            Cursor::Unset => {
                *cursor = Cursor::At(newest_id);
                info!(
                    %branch,
                    cursor = %newest_id.short(),
                    listed = listing.len(),
                    "First observation, cursor initialized without notifying"
                );
                return Diff::silent(CursorChange::Initialized { to: newest_id });
            }
            Cursor::At(id) => id,
        };

        let boundary = listing
            .iter()
            .take(self.lookback_limit)
            .position(|notice| notice.id() == previous);

        match boundary {
            Some(0) => {
                debug!(%branch, "No new notices");
                Diff::silent(CursorChange::Unchanged)
            }
            Some(count) => {
                let mut seen = HashSet::with_capacity(count);
                let mut new_notices: Vec<Notice> = listing[..count]
                    .iter()
                    .filter(|notice| seen.insert(notice.id()))
                    .cloned()
                    .collect();
                new_notices.reverse();
                *cursor = Cursor::At(newest_id);
                debug!(
                    %branch,
                    new = new_notices.len(),
                    from = %previous.short(),
                    to = %newest_id.short(),
                    "Cursor advanced"
                );
                Diff {
                    new_notices,
                    change: CursorChange::Advanced {
                        from: previous,
                        to: newest_id,
                    },
                }
            }
            None => {
                *cursor = Cursor::At(newest_id);
                warn!(
                    %branch,
                    from = %previous.short(),
                    to = %newest_id.short(),
                    scanned = listing.len().min(self.lookback_limit),
                    lookback_limit = self.lookback_limit,
                    "Cursor reset: last seen notice not found in listing"
                );
                Diff::silent(CursorChange::Reset {
                    from: previous,
                    to: newest_id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch() -> BranchId {
        BranchId::parse("CSE").unwrap()
    }

    fn n(i: u32) -> Notice {
        Notice::new(format!("Notice {}", i), None, "Admin")
    }

    /// Builds a newest-first listing from notice numbers.
    fn listing(ids: &[u32]) -> Vec<Notice> {
        ids.iter().map(|&i| n(i)).collect()
    }

    fn titles(notices: &[Notice]) -> Vec<&str> {
        notices.iter().map(Notice::title).collect()
    }

    #[test]
    fn first_observation_is_silent_and_sets_cursor() {
        let engine = DiffEngine::default();
        let mut cursor = Cursor::Unset;

        let diff = engine.diff(&branch(), &mut cursor, &listing(&[5, 4, 3, 2, 1]));

        assert!(diff.is_empty());
        assert_eq!(diff.change, CursorChange::Initialized { to: n(5).id() });
        assert_eq!(cursor, Cursor::At(n(5).id()));
    }

    #[test]
    fn three_tick_scenario() {
        let engine = DiffEngine::default();
        let mut cursor = Cursor::Unset;

        let first = engine.diff(&branch(), &mut cursor, &listing(&[5, 4, 3, 2, 1]));
        assert!(first.is_empty());
        assert_eq!(cursor, Cursor::At(n(5).id()));

        let second = engine.diff(&branch(), &mut cursor, &listing(&[7, 6, 5, 4, 3]));
        assert_eq!(titles(&second.new_notices), vec!["Notice 6", "Notice 7"]);
        assert_eq!(
            second.change,
            CursorChange::Advanced {
                from: n(5).id(),
                to: n(7).id()
            }
        );
        assert_eq!(cursor, Cursor::At(n(7).id()));

        let third = engine.diff(&branch(), &mut cursor, &listing(&[7, 6, 5, 4, 3]));
        assert!(third.is_empty());
        assert_eq!(third.change, CursorChange::Unchanged);
        assert_eq!(cursor, Cursor::At(n(7).id()));
    }

    #[test]
    fn empty_listing_leaves_cursor_untouched() {
        let engine = DiffEngine::default();

        let mut unset = Cursor::Unset;
        let diff = engine.diff(&branch(), &mut unset, &[]);
        assert_eq!(diff.change, CursorChange::EmptyListing);
        assert_eq!(unset, Cursor::Unset);

        let mut set = Cursor::At(n(3).id());
        let diff = engine.diff(&branch(), &mut set, &[]);
        assert!(diff.is_empty());
        assert_eq!(set, Cursor::At(n(3).id()));
    }

    #[test]
    fn missing_boundary_resets_without_notifying() {
        let engine = DiffEngine::default();
        let mut cursor = Cursor::At(n(5).id());

        let diff = engine.diff(&branch(), &mut cursor, &listing(&[12, 11, 10, 9, 8]));

        assert!(diff.is_empty());
        assert_eq!(
            diff.change,
            CursorChange::Reset {
                from: n(5).id(),
                to: n(12).id()
            }
        );
        assert_eq!(cursor, Cursor::At(n(12).id()));
    }

    #[test]
    fn boundary_beyond_lookback_limit_counts_as_missing() {
        let engine = DiffEngine::new(3);
        let mut cursor = Cursor::At(n(5).id());

        // Boundary sits at index 4, past the three-entry lookback.
        let diff = engine.diff(&branch(), &mut cursor, &listing(&[9, 8, 7, 6, 5]));

        assert!(diff.is_empty());
        assert!(matches!(diff.change, CursorChange::Reset { .. }));
        assert_eq!(cursor, Cursor::At(n(9).id()));
    }

    #[test]
    fn boundary_at_last_lookback_slot_is_found() {
        let engine = DiffEngine::new(3);
        let mut cursor = Cursor::At(n(5).id());

        let diff = engine.diff(&branch(), &mut cursor, &listing(&[7, 6, 5, 4]));

        assert_eq!(titles(&diff.new_notices), vec!["Notice 6", "Notice 7"]);
    }

    #[test]
    fn zero_lookback_is_clamped_to_one() {
        let engine = DiffEngine::new(0);
        assert_eq!(engine.lookback_limit(), 1);

        let mut cursor = Cursor::At(n(5).id());
        let diff = engine.diff(&branch(), &mut cursor, &listing(&[5, 4]));
        assert_eq!(diff.change, CursorChange::Unchanged);
    }

    #[test]
    fn duplicate_titles_use_newest_occurrence_as_boundary() {
        let engine = DiffEngine::default();
        // "Notice 5" appears twice; the scan stops at the first (newest) one.
        let fresh = vec![n(7), n(5), n(6), n(5), n(4)];
        let mut cursor = Cursor::At(n(5).id());

        let diff = engine.diff(&branch(), &mut cursor, &fresh);

        assert_eq!(titles(&diff.new_notices), vec!["Notice 7"]);
        assert_eq!(cursor, Cursor::At(n(7).id()));
    }

    #[test]
    fn repeated_title_before_boundary_is_reported_once() {
        let engine = DiffEngine::default();
        let repost = Notice::new("Exam schedule", None, "Admin");
        let fresh = vec![n(7), repost.clone(), n(6), repost, n(5)];
        let mut cursor = Cursor::At(n(5).id());

        let diff = engine.diff(&branch(), &mut cursor, &fresh);

        assert_eq!(
            titles(&diff.new_notices),
            vec!["Notice 6", "Exam schedule", "Notice 7"]
        );
        assert_eq!(cursor, Cursor::At(n(7).id()));
    }

    #[test]
    fn fields_other_than_title_do_not_affect_boundary() {
        let engine = DiffEngine::default();
        let mut cursor = Cursor::At(n(5).id());
        let reformatted = Notice::new("Notice 5", Some("https://example.org/5.pdf".into()), "Dean");

        let diff = engine.diff(&branch(), &mut cursor, &[n(6), reformatted]);

        assert_eq!(titles(&diff.new_notices), vec!["Notice 6"]);
    }
}
