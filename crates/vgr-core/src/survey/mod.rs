//! Offline tools for mapping the record format
//!
//! These never run in the decode path. They exist to find new headers and
//! action bytes in a corpus and to check candidates against ground truth:
//! - Header census over a replay (`header_census`)
//! - Credit action census and truth correlation (`credit_action_census`, `rank_actions`)
//! - Wildcard byte search with frame positions (`search`)

mod census;
mod search;

pub use census::{
    ActionCorrelation, ActionStats, HeaderCount, action_sums, credit_action_census,
    header_census, rank_actions,
};
pub use search::{SearchHit, search};
