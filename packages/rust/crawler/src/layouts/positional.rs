//! Positional layout: tables are picked by `tbody` index.
//!
//! Last resort when header text is missing or unrecognized.

use scraper::Html;

use super::rows::TBODY;
use super::{TableLayout, TableSet};

/// Minimum body count for the positional offsets to make sense.
const MIN_BODIES: usize = 4;
/// Pages with exactly this many bodies carry a special-supply table.
const BODIES_WITH_SPECIAL: usize = 6;

/// Legacy applyhome detail page, recognized by table-body count alone.
pub struct PositionalLayout;

impl TableLayout for PositionalLayout {
    fn name(&self) -> &'static str {
        "applyhome-positional-v1"
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<TableSet<'a>> {
        let bodies: Vec<_> = doc.select(&TBODY).collect();
        if bodies.len() < MIN_BODIES {
            return None;
        }

        if bodies.len() == BODIES_WITH_SPECIAL {
            Some(TableSet {
                supply: bodies[2],
                special: Some(bodies[3]),
                price: bodies[4],
            })
        } else {
            Some(TableSet {
                supply: bodies[2],
                special: None,
                price: bodies[3],
            })
        }
    }
}
