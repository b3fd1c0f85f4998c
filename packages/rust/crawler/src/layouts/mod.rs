//! Table layout strategies for announcement detail pages.
//!
//! A layout locates the supply, special-supply and price tables in a parsed
//! page. Layouts are named and version-tagged so a page-format change shows up
//! in logs and output as a different layout name rather than silently wrong data.

mod headers;
mod positional;
pub(crate) mod rows;

use scraper::{ElementRef, Html};

pub use headers::HeaderLayout;
pub use positional::PositionalLayout;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The table bodies a layout picked out of a page.
#[derive(Debug, Clone, Copy)]
pub struct TableSet<'a> {
    /// Per-unit-type supply counts; its last row is a totals row.
    pub supply: ElementRef<'a>,
    /// Per-category special-supply counts. Absent on some announcements.
    pub special: Option<ElementRef<'a>>,
    /// Highest listed price per unit type.
    pub price: ElementRef<'a>,
}

/// Strategy for locating the detail tables.
///
/// Layouts are tried in priority order; [`PositionalLayout`] is the last resort.
pub trait TableLayout: Send + Sync {
    /// Stable, version-tagged name (e.g. `applyhome-headers-v2`).
    fn name(&self) -> &'static str;

    /// Locate the tables, or `None` if this layout does not recognize the page.
    fn locate<'a>(&self, doc: &'a Html) -> Option<TableSet<'a>>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered layouts in priority order.
pub struct LayoutRegistry {
    layouts: Vec<Box<dyn TableLayout>>,
}

impl LayoutRegistry {
    /// Create a registry with the built-in layouts (header-driven first, positional last).
    pub fn new() -> Self {
        Self {
            layouts: vec![Box::new(HeaderLayout), Box::new(PositionalLayout)],
        }
    }

    /// Names of the registered layouts, in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.layouts.iter().map(|l| l.name()).collect()
    }

    /// Every layout that recognizes `doc`, in priority order.
    pub fn candidates<'a>(&self, doc: &'a Html) -> Vec<(&'static str, TableSet<'a>)> {
        self.layouts
            .iter()
            .filter_map(|layout| layout.locate(doc).map(|tables| (layout.name(), tables)))
            .collect()
    }

    /// Find the first layout that recognizes `doc`.
    pub fn locate<'a>(&self, doc: &'a Html) -> Option<(&'static str, TableSet<'a>)> {
        self.layouts
            .iter()
            .find_map(|layout| layout.locate(doc).map(|tables| (layout.name(), tables)))
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("layouts", &self.names())
            .finish()
    }
}

/// Number of `<tbody>` elements in the document.
pub fn table_body_count(doc: &Html) -> usize {
    doc.select(&rows::TBODY).count()
}
