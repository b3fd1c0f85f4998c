//! Pipeline orchestration and report logic for Cheongyak.
//!
//! This crate ties together listing fetch, detail parsing, price aggregation
//! and transaction lookup into end-to-end workflows (e.g., [`pipeline::run`]).

pub mod assembler;
pub mod pipeline;
pub mod pricing;
pub mod render;
pub mod schedule;

pub use assembler::{Comparison, SubscriptionReport, assemble};
pub use pipeline::{
    Pipeline, PipelineOutcome, ProgressReporter, SilentProgress, SkippedItem, run,
};
pub use pricing::average_price_per_pyeong;
pub use render::render_text;
pub use schedule::{ScheduleEvent, ScheduleKind, TIME_ZONE, schedule_events};
