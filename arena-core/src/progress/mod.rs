// ============================================================================
// arena-core/src/progress/mod.rs
// ============================================================================
//
// STAGE PROGRESS: Multi-stage progress model for engine runs
//
// The tracker turns the engine's progress events into a small state machine
// (pending -> in progress -> completed/failed per stage) and pushes every
// change to a renderer supplied by the front-end.
//
// KEY COMPONENTS:
// - Stage / StageStatus / StageDefinition: the data model
// - StageTracker: state machine and transition rules
// - StageRenderer: trait implemented by terminal front-ends
// - render: plain-text helpers (icons, compact bars, elapsed time)
//
// AI-ASSISTANT-INFO: Stage tracker state machine and rendering hooks

pub mod render;
pub mod stage;
pub mod tracker;

pub use stage::{Stage, StageDefinition, StageStatus, default_stages, format_stages};
pub use tracker::{NullStageRenderer, RunSummary, StageRenderer, StageTracker};
