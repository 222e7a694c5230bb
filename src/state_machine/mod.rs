//! # State Machine Data Model
//!
//! The persisted aggregate that one pipeline run is modeled as: a
//! [`FiniteStateMachine`] owning [`State`]s and [`Transition`]s, where each
//! state owns the [`Task`]s executed on the batch scheduler. The engine in
//! [`crate::engine`] mutates this aggregate in place, one tick at a time.

pub mod machine;
pub mod state;
pub mod status;
pub mod task;
pub mod transition;

pub use machine::FiniteStateMachine;
pub use state::State;
pub use status::Status;
pub use task::Task;
pub use transition::Transition;
