//! Controller layer: UI events, toast bookkeeping, and command orchestration.

pub mod events;
pub mod orchestration;
pub mod toasts;
