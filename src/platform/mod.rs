//! Platform layer
//!
//! Browser glue for the sans-IO core: WebSocket driver, canvas pointer
//! listeners, the animation frame loop and auto-pause. Native builds have no
//! platform layer; they drive [`crate::Game`] directly.

#[cfg(target_arch = "wasm32")]
pub mod web;
