//! Application-level orchestration.
//!
//! `session` holds the pure interaction state machine; `controller` binds it
//! to a backend and a render target and runs the command loop UI layers talk to.

mod controller;
mod session;

pub use controller::InteractionController;
pub(crate) use controller::{run_controller, UiCommand};

#[cfg(test)]
pub(crate) use controller::tests as tests_support;
