//! # Core Widget Logic
//!
//! This module contains the support widget's session state machine.
//! It knows nothing about the network, timers, or any rendering technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • Session (state)      │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • render() (view)      │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │ Effects
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │ Transport  │      │  Services  │      │   Host     │
//!     │ (chat SSE) │      │ (questions,│      │ (terminal, │
//!     │            │      │  analytics)│      │  future)   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `Session` struct — all widget state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`view`]: Presentation snapshot derived from `Session`
//! - [`transcript`], [`feedback`], [`schedule`], [`suggestions`]: the pieces
//!   `Session` is built from

pub mod action;
pub mod config;
pub mod feedback;
pub mod identity;
pub mod intent;
pub mod schedule;
pub mod state;
pub mod suggestions;
pub mod timer;
pub mod transcript;
pub mod view;

pub use action::{Action, Effect, update};
pub use state::Session;
