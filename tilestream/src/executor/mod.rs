//! Async plumbing for the frame loop.
//!
//! - [`Spawner`]: runs fetch futures off the frame loop
//! - [`Mailbox`]: carries their results back, drained once per frame

mod mailbox;
mod spawner;

pub use mailbox::Mailbox;
pub use spawner::{ManualSpawner, Spawner, TokioSpawner};
