//! `ping_shared`
//!
//! Core of the speed-ping latency game, independent of any front end.
//!
//! Design goals:
//! - Game rules as a pure transition function over an explicit state enum.
//! - Collaborators (probe, feedback, view, storage) injected behind traits.
//! - Timers owned by the controller and cancelled on every reset.
//! - No `unsafe`.

pub mod config;
pub mod feedback;
pub mod game;
pub mod probe;
pub mod ranking;
pub mod storage;
pub mod timer;
pub mod ui;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::feedback::*;
    pub use crate::game::*;
    pub use crate::probe::*;
    pub use crate::ranking::*;
    pub use crate::storage::*;
    pub use crate::ui::*;
}
