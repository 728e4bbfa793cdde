//! `ping_client`
//!
//! Terminal front end for speed-ping:
//! - Argument parsing into a `GameConfig`
//! - Console command parsing and dispatch
//! - Text rendering of the intro, game and result screens
//! - Terminal bell / particle feedback

pub mod args;
pub mod feedback;
pub mod input;
pub mod view;

pub use feedback::TerminalFeedback;
pub use view::TerminalView;
