//! Timer-driven parts of the app: the cleanup sweep and the countdown
//! presenter

pub mod countdown;
pub mod sweeper;

pub use self::countdown::*;
pub use self::sweeper::*;
