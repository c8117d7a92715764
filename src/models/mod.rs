//! Data models

mod billing;
mod invite;
mod membership;
mod organization;
mod project;
mod user;

pub use billing::*;
pub use invite::*;
pub use membership::*;
pub use organization::*;
pub use project::*;
pub use user::*;
