#![forbid(unsafe_code)]

pub mod prelude {
    pub use crate::errors::Error;
    pub use crate::user::{parse_actor_id, AccountId, ActorId, CommandScope, Role};
}

pub mod errors;
pub mod user;
