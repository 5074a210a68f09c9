pub mod domain;
pub mod error;
pub mod money;
pub mod repo;
pub mod repo_sqlite;

pub mod prelude {
    pub use crate::domain::*;
    pub use crate::error::{Error, Result};
}
