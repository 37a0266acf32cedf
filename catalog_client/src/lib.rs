pub use crate::graphql::*;
pub use crate::root::*;

mod graphql;
mod root;
