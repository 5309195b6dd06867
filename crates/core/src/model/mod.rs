pub mod entities;
pub mod resource;

pub use entities::*;
pub use resource::{Resource, SingularLookup};
