//! Domain types and client-independent logic for the small-business site
//! dashboard: entities and the backend resource map, SEO form rules, the
//! content-agent workflow, the image pipeline and cache invalidation events.

pub mod content;
pub mod context;
pub mod events;
pub mod form;
pub mod media;
pub mod model;
