//! Product card composition: template descriptors, the bitmap renderer
//! and the async builder that ties photo fetching, rendering and file
//! output together.

pub mod builder;
pub mod render;
pub mod template;

pub use builder::{CardBuilder, CardError};
pub use template::{TemplateNotFound, TemplateStyle};
