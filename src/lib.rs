pub mod core;
pub mod models;
pub mod site;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::core::Engine;
pub use crate::models::{Config, PageContent, PageNode, SnippetStore};
pub use crate::site::{route_page, RouteOutcome, Site};
pub use crate::theme::renderer::ThemeRenderer;
