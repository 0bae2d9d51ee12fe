pub mod config;
pub mod snippets;
pub mod types;

pub use config::Config;
pub use snippets::{BlogCategory, SnippetStore, SocialItem};
pub use types::{
    BlogIndexPage, BlogPage, GalleryImage, HomePage, ImageRef, PageContent, PageId, PageNode,
    PageRef, StandardPage, TagInfo,
};
