//! Document store access.

pub mod blocks;
pub mod client;

pub use blocks::{Annotations, Block, BlockContent, EmptyObject, RichText, TextBody, TextContent};
pub use client::{MAX_CHILDREN_PER_REQUEST, NotionClient, Page, PageBatch, Parent};
