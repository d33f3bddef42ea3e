//! Build a static news site from a JSON list of articles: a home page, one
//! page per article, an RSS feed, and a stylesheet.

pub mod article;
pub mod feed;
pub mod html;
pub mod site;
pub mod text;

pub use site::{Config, Result, Site};
