//! Title metadata from Korean Wikipedia article infoboxes.
pub mod infobox;
pub mod provider;

pub use provider::WikipediaProvider;
