pub mod catalog;
pub mod common;
pub mod config;
pub mod datafiles;
pub mod directives;
pub mod error;
pub mod id3tags;
pub mod listing;
pub mod musicbrainz;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod scope;

pub use error::{Result, TagsortError, TagsortExpectedError};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod normalize_test;
#[cfg(test)]
mod resolver_test;
