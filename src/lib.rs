pub mod cli;
pub mod config;
pub mod error;
pub mod formats;
pub mod job;
pub mod packager;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod thumbnail;
pub mod util;

pub use error::{Error, Result};
pub use formats::{Engine, FileType, ThumbnailStrategy};
pub use job::{JobState, TranslationJob};
pub use pipeline::{JobOptions, Pipeline};
