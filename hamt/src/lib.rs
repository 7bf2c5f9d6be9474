#![doc = include_str!("../README.md")]

mod builder;
mod format;
mod reader;
mod value;

pub use builder::Builder;
pub use format::Error;
pub use reader::Reader;
pub use value::FixedWidthValue;
