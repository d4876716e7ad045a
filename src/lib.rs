pub mod cache;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod lifter;
pub mod node;
pub mod schema;
pub mod string_table;
pub mod template;
pub mod walker;

pub use driver::{compress_document, CompressorOptions};
pub use error::{CompressError, Result};
pub use node::NodeRef;
