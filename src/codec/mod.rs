pub mod reader;
pub mod writer;
pub mod types;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;
pub use types::*;
