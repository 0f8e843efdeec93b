//! Serializer implementations for the formats secretconf can read and write.
//! Each one maps global keys to top-level scalars and sections to one level of
//! nesting; anything deeper is rejected rather than flattened.

pub mod format;
pub mod ini;
pub mod json;
pub mod toml_format;

pub use format::Format;
pub use ini::IniSerializer;
pub use json::JsonSerializer;
pub use toml_format::TomlSerializer;
