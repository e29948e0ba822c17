pub mod codecs;
pub mod csv;
pub mod registry;

pub use codecs::{BytesCodec, JsonCodec, TextCodec};
pub use csv::CsvCodec;
pub use registry::{extension_token, normalize_token, Codec, FormatRegistry};
