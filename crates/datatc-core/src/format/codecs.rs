use std::fs;
use std::path::Path;

use crate::data::Data;
use crate::error::DataError;
use crate::kwargs::Kwargs;

use super::registry::Codec;

fn wrong_payload(codec: &str, data: &Data) -> DataError {
    DataError::Codec(format!("{codec} codec cannot store {} payloads", data.kind()))
}

/// Plain UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    fn check_encoding(kwargs: &Kwargs) -> Result<(), DataError> {
        match kwargs.get_str("encoding") {
            None => Ok(()),
            Some(enc) if enc.eq_ignore_ascii_case("utf-8") || enc.eq_ignore_ascii_case("utf8") => {
                Ok(())
            }
            Some(enc) => Err(DataError::InvalidArgument {
                key: "encoding".into(),
                reason: format!("only utf-8 is supported, got '{enc}'"),
            }),
        }
    }
}

impl Codec for TextCodec {
    fn save(&self, data: &Data, path: &Path, kwargs: &Kwargs) -> Result<(), DataError> {
        Self::check_encoding(kwargs)?;
        let text = data.as_text().ok_or_else(|| wrong_payload("text", data))?;
        fs::write(path, text)?;
        Ok(())
    }

    fn load(&self, path: &Path, kwargs: &Kwargs) -> Result<Data, DataError> {
        Self::check_encoding(kwargs)?;
        Ok(Data::Text(fs::read_to_string(path)?))
    }
}

/// JSON documents. Pretty-printed unless `pretty = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn save(&self, data: &Data, path: &Path, kwargs: &Kwargs) -> Result<(), DataError> {
        let value = data.as_json().ok_or_else(|| wrong_payload("json", data))?;
        let bytes = if kwargs.get_or("pretty", true)? {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    fn load(&self, path: &Path, _kwargs: &Kwargs) -> Result<Data, DataError> {
        let bytes = fs::read(path)?;
        Ok(Data::Json(serde_json::from_slice(&bytes)?))
    }
}

/// Raw bytes, stored as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    fn save(&self, data: &Data, path: &Path, _kwargs: &Kwargs) -> Result<(), DataError> {
        let bytes = data.as_bytes().ok_or_else(|| wrong_payload("bytes", data))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn load(&self, path: &Path, _kwargs: &Kwargs) -> Result<Data, DataError> {
        Ok(Data::Bytes(fs::read(path)?))
    }
}
