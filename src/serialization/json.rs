//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 实现基于serde_json的序列化和反序列化，可选 gzip 压缩
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    compress: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的JSON序列化器，需要 `flate2` 特性，否则退化为不压缩
    pub fn with_compression() -> Self {
        Self { compress: true }
    }

    #[cfg(feature = "flate2")]
    fn compress(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder
            .write_all(&raw)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    #[cfg(not(feature = "flate2"))]
    fn compress(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        Ok(raw)
    }

    #[cfg(feature = "flate2")]
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let mut decoded = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut decoded)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(decoded)
    }

    #[cfg(not(feature = "flate2"))]
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        if self.compress {
            self.compress(json_bytes)
        } else {
            Ok(json_bytes)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let decoded;
        let json_bytes = if self.compress {
            decoded = self.decompress(data)?;
            decoded.as_slice()
        } else {
            data
        };
        serde_json::from_slice(json_bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
