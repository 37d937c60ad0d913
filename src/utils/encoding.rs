use anyhow::{Context, Result, bail};
use roaring::RoaringBitmap;
use std::io::{self, Read, Write};

/// Serializes sets of integer ids (author ids, string ids) for storage.
///
/// The engine only ever goes through this interface, so the on-disk format
/// of id sets can change without touching build or query code.
pub trait IdSetCodec: Send + Sync {
    fn encode(&self, ids: &RoaringBitmap) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<RoaringBitmap>;
}

/// Sorted ids stored as LEB128 varint deltas. Compact for the small sets
/// typical of name buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaVarintCodec;

impl IdSetCodec for DeltaVarintCodec {
    fn encode(&self, ids: &RoaringBitmap) -> Result<Vec<u8>> {
        let values: Vec<u32> = ids.iter().collect();
        let mut buf = Vec::with_capacity(values.len() * 2);
        delta_encode(&values, &mut buf);
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RoaringBitmap> {
        let values = delta_decode(bytes)?;
        Ok(values.into_iter().collect())
    }
}

/// Roaring's portable serialization format
#[derive(Debug, Clone, Copy, Default)]
pub struct RoaringCodec;

impl IdSetCodec for RoaringCodec {
    fn encode(&self, ids: &RoaringBitmap) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(ids.serialized_size());
        ids.serialize_into(&mut buf)
            .context("Failed to serialize roaring id set")?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RoaringBitmap> {
        RoaringBitmap::deserialize_from(bytes).context("Corrupt roaring id set")
    }
}

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 32 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Delta-encode a sorted list of u32s
pub fn delta_encode(values: &[u32], buf: &mut Vec<u8>) {
    let mut prev = 0u32;
    for &value in values {
        encode_varint(value - prev, buf);
        prev = value;
    }
}

/// Delta-decode a list of u32s. Truncated input is an error, not a short list.
pub fn delta_decode(buf: &[u8]) -> Result<Vec<u32>> {
    let mut result = Vec::new();
    let mut prev = 0u32;
    let mut pos = 0;

    while pos < buf.len() {
        let Some((delta, consumed)) = decode_varint(&buf[pos..]) else {
            bail!("Truncated varint at byte {}", pos);
        };
        prev = prev
            .checked_add(delta)
            .context("Id set delta overflows u32")?;
        result.push(prev);
        pos += consumed;
    }

    Ok(result)
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u64 in little-endian format
pub fn read_u64_le<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write a length-prefixed byte string
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_u32_le(writer, bytes.len() as u32)?;
    writer.write_all(bytes)
}

/// Read a length-prefixed byte string. The buffer only grows as bytes
/// arrive, so a corrupt length cannot force a huge allocation.
pub fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u32_le(reader)? as usize;
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, found {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

/// Upfront capacity limit of [`read_bytes`]
const READ_CHUNK: usize = 64 * 1024;

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let bytes = read_bytes(reader)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let values = [0, 1, 127, 128, 16383, 16384, u32::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, consumed) = decode_varint(&buf).unwrap();
            assert_eq!(value, decoded);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_delta_decode_truncated() {
        // Continuation bit set on the last byte
        assert!(delta_decode(&[0x05, 0x80]).is_err());
        assert_eq!(delta_decode(&[]).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_codecs_agree() {
        let ids: RoaringBitmap = [3u32, 10, 20, 70_000, 4_000_000].into_iter().collect();
        let codecs: [&dyn IdSetCodec; 2] = [&DeltaVarintCodec, &RoaringCodec];
        for codec in codecs {
            let bytes = codec.encode(&ids).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), ids);
        }
    }

    #[test]
    fn test_roaring_codec_rejects_garbage() {
        assert!(RoaringCodec.decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_read_bytes_rejects_oversized_length() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, u32::MAX).unwrap();
        buf.extend_from_slice(b"ellis");
        let err = read_bytes(&mut std::io::Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_roaring_codec_encodes_empty() {
        let empty = RoaringBitmap::new();
        assert_eq!(RoaringCodec.decode(&RoaringCodec.encode(&empty).unwrap()).unwrap(), empty);
    }

    #[test]
    fn test_length_prefixed_strings() {
        let mut buf = Vec::new();
        write_bytes(&mut buf, "ellis, j".as_bytes()).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_string(&mut cursor).unwrap(), "ellis, j");
    }
}
