//! Binary encoding of cached asset nodes.
//!
//! # Layout
//!
//! ```text
//! u16 node_count
//! node_count x:
//!   str asset_id
//!   u16 resolver_count
//!   resolver_count x:
//!     i64 timestamp
//!     str resolver_id
//!     u16 dependency_count
//!     dependency_count x:
//!       str target_id
//!       str connection_type
//!       str target_node_type
//!       u16 path_length
//!       path_length x:
//!         str segment_name
//!         u8  segment_kind
//! str EOF_MARKER
//! ```
//!
//! `str` is a u16 byte length followed by UTF-8 bytes. All multi-byte
//! integers are **little-endian**.
//!
//! The trailing marker is the only integrity check. Anything after it is
//! ignored. There is no version field; the format version is carried by the
//! cache file name instead.

use crate::error::{StorageError, StorageResult};
use depcache_core::limits::{validate_asset_id, MAX_COUNT_PER_LEVEL};
use depcache_core::{AssetNode, Dependency, PathSegment, PathSegmentKind, ResolverData};

/// Marker written after the last node
pub const EOF_MARKER: &str = "EndOfSerializedAssetDependencyCache";

/// Bump when the layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Largest count or string length one u16 prefix can hold
pub const MAX_PREFIXED: usize = MAX_COUNT_PER_LEVEL;

const INITIAL_CAPACITY: usize = 64 * 1024;

/// Growable output buffer
///
/// The backing buffer doubles whenever a write would overflow it, so encoding
/// stays linear in the number of fields.
#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    len: usize,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            len: 0,
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing buffer
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed <= self.buf.len() {
            return;
        }
        let mut capacity = self.buf.len();
        while capacity < needed {
            capacity *= 2;
        }
        self.buf.resize(capacity, 0);
    }

    fn put(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    pub fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    /// Write a u16 count, failing if it does not fit
    pub fn write_count(&mut self, what: &'static str, count: usize) -> StorageResult<()> {
        let count = prefix(what, count)?;
        self.write_u16(count);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_str(&mut self, what: &'static str, value: &str) -> StorageResult<()> {
        let bytes = value.as_bytes();
        let len = prefix(what, bytes.len())?;
        self.reserve(2 + bytes.len());
        self.write_u16(len);
        self.put(bytes);
        Ok(())
    }

    /// Finish writing, dropping unused capacity
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

fn prefix(what: &'static str, count: usize) -> StorageResult<u16> {
    u16::try_from(count).map_err(|_| StorageError::FormatLimitExceeded {
        what,
        count,
        max: MAX_PREFIXED,
    })
}

/// Bounds-checked reader over an encoded buffer
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, n: usize) -> StorageResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(StorageError::CorruptCache(format!(
                "unexpected end of data at byte {} (need {}, have {})",
                self.offset,
                n,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> StorageResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> StorageResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i64(&mut self) -> StorageResult<i64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(b))
    }

    /// Raw bytes of a length-prefixed string
    pub fn read_str_bytes(&mut self) -> StorageResult<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> StorageResult<String> {
        let at = self.offset;
        let bytes = self.read_str_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StorageError::CorruptCache(format!("invalid UTF-8 at byte {}: {}", at, e)))
    }
}

/// Encode nodes in the order given
pub fn encode(nodes: &[AssetNode]) -> StorageResult<Vec<u8>> {
    let mut w = ByteWriter::new();

    w.write_count("nodes", nodes.len())?;
    for node in nodes {
        validate_asset_id(&node.asset_id).map_err(depcache_core::Error::from)?;
        w.write_str("asset id bytes", &node.asset_id)?;
        w.write_count("resolver datas", node.resolver_datas.len())?;

        for data in &node.resolver_datas {
            w.write_i64(data.timestamp);
            w.write_str("resolver id bytes", &data.resolver_id)?;
            w.write_count("dependencies", data.dependencies.len())?;

            for dependency in &data.dependencies {
                w.write_str("target id bytes", &dependency.target_id)?;
                w.write_str("connection type bytes", &dependency.connection_type)?;
                w.write_str("node type bytes", &dependency.target_node_type)?;
                w.write_count("path segments", dependency.path.len())?;

                for segment in &dependency.path {
                    w.write_str("segment name bytes", &segment.name)?;
                    w.write_u8(segment.kind.as_byte());
                }
            }
        }
    }
    w.write_str("end marker bytes", EOF_MARKER)?;

    tracing::debug!("Encoded {} nodes into {} bytes", nodes.len(), w.len());
    Ok(w.into_bytes())
}

/// Decode nodes, reporting why a buffer is unusable
pub fn try_decode(bytes: &[u8]) -> StorageResult<Vec<AssetNode>> {
    let mut r = ByteReader::new(bytes);

    let node_count = r.read_u16()? as usize;
    let mut nodes = Vec::with_capacity(node_count);

    for _ in 0..node_count {
        let mut node = AssetNode::new(r.read_string()?);
        let resolver_count = r.read_u16()? as usize;

        for _ in 0..resolver_count {
            let timestamp = r.read_i64()?;
            let resolver_id = r.read_string()?;
            let dependency_count = r.read_u16()? as usize;
            let mut dependencies = Vec::with_capacity(dependency_count);

            for _ in 0..dependency_count {
                let target_id = r.read_string()?;
                let connection_type = r.read_string()?;
                let target_node_type = r.read_string()?;
                let path_length = r.read_u16()? as usize;
                let mut path = Vec::with_capacity(path_length);

                for _ in 0..path_length {
                    let name = r.read_string()?;
                    let at = r.position();
                    let byte = r.read_u8()?;
                    let kind = PathSegmentKind::from_byte(byte).ok_or_else(|| {
                        StorageError::CorruptCache(format!(
                            "unknown path segment kind {} at byte {}",
                            byte, at
                        ))
                    })?;
                    path.push(PathSegment::new(name, kind));
                }

                dependencies.push(Dependency::new(
                    target_id,
                    connection_type,
                    target_node_type,
                    path,
                ));
            }

            node.push_resolver_data(
                ResolverData::new(resolver_id, timestamp).with_dependencies(dependencies),
            );
        }

        nodes.push(node);
    }

    let at = r.position();
    if r.read_str_bytes()? != EOF_MARKER.as_bytes() {
        return Err(StorageError::CorruptCache(format!(
            "end marker mismatch at byte {}",
            at
        )));
    }

    tracing::debug!("Decoded {} nodes from {} bytes", nodes.len(), r.position());
    Ok(nodes)
}

/// Decode nodes, falling back to an empty collection when the buffer is
/// corrupt. An empty result means the cache must be rebuilt.
pub fn decode(bytes: &[u8]) -> Vec<AssetNode> {
    match try_decode(bytes) {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::error!("Dependency cache is corrupted, a rebuild is required: {}", e);
            Vec::new()
        }
    }
}
