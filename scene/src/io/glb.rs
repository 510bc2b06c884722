//! GLB v2 container.

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"glTF";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
pub const CHUNK_JSON: u32 = 0x4E4F534A;
pub const CHUNK_BIN: u32 = 0x004E4942;

/// Chunks of a parsed GLB file.
#[derive(Debug)]
pub struct Glb<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Whether `bytes` start with the GLB magic.
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

/// Assemble a GLB file.
///
/// The JSON chunk is padded with spaces so the BIN chunk payload starts on an
/// 8-byte boundary of the file; the BIN payload is zero-padded to 8.
pub fn encode(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    // BIN payload starts at 28 + JSON length, so the JSON length is 4 mod 8.
    let mut json_len = json.len().next_multiple_of(4);
    if json_len % 8 != 4 {
        json_len += 4;
    }
    let bin_len = bin.map(|bin| bin.len().next_multiple_of(8));

    let total = HEADER_LEN
        + CHUNK_HEADER_LEN
        + json_len
        + bin_len.map_or(0, |len| CHUNK_HEADER_LEN + len);
    let mut glb = Vec::with_capacity(total);

    glb.extend_from_slice(MAGIC);
    glb.extend_from_slice(&VERSION.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());

    glb.extend_from_slice(&(json_len as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(json);
    glb.resize(glb.len() + json_len - json.len(), b' ');

    if let (Some(bin), Some(bin_len)) = (bin, bin_len) {
        glb.extend_from_slice(&(bin_len as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(bin);
        glb.resize(glb.len() + bin_len - bin.len(), 0);
    }

    glb
}

/// Split a GLB file into its JSON and BIN chunks. Unknown chunk types are
/// skipped.
pub fn parse(bytes: &[u8]) -> Result<Glb<'_>> {
    let malformed = |message: String| Error::MalformedDocument {
        entity: "glb",
        index: 0,
        message,
    };

    if bytes.len() < HEADER_LEN || !is_glb(bytes) {
        return Err(malformed("missing glTF header".into()));
    }
    let version = read_u32(bytes, 4);
    if version != VERSION {
        return Err(malformed(format!("unsupported container version {version}")));
    }
    let total = read_u32(bytes, 8) as usize;
    if total > bytes.len() {
        return Err(malformed(format!(
            "declared length {total} exceeds file size {}",
            bytes.len()
        )));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = HEADER_LEN;
    while offset + CHUNK_HEADER_LEN <= total {
        let len = read_u32(bytes, offset) as usize;
        let kind = read_u32(bytes, offset + 4);
        let start = offset + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= total)
            .ok_or_else(|| malformed(format!("chunk at {offset} is truncated")))?;
        let chunk = &bytes[start..end];
        match kind {
            CHUNK_JSON if json.is_none() => json = Some(chunk),
            CHUNK_BIN if bin.is_none() => bin = Some(chunk),
            _ => tracing::debug!(kind, len, "skipping GLB chunk"),
        }
        offset = end;
    }

    let json = json.ok_or_else(|| malformed("missing JSON chunk".into()))?;
    Ok(Glb { json, bin })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
