//! Canonical node encoding.
//!
//! Nodes are encoded as dag-pb protobuf messages:
//!
//! ```text
//! PBLink { Hash = 1: bytes, Name = 2: string, Tsize = 3: uint64 }
//! PBNode { Links = 2: repeated PBLink, Data = 1: bytes }
//! ```
//!
//! Links are written before the payload, in the order given, and every link
//! field is always present. The payload field is written only when present.
//! Decoding is strict: unknown fields, wrong wire types, and repeated scalar
//! fields are all rejected.

use mdag_types::varint::{decode_varint, encode_varint, encoded_len};
use mdag_types::Multihash;

use crate::error::{DagError, DagResult};
use crate::link::Link;

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

const NODE_DATA: u64 = 1;
const NODE_LINKS: u64 = 2;

const LINK_HASH: u64 = 1;
const LINK_NAME: u64 = 2;
const LINK_TSIZE: u64 = 3;

/// A node's fields as read from the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedNode {
    /// `None` when the payload field was absent.
    pub payload: Option<Vec<u8>>,
    /// Links in wire order.
    pub links: Vec<Link>,
}

/// Encode a payload and links into canonical bytes.
pub fn encode_node(payload: Option<&[u8]>, links: &[Link]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_node_len(payload, links));
    for link in links {
        let body = encoded_link_len(link);
        write_key(&mut out, NODE_LINKS, WIRE_LEN);
        encode_varint(&mut out, body as u64);
        write_bytes_field(&mut out, LINK_HASH, link.digest().as_bytes());
        write_bytes_field(&mut out, LINK_NAME, link.name().as_bytes());
        write_key(&mut out, LINK_TSIZE, WIRE_VARINT);
        encode_varint(&mut out, link.size());
    }
    if let Some(payload) = payload {
        write_bytes_field(&mut out, NODE_DATA, payload);
    }
    out
}

/// Decode canonical bytes into a payload and links.
pub fn decode_node(data: &[u8]) -> DagResult<DecodedNode> {
    let mut reader = Reader::new(data);
    let mut payload = None;
    let mut links = Vec::new();

    while !reader.is_empty() {
        let (field, wire) = reader.key()?;
        match (field, wire) {
            (NODE_DATA, WIRE_LEN) => {
                if payload.is_some() {
                    return Err(corrupt("payload field repeated"));
                }
                payload = Some(reader.bytes()?.to_vec());
            }
            (NODE_LINKS, WIRE_LEN) => links.push(decode_link(reader.bytes()?)?),
            _ => return Err(corrupt(format!("unexpected node field {field} (wire type {wire})"))),
        }
    }

    Ok(DecodedNode { payload, links })
}

fn decode_link(data: &[u8]) -> DagResult<Link> {
    let mut reader = Reader::new(data);
    let mut digest = None;
    let mut name = None;
    let mut size = None;

    while !reader.is_empty() {
        let (field, wire) = reader.key()?;
        match (field, wire) {
            (LINK_HASH, WIRE_LEN) if digest.is_none() => {
                let bytes = reader.bytes()?;
                let mh = Multihash::from_bytes(bytes)
                    .map_err(|e| corrupt(format!("link hash: {e}")))?;
                digest = Some(mh);
            }
            (LINK_NAME, WIRE_LEN) if name.is_none() => {
                let bytes = reader.bytes()?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| corrupt(format!("link name: {e}")))?;
                name = Some(text.to_string());
            }
            (LINK_TSIZE, WIRE_VARINT) if size.is_none() => size = Some(reader.varint()?),
            _ => return Err(corrupt(format!("unexpected link field {field} (wire type {wire})"))),
        }
    }

    let digest = digest.ok_or_else(|| corrupt("link without hash"))?;
    Ok(Link::new(name.unwrap_or_default(), size.unwrap_or(0), digest))
}

fn encoded_link_len(link: &Link) -> usize {
    bytes_field_len(LINK_HASH, link.digest().as_bytes().len())
        + bytes_field_len(LINK_NAME, link.name().len())
        + encoded_len((LINK_TSIZE << 3) | WIRE_VARINT)
        + encoded_len(link.size())
}

fn encoded_node_len(payload: Option<&[u8]>, links: &[Link]) -> usize {
    let links: usize = links
        .iter()
        .map(|link| bytes_field_len(NODE_LINKS, encoded_link_len(link)))
        .sum();
    links + payload.map_or(0, |p| bytes_field_len(NODE_DATA, p.len()))
}

fn bytes_field_len(field: u64, len: usize) -> usize {
    encoded_len((field << 3) | WIRE_LEN) + encoded_len(len as u64) + len
}

fn write_key(out: &mut Vec<u8>, field: u64, wire: u64) {
    encode_varint(out, (field << 3) | wire);
}

fn write_bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    write_key(out, field, WIRE_LEN);
    encode_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn corrupt(reason: impl Into<String>) -> DagError {
    DagError::CorruptEncoding(reason.into())
}

/// Cursor over a protobuf message.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn varint(&mut self) -> DagResult<u64> {
        let (value, read) = decode_varint(&self.data[self.pos..])
            .map_err(|e| corrupt(format!("varint at offset {}: {e}", self.pos)))?;
        self.pos += read;
        Ok(value)
    }

    fn key(&mut self) -> DagResult<(u64, u64)> {
        let key = self.varint()?;
        Ok((key >> 3, key & 0x7))
    }

    fn bytes(&mut self) -> DagResult<&'a [u8]> {
        let len = self.varint()?;
        let remaining = self.data.len() - self.pos;
        if len > remaining as u64 {
            return Err(corrupt(format!(
                "field length {len} exceeds remaining {remaining} bytes"
            )));
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.data[start..self.pos])
    }
}
