//! The compact binary codec (bincode over canonical forms).

use serde::de::DeserializeOwned;
use serde::Serialize;

use reef_api::{Request, Response};
use reef_crdt::{Index, InvalidNamespaceEntry, Link, Namespace};
use reef_query::Query;

use crate::error::{ProtoError, ProtoResult};
use crate::CodecOptions;

fn to_bytes<T: Serialize>(value: &T) -> ProtoResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| ProtoError::Encode(e.to_string()))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> ProtoResult<T> {
    bincode::deserialize(bytes).map_err(|e| ProtoError::Decode(e.to_string()))
}

/// Encode a namespace through its sorted stream form.
///
/// Oversized points are separated and reported, never fatal.
pub fn encode_namespace(
    namespace: &Namespace,
    options: &CodecOptions,
) -> ProtoResult<(Vec<u8>, Vec<InvalidNamespaceEntry>)> {
    let (stream, invalid) = namespace.stream_with_limit(options.max_point_size);
    Ok((to_bytes(&stream)?, invalid))
}

pub fn decode_namespace(bytes: &[u8]) -> ProtoResult<Namespace> {
    let stream: Vec<reef_crdt::NamespaceStreamEntry> = from_bytes(bytes)?;
    Ok(Namespace::from_stream(&stream))
}

pub fn encode_index(index: &Index) -> ProtoResult<Vec<u8>> {
    to_bytes(&index.stream())
}

pub fn decode_index(bytes: &[u8]) -> ProtoResult<Index> {
    let stream: Vec<reef_crdt::IndexStreamEntry> = from_bytes(bytes)?;
    Ok(Index::from_stream(&stream))
}

pub fn encode_link(link: &Link) -> ProtoResult<Vec<u8>> {
    to_bytes(link)
}

pub fn decode_link(bytes: &[u8]) -> ProtoResult<Link> {
    from_bytes(bytes)
}

pub fn encode_query(query: &Query) -> ProtoResult<Vec<u8>> {
    to_bytes(query)
}

pub fn decode_query(bytes: &[u8]) -> ProtoResult<Query> {
    from_bytes(bytes)
}

pub fn encode_request(request: &Request) -> ProtoResult<Vec<u8>> {
    to_bytes(request)
}

pub fn decode_request(bytes: &[u8]) -> ProtoResult<Request> {
    from_bytes(bytes)
}

pub fn encode_response(response: &Response) -> ProtoResult<Vec<u8>> {
    to_bytes(response)
}

pub fn decode_response(bytes: &[u8]) -> ProtoResult<Response> {
    from_bytes(bytes)
}
