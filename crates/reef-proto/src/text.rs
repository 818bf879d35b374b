//! The human-readable text codec (JSON over canonical forms).

use serde::de::DeserializeOwned;
use serde::Serialize;

use reef_api::{Request, Response};
use reef_crdt::{Index, InvalidNamespaceEntry, Link, Namespace};
use reef_query::Query;

use crate::error::{ProtoError, ProtoResult};
use crate::CodecOptions;

fn to_text<T: Serialize>(value: &T) -> ProtoResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| ProtoError::Encode(e.to_string()))
}

fn from_text<T: DeserializeOwned>(text: &str) -> ProtoResult<T> {
    serde_json::from_str(text).map_err(|e| ProtoError::Decode(e.to_string()))
}

pub fn encode_namespace(
    namespace: &Namespace,
    options: &CodecOptions,
) -> ProtoResult<(String, Vec<InvalidNamespaceEntry>)> {
    let (stream, invalid) = namespace.stream_with_limit(options.max_point_size);
    Ok((to_text(&stream)?, invalid))
}

pub fn decode_namespace(text: &str) -> ProtoResult<Namespace> {
    let stream: Vec<reef_crdt::NamespaceStreamEntry> = from_text(text)?;
    Ok(Namespace::from_stream(&stream))
}

pub fn encode_index(index: &Index) -> ProtoResult<String> {
    to_text(&index.stream())
}

pub fn decode_index(text: &str) -> ProtoResult<Index> {
    let stream: Vec<reef_crdt::IndexStreamEntry> = from_text(text)?;
    Ok(Index::from_stream(&stream))
}

pub fn encode_link(link: &Link) -> ProtoResult<String> {
    to_text(link)
}

pub fn decode_link(text: &str) -> ProtoResult<Link> {
    from_text(text)
}

pub fn encode_query(query: &Query) -> ProtoResult<String> {
    to_text(query)
}

pub fn decode_query(text: &str) -> ProtoResult<Query> {
    from_text(text)
}

pub fn encode_request(request: &Request) -> ProtoResult<String> {
    to_text(request)
}

pub fn decode_request(text: &str) -> ProtoResult<Request> {
    from_text(text)
}

pub fn encode_response(response: &Response) -> ProtoResult<String> {
    to_text(response)
}

pub fn decode_response(text: &str) -> ProtoResult<Response> {
    from_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_api::{ApiError, ReflectionType, RequestType};
    use reef_crdt::{Address, Entry, Row, Table};
    use reef_query::QuerySelect;

    fn sample_namespace() -> Namespace {
        let row = Row::empty().join_entry("e", Entry::from_texts(["v1", "v2"]));
        Namespace::empty().join_table("t", Table::empty().join_row("r", row))
    }

    #[test]
    fn namespace_roundtrip() {
        let ns = sample_namespace();
        let (text, invalid) = encode_namespace(&ns, &CodecOptions::default()).unwrap();
        assert!(invalid.is_empty());
        assert_eq!(decode_namespace(&text).unwrap(), ns);
    }

    #[test]
    fn text_form_is_diagnosable() {
        let (text, _) = encode_namespace(&sample_namespace(), &CodecOptions::default()).unwrap();
        // Multi-line JSON naming the actual keys and values.
        assert!(text.lines().count() > 1);
        assert!(text.contains("\"table\""));
        assert!(text.contains("\"v1\""));
    }

    #[test]
    fn index_roundtrip() {
        let index = Index::empty().join_table("t", Link::new(Address::new("a1")));
        let text = encode_index(&index).unwrap();
        assert_eq!(decode_index(&text).unwrap(), index);
    }

    #[test]
    fn request_roundtrip() {
        for request in [
            Request::query(Query::select("t", QuerySelect::default())),
            Request::reflect(ReflectionType::DumpNamespace),
            Request::replicate(vec![Link::new(Address::new("a1"))]),
        ] {
            let text = encode_request(&request).unwrap();
            assert_eq!(decode_request(&text).unwrap(), request);
        }
    }

    #[test]
    fn response_roundtrip() {
        let ok = Response::ok(RequestType::Query).with_namespace(sample_namespace());
        let text = encode_response(&ok).unwrap();
        assert_eq!(decode_response(&text).unwrap(), ok);

        let fail = Response::error(RequestType::Query, &ApiError::QueueFull);
        let text = encode_response(&fail).unwrap();
        let decoded = decode_response(&text).unwrap();
        assert!(decoded.is_error());
        assert_eq!(decoded, fail);
    }

    #[test]
    fn binary_and_text_agree_on_value() {
        let ns = sample_namespace();
        let (text, _) = encode_namespace(&ns, &CodecOptions::default()).unwrap();
        let (bytes, _) = crate::binary::encode_namespace(&ns, &CodecOptions::default()).unwrap();
        assert_eq!(
            decode_namespace(&text).unwrap(),
            crate::binary::decode_namespace(&bytes).unwrap()
        );
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_request("not json at all").is_err());
    }
}
