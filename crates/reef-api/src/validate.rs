use crate::error::{ApiError, ApiResult};
use crate::request::{Request, RequestType};

/// Admission check applied before a request is enqueued.
///
/// Rejection surfaces synchronously from `call`; nothing is dispatched.
pub trait RequestValidator: Send + Sync {
    fn validate(&self, request: &Request) -> ApiResult<()>;
}

/// The default validation rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardValidator;

impl RequestValidator for StandardValidator {
    fn validate(&self, request: &Request) -> ApiResult<()> {
        match request.request_type {
            RequestType::Noop => Err(ApiError::Validation("no-op request".into())),
            RequestType::Query => {
                let query = request
                    .query
                    .as_ref()
                    .ok_or_else(|| ApiError::Validation("query request without query".into()))?;
                query.validate()?;
                Ok(())
            }
            RequestType::Reflect => {
                request
                    .reflection
                    .ok_or_else(|| ApiError::Validation("reflect request without reflection".into()))?;
                Ok(())
            }
            RequestType::Replicate => {
                if request.replicate.is_empty() {
                    return Err(ApiError::Validation("replicate request without links".into()));
                }
                for link in &request.replicate {
                    if link.address().is_empty() {
                        return Err(ApiError::Validation("replicate link with empty address".into()));
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ReflectionType;
    use reef_crdt::{Address, Link};
    use reef_query::{Query, QuerySelect, RowJoin};

    fn validate(request: &Request) -> ApiResult<()> {
        StandardValidator.validate(request)
    }

    #[test]
    fn noop_is_rejected() {
        let err = validate(&Request::noop()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn valid_query_is_accepted() {
        let request = Request::query(Query::select("t", QuerySelect::default()));
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn malformed_query_is_rejected() {
        // Empty table key fails the query's own validation.
        let request = Request::query(Query::select("", QuerySelect::default()));
        assert!(validate(&request).is_err());

        // A join with no rows is malformed too.
        let request = Request::query(Query::join("t", vec![]));
        assert!(validate(&request).is_err());

        let ok = Request::query(Query::join(
            "t",
            vec![RowJoin {
                row_key: "r".into(),
                entries: Default::default(),
            }],
        ));
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn reflect_requires_reflection() {
        assert!(validate(&Request::reflect(ReflectionType::DumpNamespace)).is_ok());

        let request = Request {
            request_type: RequestType::Reflect,
            ..Request::default()
        };
        assert!(validate(&request).is_err());
    }

    #[test]
    fn replicate_link_checks() {
        let ok = Request::replicate(vec![Link::new(Address::new("a1"))]);
        assert!(validate(&ok).is_ok());

        let empty = Request::replicate(vec![]);
        assert!(validate(&empty).is_err());

        let blank = Request::replicate(vec![Link::new(Address::default())]);
        assert!(validate(&blank).is_err());
    }
}
