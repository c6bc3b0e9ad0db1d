use kube::core::ErrorResponse;

/// Message the apiserver returns when a write carries a stale resourceVersion.
pub const CONFLICT_MESSAGE: &str =
    "the object has been modified; please apply your changes to the latest version and try again";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kubernetes api error: {0}")]
    Kube(#[source] kube::Error),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid quantity {value:?} in {field}")]
    InvalidQuantity { field: String, value: String },
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    #[error("object has no {0}")]
    MissingField(&'static str),
    #[error("ChiaNetwork {namespace}/{name} not found")]
    NetworkNotFound { namespace: String, name: String },
}

impl Error {
    /// A stale-version write; the next reconcile will see the newer object.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(resp)) if resp.code == 404)
    }
}

fn is_conflict_response(resp: &ErrorResponse) -> bool {
    (resp.code == 409 && resp.reason == "Conflict") || resp.message.contains(CONFLICT_MESSAGE)
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if is_conflict_response(&resp) => Error::Conflict(resp.message),
            other => Error::Kube(other),
        }
    }
}

/// Builds the error shape the apiserver returns for a rejected request.
pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: message.into(),
        reason: reason.into(),
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_version_maps_to_conflict() {
        let message = format!("Operation cannot be fulfilled: {CONFLICT_MESSAGE}");
        let err: Error = api_error(409, "Conflict", message).into();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn conflict_message_alone_is_enough() {
        let err: Error = api_error(500, "InternalError", CONFLICT_MESSAGE).into();
        assert!(err.is_conflict());
    }

    #[test]
    fn already_exists_is_not_a_conflict() {
        let err: Error = api_error(409, "AlreadyExists", "services \"x\" already exists").into();
        assert!(!err.is_conflict());
    }

    #[test]
    fn not_found_is_classified() {
        let err: Error = api_error(404, "NotFound", "chianodes \"x\" not found").into();
        assert!(err.is_not_found());
    }
}
