//! Error utilities

/// Describes error reason
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    Timeout,
    /// Catch-all variant. Since this enum is non-exhaustive,
    /// it should be handled with `_` pattern
    Unknown,
}

/// Tries to classify k8s error
pub fn classify(error_reason: &str) -> ErrorClass {
    match error_reason {
        "NotFound" => ErrorClass::NotFound,
        "Forbidden" => ErrorClass::Forbidden,
        "Timeout" | "ServerTimeout" => ErrorClass::Timeout,
        _ => ErrorClass::Unknown,
    }
}

/// Tries to classify k8s error, wrapped in kube Error
pub fn classify_kube(error: &kube::Error) -> ErrorClass {
    match error {
        kube::Error::Api(api) => {
            // some servers leave reason empty on 404
            if api.code == 404 {
                return ErrorClass::NotFound;
            }
            classify(&api.reason)
        }
        _ => ErrorClass::Unknown,
    }
}
