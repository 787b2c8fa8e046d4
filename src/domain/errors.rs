/// Fatal failures from the terminology server and repository APIs.
///
/// Each variant carries enough context (status, URL, body) that callers never
/// need to inspect message strings to tell the failure classes apart.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("failed to obtain token: {status} ({url}): {body}")]
    AuthFailure {
        status: u16,
        url: String,
        body: String,
    },
    #[error("lookup failed: {status} {reason} ({url}): {body}")]
    LookupFailure {
        status: u16,
        reason: String,
        url: String,
        body: String,
    },
    #[error("failed to fetch directory listing: {status} {reason} ({url}): {body}")]
    DirectoryFetchFailure {
        status: u16,
        reason: String,
        url: String,
        body: String,
    },
}
