#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use log::{error, info, warn};
use path_absolutize::Absolutize;
use poem::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::middleware::chain::{DevHandler, DevRequest, DevResponse, HandlerOutcome};
use crate::utils::blog_utils::{self, RequestDebug};

// Messages returned to the caller.
const PATH_ESCAPE_MSG : &str = "Access to files outside the project directory is forbidden";
const SAVE_FAILED_MSG : &str = "Failed to save message data";

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SaveResult {
    Success { success: bool },
    Error { error: String },
}

#[derive(Debug, PartialEq)]
pub struct SaveResponse {
    pub status: StatusCode,
    pub result: SaveResult,
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("{}: request body is not a valid save request: {}", SAVE_FAILED_MSG, .0)]
    MalformedPayload(#[from] serde_json::Error),

    #[error("{}: {}", PATH_ESCAPE_MSG, .0)]
    PathEscape(String),

    #[error("{}: unable to write {}: {}", SAVE_FAILED_MSG, .path, .source)]
    WriteFailure {
        path: String,
        #[source]
        source: io::Error,
    },
}

// Implement the debug record trait for logging.
impl RequestDebug for SaveRequest {
    type Req = SaveRequest;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request body:");
        s.push_str("\n    filePath: ");
        s.push_str(&self.file_path);
        s.push_str("\n    content length: ");
        s.push_str(&self.content.len().to_string());
        s.push('\n');
        s
    }
}

impl SaveError {
    pub fn status(&self) -> StatusCode {
        match self {
            SaveError::PathEscape(_) => StatusCode::FORBIDDEN,
            SaveError::MalformedPayload(_) | SaveError::WriteFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl SaveResponse {
    fn success() -> Self {
        Self {status: StatusCode::OK, result: SaveResult::Success { success: true }}
    }

    /// The detail stays in the log; the caller only sees a fixed message.
    fn failure(e: &SaveError) -> Self {
        let msg = match e {
            SaveError::PathEscape(_) => PATH_ESCAPE_MSG,
            SaveError::MalformedPayload(_) | SaveError::WriteFailure { .. } => SAVE_FAILED_MSG,
        };
        Self {status: e.status(), result: SaveResult::Error { error: msg.to_string() }}
    }
}

impl From<SaveResponse> for DevResponse {
    fn from(resp: SaveResponse) -> Self {
        // Serializing these two shapes cannot fail.
        let body = serde_json::to_string(&resp.result)
            .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", SAVE_FAILED_MSG));
        DevResponse::new(resp.status, body)
    }
}

// ***************************************************************************
//                           SaveMessagesHandler
// ***************************************************************************
/** Intercepts POST requests to the save endpoint and writes the posted
 * content below the project root.  All other requests pass through.
 */
pub struct SaveMessagesHandler {
    project_root: PathBuf,
    endpoint: String,
}

impl SaveMessagesHandler {
    pub fn new(project_root: &Path, endpoint: &str) -> Self {
        Self {project_root: project_root.to_path_buf(), endpoint: endpoint.to_string()}
    }

    fn intercepts(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && path == self.endpoint
    }
}

impl DevHandler for SaveMessagesHandler {
    fn name(&self) -> &str {
        "save-messages"
    }

    fn wants(&self, method: &Method, path: &str) -> bool {
        self.intercepts(method, path)
    }

    fn handle<'a>(&'a self, req: &'a DevRequest) -> BoxFuture<'a, HandlerOutcome> {
        Box::pin(async move {
            if !self.intercepts(&req.method, &req.path) {
                return HandlerOutcome::NotHandled;
            }
            let resp = handle_save_request(&self.project_root, req).await;
            HandlerOutcome::Handled(resp.into())
        })
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// handle_save:
// ---------------------------------------------------------------------------
/** Parse a complete save request body, confine its target to the project
 * root and write the content.  Every outcome, including failures, becomes a
 * response; nothing is propagated to the caller.
 */
pub async fn handle_save(project_root: &Path, raw_body: &[u8]) -> SaveResponse {
    into_response(save(project_root, raw_body, None).await)
}

// ---------------------------------------------------------------------------
// resolve_within_root:
// ---------------------------------------------------------------------------
/** Resolve a caller supplied path against the project root.  The result must
 * be a descendant of the root both lexically and after following whatever
 * part of it already exists on disk.
 */
pub fn resolve_within_root(project_root: &Path, file_path: &str) -> Result<PathBuf, SaveError> {
    let escape = || SaveError::PathEscape(file_path.to_string());

    let resolved = Path::new(file_path)
        .absolutize_from(project_root)
        .map_err(|_| escape())?
        .into_owned();
    if !resolved.starts_with(project_root) {
        return Err(escape());
    }

    // Symlinks inside the root must not lead outside of it.  Links are not
    // followed while looking for the deepest existing entry, so a dangling
    // link is found here and fails to canonicalize.
    let canonical_root = project_root.canonicalize().unwrap_or_else(|_| project_root.to_path_buf());
    if let Some(ancestor) = resolved.ancestors().find(|p| p.symlink_metadata().is_ok()) {
        let canonical = ancestor.canonicalize().map_err(|_| escape())?;
        if !canonical.starts_with(&canonical_root) {
            return Err(escape());
        }
    }

    Ok(resolved)
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// handle_save_request:
// ---------------------------------------------------------------------------
async fn handle_save_request(project_root: &Path, req: &DevRequest) -> SaveResponse {
    into_response(save(project_root, &req.body, Some(req)).await)
}

// ---------------------------------------------------------------------------
// into_response:
// ---------------------------------------------------------------------------
fn into_response(result: Result<PathBuf, SaveError>) -> SaveResponse {
    match result {
        Ok(path) => {
            info!("Saved message data to {:?} at {}", path, blog_utils::timestamp_str());
            SaveResponse::success()
        },
        Err(e) => {
            match &e {
                SaveError::PathEscape(_) => warn!("{}", e),
                _ => error!("{}", e),
            }
            SaveResponse::failure(&e)
        },
    }
}

// ---------------------------------------------------------------------------
// save:
// ---------------------------------------------------------------------------
async fn save(project_root: &Path, raw_body: &[u8], dev_req: Option<&DevRequest>) -> Result<PathBuf, SaveError> {
    let req: SaveRequest = serde_json::from_slice(raw_body)?;
    if let Some(r) = dev_req {
        blog_utils::debug_request(r, &req);
    }

    let full_path = resolve_within_root(project_root, &req.file_path)?;
    let write_failure = |source: io::Error| SaveError::WriteFailure {
        path: full_path.to_string_lossy().to_string(),
        source,
    };

    // Make sure the directory exists.
    if let Some(dir) = full_path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(write_failure)?;
    }

    // Overwrite whatever is there.
    tokio::fs::write(&full_path, req.content.as_bytes()).await.map_err(write_failure)?;
    Ok(full_path)
}
