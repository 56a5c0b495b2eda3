#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

use crate::utils::blog_utils::timestamp_str;

// From cargo.toml and build.rs.
const BLOG_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");
const UNKNOWN: &str = "unknown";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion
{
    result_code: String,
    result_msg: String,
    blog_version: String,
    git_branch: String,
    git_commit: String,
    git_dirty: String,
    rustc_version: String,
    server_time: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/blog/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion::process())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespVersion {
    fn process() -> RespVersion {
        Self {result_code: "0".to_string(),
              result_msg: "success".to_string(),
              blog_version: BLOG_VERSION.unwrap_or(UNKNOWN).to_string(),
              git_branch: option_env!("GIT_BRANCH").unwrap_or(UNKNOWN).to_string(),
              git_commit: option_env!("GIT_COMMIT_SHORT").unwrap_or(UNKNOWN).to_string(),
              git_dirty: option_env!("GIT_DIRTY").unwrap_or(UNKNOWN).to_string(),
              rustc_version: option_env!("RUSTC_VERSION").unwrap_or(UNKNOWN).to_string(),
              server_time: timestamp_str(),
        }
    }
}
