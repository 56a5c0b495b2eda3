#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use chrono::{Utc, SecondsFormat};

use log::{debug, LevelFilter};

use crate::middleware::chain::DevRequest;

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  The difference between
 * absolutize and standard canonicalize methods is that absolutize does not
 * care about whether the file exists and what the file really is.
 *
 * On any expansion or conversion error the original path is returned.
 */
pub fn get_absolute_path(path: &str) -> String {
    // Replace ~ and environment variable values if possible.
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ---------------------------------------------------------------------------
// get_project_root:
// ---------------------------------------------------------------------------
/** Turn a root directory string into the path the save endpoint confines
 * writes to.  Existing directories are canonicalized so that symlinked
 * roots compare correctly against canonicalized targets.
 */
pub fn get_project_root(dir: &str) -> PathBuf {
    let abs = PathBuf::from(get_absolute_path(dir));
    match abs.canonicalize() {
        Ok(p) => p,
        Err(_) => abs,
    }
}

// ---------------------------------------------------------------------------
// timestamp_str:
// ---------------------------------------------------------------------------
/** Get the current UTC timestamp as a string in rfc3339 format, which looks
 * like this:  2022-09-13T14:14:42.719849Z
 */
pub fn timestamp_str() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    type Req;
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump intercepted request information to the log.
pub fn debug_request(dev_req: &DevRequest, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    let level = log::max_level();
    if level < LevelFilter::Debug {
        return;
    }

    // Accumulate the output.
    let mut s = "\n".to_string();
    s += format!("  Method: {}\n", dev_req.method).as_str();
    s += format!("  Path: {}\n", dev_req.path).as_str();
    s += format!("  Body bytes: {}\n", dev_req.body.len()).as_str();

    // Add the request's information.
    s += req.get_request_info().as_str();

    // Write the single log record.
    debug!("{}", s);
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_removes_parent_segments() {
        let p = get_absolute_path("/tmp/a/../b");
        assert_eq!(p, "/tmp/b");
    }

    #[test]
    fn relative_path_becomes_absolute() {
        let p = get_absolute_path("some/dir");
        assert!(Path::new(&p).is_absolute());
        assert!(p.ends_with("some/dir"));
    }

    #[test]
    fn project_root_is_canonical_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let root = get_project_root(dir.path().to_str().unwrap());
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn timestamp_is_rfc3339_utc() {
        let ts = timestamp_str();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
