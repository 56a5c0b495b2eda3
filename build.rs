#![forbid(unsafe_code)]

// Build information is optional: a source tree without git still builds and
// reports "unknown" at runtime.
fn main() {
    if let Ok(branch) = build_data::get_git_branch() {
        println!("cargo:rustc-env=GIT_BRANCH={}", branch);
    }
    if let Ok(commit) = build_data::get_git_commit_short() {
        println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", commit);
    }
    if let Ok(dirty) = build_data::get_git_dirty() {
        println!("cargo:rustc-env=GIT_DIRTY={}", dirty);
    }
    if let Ok(rustc) = build_data::get_rustc_version() {
        println!("cargo:rustc-env=RUSTC_VERSION={}", rustc);
    }

    // Tells cargo not to rebuild build.rs during debug builds when other files change.
    // This speeds up development builds.
    //build_data::no_debug_rebuilds();
}
