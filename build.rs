//! Stamps the binary with git state for `inkpress --version`:
//! `GIT_HASH` (short HEAD, empty outside a checkout) and `ON_RELEASE_TAG`
//! (whether HEAD is exactly a tag).

use std::process::{Command, Output};

fn git(args: &[&str]) -> Option<Output> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
}

fn main() {
    for watched in [".git/HEAD", ".git/refs/"] {
        println!("cargo:rerun-if-changed={watched}");
    }

    let hash = git(&["rev-parse", "--short", "HEAD"])
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_owned())
        .unwrap_or_default();
    let release = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    println!("cargo:rustc-env=GIT_HASH={hash}");
    println!("cargo:rustc-env=ON_RELEASE_TAG={release}");
}
