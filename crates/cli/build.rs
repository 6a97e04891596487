use std::process::Command;

/// Run git in the workspace and return trimmed stdout, or `None` when git
/// is missing or the checkout is not a repository.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    // Commit for `crecon --version`, marked when built from uncommitted changes
    let commit = match git(&["rev-parse", "--short=7", "HEAD"]) {
        Some(hash) => match git(&["status", "--porcelain", "--untracked-files=no"]) {
            Some(changes) if !changes.is_empty() => format!("{hash}-dirty"),
            _ => hash,
        },
        None => "unknown".to_string(),
    };
    println!("cargo:rustc-env=GIT_COMMIT_HASH={commit}");

    for (var, key) in [("TARGET", "TARGET"), ("PROFILE", "CRECON_BUILD_PROFILE")] {
        let value = std::env::var(var).unwrap_or_else(|_| "unknown".to_string());
        println!("cargo:rustc-env={key}={value}");
    }
}
