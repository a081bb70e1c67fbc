use std::{env, error::Error, time};

use git2::Repository;

fn head_commit() -> Result<String, Box<dyn Error>> {
    let repo = Repository::discover(env::var("CARGO_MANIFEST_DIR")?)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

fn main() {
    if let Ok(hash) = head_commit() {
        println!("cargo::rustc-env=BUILD_COMMIT={}", hash);
    }
    let built_at = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .map(|x| x.as_secs())
        .unwrap_or_default();
    println!("cargo::rustc-env=BUILD_TIME={}", built_at);
    println!("cargo::rerun-if-changed=.git/HEAD");
}
