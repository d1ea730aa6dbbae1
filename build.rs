use anyhow::Result;
use vergen::{vergen, Config};

fn main() -> Result<()> {
    // trigger recompilation when a new migration is added
    println!("cargo:rerun-if-changed=migrations");

    // Builds from a source archive have no git metadata; the Sentry release
    // name just falls back in that case.
    if let Err(error) = vergen(Config::default()) {
        println!("cargo:warning=vergen could not emit build metadata: {error}");
    }

    Ok(())
}
