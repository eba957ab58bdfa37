use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // outside of a git checkout vergen falls back to placeholder values instead of failing
    EmitBuilder::builder()
        .git_describe(true, false, None)
        .emit()?;

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=src");
    Ok(())
}
