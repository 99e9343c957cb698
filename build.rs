//! Retrieves information about the version of the crate from Git and the build
//! environment. `shadow-rs` writes it to the output directory and the binary
//! prints it on startup.

fn main() -> shadow_rs::SdResult<()> {
    shadow_rs::new()
}
