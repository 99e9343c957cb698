//! Chess rules engine for two human players sharing a terminal. For more
//! information, see `README.md` in the repository root.
//!
//! The [`chess`] module holds the whole engine: [`chess::game::Game`] is the
//! entry point that accepts moves, tracks clocks and reports the outcome of
//! the game.

// Rustdoc lints.
#![warn(
    rustdoc::missing_crate_level_docs,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::bare_urls
)]

pub mod chess;

use shadow_rs::shadow;

shadow!(build);

/// Returns the full version that can be used to identify how the binary was
/// built in the first place.
#[must_use]
pub fn engine_version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints information about the version and build type on startup.
pub fn print_engine_info() {
    println!("Kingside chess {}", engine_version());
    println!("Release build: {}", !shadow_rs::is_debug());
    println!();
}
