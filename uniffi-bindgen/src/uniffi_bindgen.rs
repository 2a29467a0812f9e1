//! Generates Swift and Kotlin bindings from the compiled `vibekit` library.
//!
//! ```sh
//! cargo run -p uniffi-bindgen -- generate --library target/release/libvibekit.dylib \
//!     --language swift --out-dir swift/Sources/VibeKit
//! ```

fn main() {
    uniffi::uniffi_bindgen_main();
}
