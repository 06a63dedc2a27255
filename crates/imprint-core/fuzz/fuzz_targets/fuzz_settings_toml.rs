//! Fuzz test for settings parsing
//!
//! Any TOML that parses must survive a save/parse round trip unchanged.

#![no_main]

use imprint_core::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(settings) = Settings::from_toml(text) {
        let dir = std::env::temp_dir().join(format!("imprint-fuzz-{}", std::process::id()));
        let path = dir.join("imprint_config.toml");
        if settings.save_to_path(Some(path.clone())).is_ok() {
            assert_eq!(Settings::load_from_path(Some(path)), settings);
        }
    }
});
