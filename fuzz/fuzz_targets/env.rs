#![no_main]
use libfuzzer_sys::fuzz_target;
use parsers::parse_env;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let env = parse_env(s, "fuzz.env");
        for entry in &env.entries {
            assert!(entry.line >= 1);
            assert!(!entry.key.is_empty());
        }
    }
});
