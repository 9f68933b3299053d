#![no_main]
use libfuzzer_sys::fuzz_target;
use parsers::parse_php;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(ast) = parse_php(s, "fuzz.php") {
            // Every lowered node must be reachable and carry a sane span.
            for node in ast.walk() {
                assert!(node.span.line >= 1);
                assert!(node.span.end_line >= node.span.line);
            }
        }
    }
});
