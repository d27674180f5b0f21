#![no_main]

use iotrace_compiler::compiled_trace::CompiledTrace;
use iotrace_compiler::systrace::SysTrace;
use iotrace_compiler::textcache::Catalog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsers and the decoder must return errors, never panic
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = Catalog::parse(input);
        let _ = SysTrace::parse(input);
    }
    let _ = CompiledTrace::decode(data);
});
