//! Program counter to symbol resolution

use std::ffi::c_void;

/// Parse a `+`-separated list of hexadecimal addresses
///
/// Accepts the `0x` prefix and surrounding whitespace. Entries that do not
/// parse are skipped.
pub fn parse_addresses(input: &str) -> Vec<u64> {
    input
        .split('+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(digits, 16).ok()
        })
        .collect()
}

/// Resolve an address in this process to its demangled symbol name
pub fn resolve_symbol(addr: u64) -> Option<String> {
    let mut name = None;
    backtrace::resolve(addr as usize as *mut c_void, |symbol| {
        if name.is_none() {
            name = symbol.name().map(|n| n.to_string());
        }
    });
    name
}
