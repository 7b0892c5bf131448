//! # Runtime Configuration Module
//!
//! Environment-driven knobs for the `may` coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `COURSEAPM_STACK_SIZE`
//!
//! Stack size for handler coroutines. Accepts decimal (`65536`) or hex
//! (`0x10000`). Default: `0x10000` (64 KB).
//!
//! Total virtual memory for stacks is roughly `stack_size × concurrent
//! coroutines`; too small a value overflows on deep handler call chains.
//!
//! ```rust
//! use courseapm::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

/// Default handler coroutine stack size (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable or zero values fall back to the default.
    pub fn from_env() -> Self {
        let stack_size = env::var("COURSEAPM_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

/// Parse a decimal or `0x`-prefixed hex byte count.
pub fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    parsed.filter(|size| *size > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!(parse_size("32768"), Some(32768));
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size(" 0X4000 "), Some(0x4000));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("0"), None);
        assert_eq!(parse_size("0xzz"), None);
    }
}
