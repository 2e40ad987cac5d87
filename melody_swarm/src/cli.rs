// Shared plumbing for the `aco` and `ga` binaries: logging setup, optional
// flag parsing, and seeding.
//
// Both binaries run with no arguments. `--seed N` fixes the random stream
// (the same seed always writes the same file) and `--output PATH` overrides
// the file name.

use melody_swarm_prng::MelodyRng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Install the `env_logger` backend, showing `info` and above unless
/// `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Value following `flag` in `args`, parsed as `T`.
pub fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// The `--seed` value, or one derived from the system clock.
pub fn seed_from_args(args: &[String]) -> u64 {
    parse_flag(args, "--seed").unwrap_or_else(clock_seed)
}

/// A seed from the current time. Falls back to 0 on a clock before 1970.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// The random stream for one run.
pub fn rng_from_args(args: &[String]) -> (MelodyRng, u64) {
    let seed = seed_from_args(args);
    (MelodyRng::new(seed), seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flag() {
        let a = args(&["ga", "--seed", "42", "--output", "out.mid"]);
        assert_eq!(parse_flag::<u64>(&a, "--seed"), Some(42));
        assert_eq!(parse_flag::<String>(&a, "--output").as_deref(), Some("out.mid"));
        assert_eq!(parse_flag::<u64>(&a, "--missing"), None);
    }

    #[test]
    fn test_unparseable_flag_is_none() {
        let a = args(&["aco", "--seed", "many"]);
        assert_eq!(parse_flag::<u64>(&a, "--seed"), None);
        let a = args(&["aco", "--seed"]);
        assert_eq!(parse_flag::<u64>(&a, "--seed"), None);
    }

    #[test]
    fn test_explicit_seed_is_reproducible() {
        let a = args(&["aco", "--seed", "9"]);
        let (mut first, seed) = rng_from_args(&a);
        let (mut second, _) = rng_from_args(&a);
        assert_eq!(seed, 9);
        assert_eq!(first.next_u64(), second.next_u64());
    }
}
