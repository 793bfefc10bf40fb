use std::env;
use std::str::FromStr;
use tracing::warn;

/// Parses an environment variable, falling back to `default` when it is unset
/// or does not parse.
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable value '{}' for {}", value, var);
            default
        }),
        Err(_) => default,
    }
}

/// Accepts `1/0`, `true/false`, `yes/no` and `on/off` in any case.
pub fn get_env_var_as_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("Ignoring non-boolean value '{}' for {}", value, var);
                default
            }
        },
        Err(_) => default,
    }
}
