/// Configuration helpers. Every tunable of the service is an environment variable
/// with a sensible default, so the binary runs without any config file.
pub mod env {
    use std::str::FromStr;

    use log::warn;

    pub fn get_or<S: AsRef<str>>(key: &str, default: S) -> String {
        std::env::var(key).unwrap_or_else(|_| default.as_ref().to_owned())
    }

    /// Unparsable values fall back to `default` with a warning.
    pub fn get_parsed_or<T: FromStr>(key: &str, default: T) -> T {
        match std::env::var(key) {
            Ok(var) => match var.trim().parse::<T>() {
                Ok(value) => value,
                Err(_) => {
                    warn!("Ignoring invalid value '{var}' of {key}, using default");
                    default
                }
            },
            Err(_) => default,
        }
    }

}
