use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Read `key` and parse it, falling back to `default` when the variable is
/// unset or does not parse.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // SAFETY (all tests): env mutation is serialized through `#[serial]`.

    #[test]
    #[serial]
    fn environment_defaults_to_development() {
        unsafe { env::remove_var("ENVIRONMENT") };
        assert_eq!(Environment::from_env(), Environment::Development);
    }

    #[test]
    #[serial]
    fn environment_accepts_prod_alias() {
        unsafe { env::set_var("ENVIRONMENT", "PROD") };
        assert_eq!(Environment::from_env(), Environment::Production);
        unsafe { env::remove_var("ENVIRONMENT") };
    }

    #[test]
    #[serial]
    fn env_parse_falls_back_on_garbage() {
        unsafe { env::set_var("COMMON_TEST_NUMBER", "not-a-number") };
        assert_eq!(env_parse("COMMON_TEST_NUMBER", 42u32), 42);

        unsafe { env::set_var("COMMON_TEST_NUMBER", " 7 ") };
        assert_eq!(env_parse("COMMON_TEST_NUMBER", 42u32), 7);
        unsafe { env::remove_var("COMMON_TEST_NUMBER") };
    }

    #[test]
    #[serial]
    fn env_flag_variants() {
        unsafe { env::set_var("COMMON_TEST_FLAG", "off") };
        assert!(!env_flag("COMMON_TEST_FLAG", true));

        unsafe { env::set_var("COMMON_TEST_FLAG", "1") };
        assert!(env_flag("COMMON_TEST_FLAG", false));

        unsafe { env::set_var("COMMON_TEST_FLAG", "maybe") };
        assert!(env_flag("COMMON_TEST_FLAG", true));

        unsafe { env::remove_var("COMMON_TEST_FLAG") };
        assert!(!env_flag("COMMON_TEST_FLAG", false));
    }
}
