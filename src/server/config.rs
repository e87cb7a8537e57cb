use serde::Deserialize;

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

/// Server configuration snapshot. The CLI deserializes this from
/// `gevulot.toml`; the distributor hands immutable copies to subscribers.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Local address to listen on for client connections, e.g.
    /// `0.0.0.0:4242`.
    pub listen: String,

    /// Connection URI of the proxied PostgreSQL server.
    pub database_url: String,
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_toml() {
        let config: Config = toml::from_str(
            r#"
                listen = "0.0.0.0:4242"
                database_url = "postgres://hired@localhost/hired_dev"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen, "0.0.0.0:4242");
        assert_eq!(config.database_url, "postgres://hired@localhost/hired_dev");
    }

    #[test]
    fn missing_key_is_an_error() {
        let result = toml::from_str::<Config>(r#"listen = "0.0.0.0:4242""#);

        assert!(result.is_err());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
