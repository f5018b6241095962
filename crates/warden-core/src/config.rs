/// Loads service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-cased env
/// vars (`database_url` ← `DATABASE_URL`). Use `#[serde(default = "...")]` for
/// optional settings.
pub trait Config: Sized + serde::de::DeserializeOwned {
    /// # Panics
    ///
    /// Panics if a required env var is missing or cannot be deserialized.
    fn from_env() -> Self {
        Self::try_from_env().expect("failed to load config from environment")
    }

    fn try_from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Load from an explicit set of key/value pairs. Used by tests.
    fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(pairs)
    }
}
