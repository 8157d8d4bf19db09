use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Path stem of the optional per-environment configuration file,
    /// e.g. `config/development`.
    #[must_use]
    pub fn config_file(&self) -> String {
        format!("config/{self}")
    }
}
