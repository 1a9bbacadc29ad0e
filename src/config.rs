use figment::providers::Env;
use figment::Figment;
use std::sync::OnceLock;

static CONFIG: OnceLock<Figment> = OnceLock::new();

pub fn get_config() -> &'static Figment {
    CONFIG.get_or_init(figment)
}

/// Configuration from environment variables starting with `MEDPROMPT_`.
pub(crate) fn figment() -> Figment {
    Figment::new()
        .merge(Env::prefixed("MEDPROMPT_").split("_"))
        .merge(Env::prefixed("MEDPROMPT_"))
}
