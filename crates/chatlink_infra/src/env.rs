use std::path::{Path, PathBuf};
use std::str::FromStr;

use chatlink_domain::LinkifyConfig;
use tracing::debug;

const PRECEDING_WINDOW: &str = "CHATLINK_PRECEDING_WINDOW";
const TRAILING_WINDOW: &str = "CHATLINK_TRAILING_WINDOW";
const TRAILING_FLUSH_CHARS: &str = "CHATLINK_TRAILING_FLUSH_CHARS";
const SCHEME: &str = "CHATLINK_SCHEME";

/// Resolves the linkifier configuration from the process environment.
#[derive(Debug, Clone)]
pub struct ChatlinkEnvironment {
    cwd: PathBuf,
}

impl ChatlinkEnvironment {
    /// Creates the environment for `cwd`, loading every `.env` file between
    /// the filesystem root and `cwd` first.
    pub fn new(cwd: PathBuf) -> Self {
        Self::dot_env(&cwd);
        Self { cwd }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Builds a [`LinkifyConfig`] from `CHATLINK_*` variables. Missing or
    /// invalid values keep their defaults.
    pub fn get(&self) -> LinkifyConfig {
        let mut config = LinkifyConfig::default();

        if let Some(parsed) = parse_env::<usize>(PRECEDING_WINDOW) {
            config.preceding_window = parsed;
        }
        if let Some(parsed) = parse_env::<usize>(TRAILING_WINDOW) {
            config.trailing_window = parsed;
        }
        if let Some(parsed) = parse_env::<usize>(TRAILING_FLUSH_CHARS) {
            config.trailing_flush_chars = parsed;
        }
        if let Some(parsed) = parse_env::<String>(SCHEME).filter(|scheme| !scheme.is_empty()) {
            config.scheme = parsed;
        }

        debug!(?config, "Resolved linkify configuration");
        config
    }

    /// Load all `.env` files with priority to lower (closer) files.
    fn dot_env(cwd: &Path) -> Option<()> {
        let mut paths = vec![];
        let mut current = PathBuf::new();

        for component in cwd.components() {
            current.push(component);
            paths.push(current.clone());
        }

        paths.reverse();

        for path in paths {
            let env_file = path.join(".env");
            if env_file.is_file() {
                dotenvy::from_path(&env_file).ok();
            }
        }

        Some(())
    }
}

/// Parses an environment variable value into a concrete type.
trait FromEnvStr: Sized {
    fn from_env_str(s: &str) -> Option<Self>;
}

macro_rules! impl_from_env_str_via_from_str {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromEnvStr for $t {
                fn from_env_str(s: &str) -> Option<Self> {
                    <$t as FromStr>::from_str(s.trim()).ok()
                }
            }
        )*
    };
}

impl_from_env_str_via_from_str! {
    usize,
    String,
}

fn parse_env<T: FromEnvStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|val| T::from_env_str(&val))
}
