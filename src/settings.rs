use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Result;

const KEY_LANGUAGE: &str = "selected_language";
const KEY_THEME_MODE: &str = "is_dark_theme";

/// Key-value storage for user preferences
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Languages the app itself is offered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppLanguage {
    English,
    Turkish,
}

impl AppLanguage {
    pub fn label(&self) -> &'static str {
        match self {
            AppLanguage::English => "English",
            AppLanguage::Turkish => "Türkçe",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppLanguage::English => "en",
            AppLanguage::Turkish => "tr",
        }
    }

    /// Picks the app language from a locale string such as `tr_TR.UTF-8`
    pub fn from_locale(locale: &str) -> Self {
        if locale.to_lowercase().starts_with("tr") {
            AppLanguage::Turkish
        } else {
            AppLanguage::English
        }
    }
}

impl fmt::Display for AppLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AppLanguage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "English" | "english" | "en" => Ok(AppLanguage::English),
            "Türkçe" | "türkçe" | "Turkish" | "turkish" | "tr" => Ok(AppLanguage::Turkish),
            other => Err(format!("Unsupported language '{other}'")),
        }
    }
}

/// Defaults used the first time settings are loaded
#[derive(Debug, Clone)]
pub struct SystemDefaults {
    pub locale: String,
    pub dark_theme: bool,
}

impl SystemDefaults {
    /// Reads `LANG` for the locale and `QUIZ_DARK_THEME` for the theme
    pub fn from_env() -> Self {
        Self {
            locale: std::env::var("LANG").unwrap_or_default(),
            dark_theme: std::env::var("QUIZ_DARK_THEME")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

/// App-wide preferences, passed explicitly to whoever needs them
pub struct AppSettings {
    store: Arc<dyn SettingsStore>,
    language: AppLanguage,
    dark_theme: bool,
    /// Set when saved quizzes were deleted so list views know to refresh
    pub quizzes_deleted: bool,
    pub questions_deleted: bool,
    /// Set once the current generated quiz has been saved
    pub created_quiz_saved: bool,
}

impl AppSettings {
    /// Load stored preferences, persisting system defaults for anything missing
    pub async fn load(store: Arc<dyn SettingsStore>, defaults: &SystemDefaults) -> Result<Self> {
        let language = match store.get_setting(KEY_LANGUAGE).await? {
            Some(stored) => stored.parse().unwrap_or_else(|e| {
                tracing::warn!("{} - falling back to English", e);
                AppLanguage::English
            }),
            None => {
                let language = AppLanguage::from_locale(&defaults.locale);
                store.set_setting(KEY_LANGUAGE, language.label()).await?;
                language
            }
        };

        let dark_theme = match store.get_setting(KEY_THEME_MODE).await? {
            Some(stored) => stored == "true",
            None => {
                store
                    .set_setting(KEY_THEME_MODE, &defaults.dark_theme.to_string())
                    .await?;
                defaults.dark_theme
            }
        };

        tracing::info!(
            "Settings loaded: language={}, dark_theme={}",
            language,
            dark_theme
        );

        Ok(Self {
            store,
            language,
            dark_theme,
            quizzes_deleted: false,
            questions_deleted: false,
            created_quiz_saved: false,
        })
    }

    pub fn language(&self) -> AppLanguage {
        self.language
    }

    pub fn dark_theme(&self) -> bool {
        self.dark_theme
    }

    pub async fn change_language(&mut self, language: AppLanguage) -> Result<()> {
        self.store.set_setting(KEY_LANGUAGE, language.label()).await?;
        self.language = language;
        Ok(())
    }

    pub async fn change_theme(&mut self, dark_theme: bool) -> Result<()> {
        self.store
            .set_setting(KEY_THEME_MODE, &dark_theme.to_string())
            .await?;
        self.dark_theme = dark_theme;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn defaults(locale: &str, dark: bool) -> SystemDefaults {
        SystemDefaults {
            locale: locale.to_string(),
            dark_theme: dark,
        }
    }

    #[tokio::test]
    async fn test_first_load_uses_system_defaults_and_persists_them() {
        let store = Arc::new(MemoryStore::new());
        let settings = AppSettings::load(store.clone(), &defaults("tr_TR.UTF-8", true))
            .await
            .unwrap();
        assert_eq!(settings.language(), AppLanguage::Turkish);
        assert!(settings.dark_theme());
        assert_eq!(
            store.get_setting(KEY_LANGUAGE).await.unwrap().as_deref(),
            Some("Türkçe")
        );
        assert_eq!(
            store.get_setting(KEY_THEME_MODE).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_stored_values_win_over_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set_setting(KEY_LANGUAGE, "English").await.unwrap();
        store.set_setting(KEY_THEME_MODE, "false").await.unwrap();
        let settings = AppSettings::load(store, &defaults("tr_TR", true)).await.unwrap();
        assert_eq!(settings.language(), AppLanguage::English);
        assert!(!settings.dark_theme());
    }

    #[tokio::test]
    async fn test_changes_are_saved() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = AppSettings::load(store.clone(), &defaults("en_US", false))
            .await
            .unwrap();
        settings.change_language(AppLanguage::Turkish).await.unwrap();
        settings.change_theme(true).await.unwrap();

        let reloaded = AppSettings::load(store, &defaults("en_US", false)).await.unwrap();
        assert_eq!(reloaded.language(), AppLanguage::Turkish);
        assert!(reloaded.dark_theme());
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("Türkçe".parse(), Ok(AppLanguage::Turkish));
        assert_eq!(AppLanguage::from_locale("C"), AppLanguage::English);
        assert_eq!(AppLanguage::Turkish.code(), "tr");
    }
}
