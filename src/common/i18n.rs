// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

const FALLBACK_LANG: &str = "it";

// Catálogos embutidos no binário: código do erro -> mensagem
const CATALOGS: &[(&str, &str)] = &[
    ("it", include_str!("../../locales/it.json")),
    ("en", include_str!("../../locales/en.json")),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("catálogo de mensagens '{}' inválido", lang))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    /// Mensagem no idioma pedido, caindo para o italiano e por fim para o próprio código.
    pub fn message(&self, lang: &str, code: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|c| c.get(code))
            .or_else(|| self.catalogs.get(FALLBACK_LANG).and_then(|c| c.get(code)))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_italian() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.message("de", "lead_not_found"),
            store.message("it", "lead_not_found")
        );
    }

    #[test]
    fn unknown_code_is_returned_verbatim() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.message("en", "no_such_code"), "no_such_code");
    }

    #[test]
    fn catalogs_cover_the_same_codes() {
        let store = I18nStore::load().unwrap();
        let mut it: Vec<_> = store.catalogs["it"].keys().collect();
        let mut en: Vec<_> = store.catalogs["en"].keys().collect();
        it.sort();
        en.sort();
        assert_eq!(it, en);
    }
}
