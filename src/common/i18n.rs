// src/common/i18n.rs

use serde_json::Value;
use std::{borrow::Cow, collections::HashMap};

// Catálogos embutidos no binário; as chaves dos dois arquivos devem coincidir.
const EN_CATALOG: &str = include_str!("../../locales/en.json");
const PT_CATALOG: &str = include_str!("../../locales/pt.json");

/// Parâmetros de interpolação (`{nome}` no texto traduzido).
/// Mesmo formato usado por `validator::ValidationError::params`.
pub type Params = HashMap<Cow<'static, str>, Value>;

/// Monta um mapa de parâmetros a partir de pares literais.
pub fn params<const N: usize>(pairs: [(&'static str, Value); N]) -> Params {
    pairs
        .into_iter()
        .map(|(key, value)| (Cow::Borrowed(key), value))
        .collect()
}

/// Reduz uma tag de idioma ao código base: "pt-BR" -> "pt", "EN_us" -> "en".
pub fn base_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
    default_lang: String,
}

impl I18nStore {
    /// Carrega os catálogos embutidos. `default_lang` aceita o formato de
    /// `LANGUAGE_CODE` ("pt-br", "en"); idiomas desconhecidos caem para "en".
    pub fn load(default_lang: &str) -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        catalogs.insert("en".to_string(), serde_json::from_str(EN_CATALOG)?);
        catalogs.insert("pt".to_string(), serde_json::from_str(PT_CATALOG)?);

        let wanted = base_language(default_lang);
        let default_lang = if catalogs.contains_key(&wanted) {
            wanted
        } else {
            "en".to_string()
        };

        Ok(Self {
            catalogs,
            default_lang,
        })
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Idioma efetivo para uma requisição: o pedido, se houver catálogo, senão o padrão.
    pub fn resolve<'a>(&'a self, lang: &'a str) -> &'a str {
        if self.catalogs.contains_key(lang) {
            lang
        } else {
            &self.default_lang
        }
    }

    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key).to_string()
    }

    pub fn translate_with(&self, lang: &str, key: &str, params: &Params) -> String {
        let mut text = self.lookup(lang, key).to_string();
        for (name, value) in params {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text = text.replace(&format!("{{{name}}}"), &rendered);
        }
        text
    }

    // idioma pedido -> idioma padrão -> a própria chave
    fn lookup<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        let lang = self.resolve(lang);
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| {
                self.catalogs
                    .get(&self.default_lang)
                    .and_then(|catalog| catalog.get(key))
            })
            .map(String::as_str)
            .unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_language_strips_region() {
        assert_eq!(base_language("pt-BR"), "pt");
        assert_eq!(base_language("pt_br"), "pt");
        assert_eq!(base_language("EN"), "en");
    }

    #[test]
    fn default_language_follows_language_code() {
        assert_eq!(I18nStore::load("pt-br").unwrap().default_lang(), "pt");
        assert_eq!(I18nStore::load("fr").unwrap().default_lang(), "en");
    }

    #[test]
    fn translates_with_fallback_to_default_language() {
        let store = I18nStore::load("en").unwrap();
        assert_eq!(store.translate("en", "not_found"), store.translate("de", "not_found"));
        assert_ne!(store.translate("pt", "not_found"), store.translate("en", "not_found"));
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::load("en").unwrap();
        assert_eq!(store.translate("en", "no_such_key"), "no_such_key");
    }

    #[test]
    fn interpolates_parameters() {
        let store = I18nStore::load("en").unwrap();
        let text = store.translate_with(
            "en",
            "product_name_too_short",
            &params([("min", json!(3))]),
        );
        assert!(text.contains('3'));
        assert!(!text.contains("{min}"));
    }

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::load("en").unwrap();
        let mut en: Vec<_> = store.catalogs["en"].keys().collect();
        let mut pt: Vec<_> = store.catalogs["pt"].keys().collect();
        en.sort();
        pt.sort();
        assert_eq!(en, pt);
    }
}
