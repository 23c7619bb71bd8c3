//! Locales the dashboard can run in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A dashboard locale.
///
/// The set is closed: anything the dashboard sends outside of it fails to
/// parse and is treated as absent. Serialized form matches the dashboard's
/// language tags (e.g. `"pt-BR"`, `"zh-Hans"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleCode {
    #[serde(rename = "ar")]
    Ar,
    #[serde(rename = "az")]
    Az,
    #[serde(rename = "be")]
    Be,
    #[serde(rename = "bg")]
    Bg,
    #[serde(rename = "bn")]
    Bn,
    #[serde(rename = "ca")]
    Ca,
    #[serde(rename = "cs")]
    Cs,
    #[serde(rename = "da")]
    Da,
    #[serde(rename = "de")]
    De,
    #[serde(rename = "el")]
    El,
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "es-CO")]
    EsCo,
    #[serde(rename = "et")]
    Et,
    #[serde(rename = "fa")]
    Fa,
    #[serde(rename = "fi")]
    Fi,
    #[serde(rename = "fr")]
    Fr,
    #[serde(rename = "hi")]
    Hi,
    #[serde(rename = "hu")]
    Hu,
    #[serde(rename = "hy")]
    Hy,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "it")]
    It,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
    #[serde(rename = "mn")]
    Mn,
    #[serde(rename = "nb")]
    Nb,
    #[serde(rename = "nl")]
    Nl,
    #[serde(rename = "pl")]
    Pl,
    #[serde(rename = "pt")]
    Pt,
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "ro")]
    Ro,
    #[serde(rename = "ru")]
    Ru,
    #[serde(rename = "sk")]
    Sk,
    #[serde(rename = "sl")]
    Sl,
    #[serde(rename = "sq")]
    Sq,
    #[serde(rename = "sr")]
    Sr,
    #[serde(rename = "sv")]
    Sv,
    #[serde(rename = "th")]
    Th,
    #[serde(rename = "tr")]
    Tr,
    #[serde(rename = "uk")]
    Uk,
    #[serde(rename = "vi")]
    Vi,
    #[serde(rename = "zh-Hans")]
    ZhHans,
    #[serde(rename = "zh-Hant")]
    ZhHant,
}

impl LocaleCode {
    /// Every supported locale, in declaration order.
    pub const ALL: [LocaleCode; 44] = [
        Self::Ar,
        Self::Az,
        Self::Be,
        Self::Bg,
        Self::Bn,
        Self::Ca,
        Self::Cs,
        Self::Da,
        Self::De,
        Self::El,
        Self::En,
        Self::Es,
        Self::EsCo,
        Self::Et,
        Self::Fa,
        Self::Fi,
        Self::Fr,
        Self::Hi,
        Self::Hu,
        Self::Hy,
        Self::Id,
        Self::Is,
        Self::It,
        Self::Ja,
        Self::Ko,
        Self::Mn,
        Self::Nb,
        Self::Nl,
        Self::Pl,
        Self::Pt,
        Self::PtBr,
        Self::Ro,
        Self::Ru,
        Self::Sk,
        Self::Sl,
        Self::Sq,
        Self::Sr,
        Self::Sv,
        Self::Th,
        Self::Tr,
        Self::Uk,
        Self::Vi,
        Self::ZhHans,
        Self::ZhHant,
    ];

    /// The language tag as it appears on the wire and in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::Az => "az",
            Self::Be => "be",
            Self::Bg => "bg",
            Self::Bn => "bn",
            Self::Ca => "ca",
            Self::Cs => "cs",
            Self::Da => "da",
            Self::De => "de",
            Self::El => "el",
            Self::En => "en",
            Self::Es => "es",
            Self::EsCo => "es-CO",
            Self::Et => "et",
            Self::Fa => "fa",
            Self::Fi => "fi",
            Self::Fr => "fr",
            Self::Hi => "hi",
            Self::Hu => "hu",
            Self::Hy => "hy",
            Self::Id => "id",
            Self::Is => "is",
            Self::It => "it",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Mn => "mn",
            Self::Nb => "nb",
            Self::Nl => "nl",
            Self::Pl => "pl",
            Self::Pt => "pt",
            Self::PtBr => "pt-BR",
            Self::Ro => "ro",
            Self::Ru => "ru",
            Self::Sk => "sk",
            Self::Sl => "sl",
            Self::Sq => "sq",
            Self::Sr => "sr",
            Self::Sv => "sv",
            Self::Th => "th",
            Self::Tr => "tr",
            Self::Uk => "uk",
            Self::Vi => "vi",
            Self::ZhHans => "zh-Hans",
            Self::ZhHant => "zh-Hant",
        }
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the supported locale tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale `{0}`")]
pub struct UnknownLocale(pub String);

impl FromStr for LocaleCode {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownLocale(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_english() {
        assert_eq!(LocaleCode::default(), LocaleCode::En);
    }

    #[test]
    fn parse_and_display_agree_for_every_locale() {
        for code in LocaleCode::ALL {
            assert_eq!(code.as_str().parse::<LocaleCode>(), Ok(code));
            assert_eq!(code.to_string(), code.as_str());
        }
    }

    #[test]
    fn serde_uses_language_tags() {
        assert_eq!(serde_json::to_value(LocaleCode::PtBr).unwrap(), "pt-BR");
        let parsed: LocaleCode = serde_json::from_value("zh-Hant".into()).unwrap();
        assert_eq!(parsed, LocaleCode::ZhHant);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            "xx".parse::<LocaleCode>(),
            Err(UnknownLocale("xx".to_string()))
        );
        assert!(serde_json::from_value::<LocaleCode>("EN".into()).is_err());
    }
}
