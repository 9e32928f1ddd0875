//! ギャラリーURLからサイト種別を判定する

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// 日本版サイトのホスト名に含まれる文字列
const POKEMON_CARD_HOST: &str = "pokemon-card.com";

static GALLERY_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/galleries/([^/#]+)").unwrap());
static EX_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/ex/([^/#]+)").unwrap());

/// 対応サイト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// tcg.pokemon.com のギャラリー（デフォルト）
    Tcg,
    /// www.pokemon-card.com のギャラリー（カード検索ページをページ送り）
    PokemonCard,
}

impl Site {
    /// ホスト名で判定する。パースできないURLはデフォルト扱い
    pub fn detect(url: &str) -> Self {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_default();

        if host.contains(POKEMON_CARD_HOST) {
            Site::PokemonCard
        } else {
            Site::Tcg
        }
    }

    pub fn referer(&self) -> &'static str {
        match self {
            Site::Tcg => "https://tcg.pokemon.com/",
            Site::PokemonCard => "https://www.pokemon-card.com/",
        }
    }

    fn fallback_folder(&self) -> &'static str {
        match self {
            Site::Tcg => "pokemon_cards",
            Site::PokemonCard => "pokemon_cards_jp",
        }
    }

    /// 出力フォルダ名（セット識別子）
    pub fn slug(&self, url: &str) -> String {
        let pattern = match self {
            Site::Tcg => &GALLERY_SLUG,
            Site::PokemonCard => &EX_SLUG,
        };
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| self.fallback_folder().to_string())
    }

    pub fn output_dir(&self, root: &Path, url: &str) -> PathBuf {
        root.join(self.slug(url))
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Tcg => write!(f, "tcg.pokemon.com"),
            Site::PokemonCard => write!(f, "pokemon-card.com"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(
            Site::detect("https://www.pokemon-card.com/ex/sv8/index.html"),
            Site::PokemonCard
        );
        assert_eq!(
            Site::detect("https://tcg.pokemon.com/en-us/galleries/151/"),
            Site::Tcg
        );
        assert_eq!(Site::detect("http://pokemon-card.com/"), Site::PokemonCard);
    }

    #[test]
    fn test_detect_only_looks_at_host() {
        assert_eq!(
            Site::detect("https://tcg.pokemon.com/?ref=pokemon-card.com"),
            Site::Tcg
        );
        assert_eq!(Site::detect("not a url pokemon-card.com"), Site::Tcg);
        assert_eq!(Site::detect(""), Site::Tcg);
    }

    #[test]
    fn test_slug() {
        assert_eq!(
            Site::Tcg.slug("https://tcg.pokemon.com/en-us/galleries/151/"),
            "151"
        );
        assert_eq!(
            Site::PokemonCard.slug("https://www.pokemon-card.com/ex/sv8/index.html"),
            "sv8"
        );
        assert_eq!(
            Site::PokemonCard.slug("https://www.pokemon-card.com/ex/sv2a#list"),
            "sv2a"
        );
    }

    #[test]
    fn test_slug_fallback() {
        assert_eq!(Site::Tcg.slug("https://tcg.pokemon.com/en-us/"), "pokemon_cards");
        assert_eq!(
            Site::PokemonCard.slug("https://www.pokemon-card.com/"),
            "pokemon_cards_jp"
        );
    }

    #[test]
    fn test_output_dir() {
        let dir = Site::Tcg.output_dir(
            Path::new("/data/card-images"),
            "https://tcg.pokemon.com/en-us/galleries/151/",
        );
        assert_eq!(dir, PathBuf::from("/data/card-images/151"));
    }
}
