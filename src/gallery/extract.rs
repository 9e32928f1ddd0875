//! ギャラリーページのDOMからカード画像を選び出す

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::card::{resolve_cards, CardRecord, RawImage};

/// 上側の境界（"See All" フィルタボタン）
pub const FILTER_SELECTOR: &str = "button.button__filter";
/// 下側の境界（"Want to see more?" の案内）
pub const CALLOUT_SELECTOR: &str = ".database-callout--inner";

/// カード以外の装飾画像に含まれる文字列
pub const DENYLIST: &[&str] = &[
    "logo",
    "icon",
    "banner",
    "sprite",
    "background",
    "favicon",
    "nav",
    "divider",
    "card-back",
];

static CARD_IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|webp)(\?|$)").unwrap());

/// ページ内クエリが文書順に返すノード
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DomNode {
    Filter,
    Callout,
    Image(RawImage),
}

/// 文書順で境界・画像を列挙するスクリプト
///
/// 境界の判定と範囲の切り出しは Rust 側の [`images_between`] で行う。
pub fn document_order_script() -> String {
    format!(
        r#"
        (() => {{
            const nodes = [];
            for (const el of document.querySelectorAll('*')) {{
                if (el.matches('{filter}')) {{
                    nodes.push({{ role: 'filter' }});
                }} else if (el.matches('{callout}')) {{
                    nodes.push({{ role: 'callout' }});
                }} else if (el.tagName === 'IMG') {{
                    nodes.push({{
                        role: 'image',
                        src: el.getAttribute('src') || el.getAttribute('data-src') || '',
                        alt: el.getAttribute('alt') || ''
                    }});
                }}
            }}
            return nodes;
        }})()
        "#,
        filter = FILTER_SELECTOR,
        callout = CALLOUT_SELECTOR,
    )
}

/// 最初の上側境界と最初の下側境界の間（両端を含まない）にある画像を文書順で返す
///
/// どちらかの境界が無い、または下側が上側より前にある場合は空。
pub fn images_between<U, L>(nodes: &[DomNode], is_upper: U, is_lower: L) -> Vec<RawImage>
where
    U: Fn(&DomNode) -> bool,
    L: Fn(&DomNode) -> bool,
{
    let (Some(upper), Some(lower)) = (
        nodes.iter().position(is_upper),
        nodes.iter().position(is_lower),
    ) else {
        return Vec::new();
    };

    if lower <= upper {
        return Vec::new();
    }

    nodes[upper + 1..lower]
        .iter()
        .filter_map(|node| match node {
            DomNode::Image(image) if !image.src.is_empty() => Some(image.clone()),
            _ => None,
        })
        .collect()
}

/// 装飾画像でなく、カード画像の拡張子を持つか
pub fn is_card_image(src: &str) -> bool {
    !DENYLIST.iter().any(|marker| src.contains(marker)) && CARD_IMAGE_EXT.is_match(src)
}

/// 境界間の画像をフィルタし、ページURLに対して解決・重複除去する
pub fn select_cards(nodes: &[DomNode], page_url: &Url) -> Vec<CardRecord> {
    let images = images_between(
        nodes,
        |n| matches!(n, DomNode::Filter),
        |n| matches!(n, DomNode::Callout),
    );
    resolve_cards(images.into_iter().filter(|i| is_card_image(&i.src)), page_url)
}
