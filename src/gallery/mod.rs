//! tcg.pokemon.com ギャラリー用スクレイパー
//!
//! 「View All」とスクロールで全カードを描画させ、フィルタボタンから
//! 案内ブロックまでの間にある画像を集める。

mod extract;
mod scraper;

pub use extract::{images_between, is_card_image, select_cards, DomNode, DENYLIST};
pub use scraper::TcgGalleryScraper;
