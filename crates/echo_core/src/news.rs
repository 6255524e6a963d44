//! crates/echo_core/src/news.rs

use crate::domain::{Article, ArticleId, CurrentUser, InteractionKind};
use crate::ports::{DatabaseService, PortResult};

/// An article together with the caller's own interactions with it.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub article: Article,
    pub liked: bool,
    pub saved: bool,
}

/// Anonymous callers always see `liked` and `saved` as false.
pub async fn article_detail(
    db: &dyn DatabaseService,
    user: &CurrentUser,
    article_id: ArticleId,
) -> PortResult<ArticleView> {
    let article = db.get_article(article_id).await?;

    let (liked, saved) = match user.user() {
        Some(user) => futures::try_join!(
            db.has_interaction(user.id, article_id, InteractionKind::Like),
            db.has_interaction(user.id, article_id, InteractionKind::Save),
        )?,
        None => (false, false),
    };

    Ok(ArticleView {
        article,
        liked,
        saved,
    })
}
