//! crates/echo_core/src/interaction.rs
//!
//! The like/save toggle and the denormalized counters it maintains.

use tracing::info;

use crate::domain::{ArticleId, InteractionKind, ToggleAction, ToggleOutcome, User};
use crate::ports::{DatabaseService, PortResult};

/// Flips the existence of the (user, article, kind) interaction and rewrites
/// the article's matching counter from a fresh count.
///
/// Every step runs inside one store transaction, so the counter always equals
/// the number of interaction rows once the call returns. On error nothing is
/// committed.
pub async fn toggle(
    db: &dyn DatabaseService,
    user: &User,
    article_id: ArticleId,
    kind: InteractionKind,
) -> PortResult<ToggleOutcome> {
    let mut tx = db.begin_interaction().await?;
    let mut article = tx.find_article(article_id).await?;

    let action = match tx.find_interaction(user.id, article_id, kind).await? {
        Some(existing) => {
            tx.delete_interaction(&existing).await?;
            ToggleAction::Removed
        }
        None => {
            tx.create_interaction(user.id, article_id, kind).await?;
            ToggleAction::Added
        }
    };

    let new_count = tx.count_interactions(article_id, kind).await?;
    article.set_counter(kind, new_count);
    tx.save_article(&article).await?;
    tx.commit().await?;

    info!(
        user_id = %user.id,
        article_id,
        kind = kind.as_str(),
        action = action.as_str(),
        new_count,
        "Interaction toggled"
    );

    Ok(ToggleOutcome {
        kind,
        action,
        new_state: action == ToggleAction::Added,
        new_count,
    })
}
