//! crates/echo_core/src/recommend.rs
//!
//! Picks the article feed for a caller using a three-tier policy:
//! explicit category preferences, then the strongest interest-history
//! categories, then everything.

use tracing::debug;

use crate::domain::{Article, CurrentUser, FeedQuery};
use crate::ports::{DatabaseService, PortResult};

/// How many interest-history categories feed the second tier.
pub const TOP_INTEREST_LIMIT: usize = 3;

/// The tier that produced a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Anonymous,
    Preferences,
    InterestHistory,
    Everything,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::Anonymous => "anonymous",
            FeedSource::Preferences => "preferences",
            FeedSource::InterestHistory => "interest_history",
            FeedSource::Everything => "everything",
        }
    }
}

/// The decided tier and the query it resolves to. Executing the query again
/// re-reads the store, so a plan can be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPlan {
    pub source: FeedSource,
    pub query: FeedQuery,
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub source: FeedSource,
    pub articles: Vec<Article>,
}

/// Decides which tier applies to `user`. The first matching tier wins even if
/// its query later yields no articles.
pub async fn plan_feed(db: &dyn DatabaseService, user: &CurrentUser) -> PortResult<FeedPlan> {
    let Some(user) = user.user() else {
        return Ok(FeedPlan {
            source: FeedSource::Anonymous,
            query: FeedQuery::All,
        });
    };

    if let Some(preference) = db.get_preference(user.id).await? {
        if !preference.category_ids.is_empty() {
            return Ok(FeedPlan {
                source: FeedSource::Preferences,
                query: FeedQuery::Categories(preference.category_ids),
            });
        }
    }

    let top = db
        .top_interest_categories(user.id, TOP_INTEREST_LIMIT)
        .await?;
    if !top.is_empty() {
        return Ok(FeedPlan {
            source: FeedSource::InterestHistory,
            query: FeedQuery::Categories(top),
        });
    }

    Ok(FeedPlan {
        source: FeedSource::Everything,
        query: FeedQuery::All,
    })
}

/// Returns the recommended articles for `user`, newest first.
pub async fn recommend(db: &dyn DatabaseService, user: &CurrentUser) -> PortResult<Feed> {
    let plan = plan_feed(db, user).await?;
    let articles = db.list_articles(&plan.query).await?;
    debug!(
        source = plan.source.as_str(),
        count = articles.len(),
        "Feed resolved"
    );
    Ok(Feed {
        source: plan.source,
        articles,
    })
}
