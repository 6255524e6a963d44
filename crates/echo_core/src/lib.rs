pub mod accounts;
pub mod domain;
pub mod interaction;
pub mod memory;
pub mod news;
pub mod notifications;
pub mod ports;
pub mod recommend;

pub use domain::{
    Article, ArticleId, Category, CategoryId, CurrentUser, FeedQuery, Interaction,
    InteractionKind, InterestHistory, NewUser, Notification, NotificationId, Preference,
    ToggleAction, ToggleOutcome, User,
};
pub use ports::{DatabaseService, InteractionTx, PortError, PortResult};
pub use recommend::{Feed, FeedPlan, FeedSource};
