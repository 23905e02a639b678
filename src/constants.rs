pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const RECIPE_MAX_PAGE_SIZE: i64 = 100;

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

/// Compare-and-swap rounds the rating aggregator attempts before giving up.
pub const MAX_RATING_UPDATE_ATTEMPTS: usize = 5;

/// Delay before a rating left pending by a request is recomputed again.
pub const RATING_RETRY_DELAY_MS: u64 = 250;

pub const SESSION_COOKIE: &str = "session";

pub const RECIPE_ORDERS: &[(&str, &str)] = &[
    ("newest", "Newest"),
    ("oldest", "Oldest"),
    ("alphabetical", "Title"),
    ("rating_desc", "Rating"),
    ("calories_asc", "Calories (asc)"),
    ("calories_desc", "Calories (desc)"),
];
