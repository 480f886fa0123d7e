pub mod core;
pub mod model;

pub use self::core::{
    CodeforcesClient, CodeforcesError, ProfileSource, DEFAULT_API_URL, DEFAULT_SUBMISSION_COUNT,
    RATE_LIMIT_INTERVAL,
};
