//! MySQL repository implementations.

mod cache_repository;
mod job_repository;

pub use cache_repository::MySqlCacheRepository;
pub use job_repository::{MySqlJobRunRepository, MySqlJobStateRepository};

/// Escape character used in `LIKE ... ESCAPE '!'` clauses.
const LIKE_ESCAPE: char = '!';

/// Turns a literal prefix into a `LIKE` pattern matching keys that start with it.
pub(crate) fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
