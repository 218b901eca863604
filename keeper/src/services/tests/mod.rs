//! Service-specific tests
//!
//! Process tests spawn real `sh` children and only run on unix.


pub mod common {
    use std::time::Duration;

    /// Grace window short enough to keep process tests fast
    pub const TEST_GRACE: Duration = Duration::from_millis(200);

    /// Poll `check` every 20ms until it holds or `limit` elapses
    pub async fn eventually<F>(limit: Duration, mut check: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check()
    }
}
