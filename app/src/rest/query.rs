use serde::Deserialize;

/// Ten years, larger windows overflow the database's timestamp range
pub const MAX_HOURS: i32 = 24 * 3650;
pub const MAX_DAYS: i32 = 3650;

/// Window and paging parameters of the history endpoints.
///
/// Values are kept raw, anything missing, unparsable or not positive falls
/// back to the endpoint's default.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    hours: Option<String>,
    days: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl WindowQuery {
    pub fn hours(&self, default: i32) -> i32 {
        positive(&self.hours).unwrap_or(default).min(MAX_HOURS)
    }

    pub fn days(&self, default: i32) -> i32 {
        positive(&self.days).unwrap_or(default).min(MAX_DAYS)
    }

    pub fn limit(&self, default: i64, max: i64) -> i64 {
        positive(&self.limit).unwrap_or(default).min(max)
    }

    pub fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|offset| *offset >= 0)
            .unwrap_or(0)
    }
}

fn positive<T>(raw: &Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.as_deref()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}

#[cfg(test)]
mod test {
    use super::*;

    async fn query(raw: &str) -> WindowQuery {
        warp::test::request()
            .path(&format!("/api/history?{}", raw))
            .filter(&warp::query::<WindowQuery>())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let q = query("").await;
        assert_eq!(24, q.hours(24));
        assert_eq!(30, q.days(30));
        assert_eq!(500, q.limit(500, 2000));
        assert_eq!(0, q.offset());
    }

    #[tokio::test]
    async fn test_values() {
        let q = query("hours=6&days=7&limit=100&offset=50").await;
        assert_eq!(6, q.hours(24));
        assert_eq!(7, q.days(30));
        assert_eq!(100, q.limit(500, 2000));
        assert_eq!(50, q.offset());
    }

    #[tokio::test]
    async fn test_lenient() {
        let q = query("hours=abc&days=-3&limit=0&offset=-1").await;
        assert_eq!(24, q.hours(24));
        assert_eq!(30, q.days(30));
        assert_eq!(500, q.limit(500, 2000));
        assert_eq!(0, q.offset());

        let q = query("hours=1.5&limit=").await;
        assert_eq!(48, q.hours(48));
        assert_eq!(500, q.limit(500, 2000));
    }

    #[tokio::test]
    async fn test_limit_clamped() {
        assert_eq!(2000, query("limit=100000").await.limit(500, 2000));
    }

    #[tokio::test]
    async fn test_window_clamped() {
        let q = query("hours=2147483647&days=2000000000").await;
        assert_eq!(MAX_HOURS, q.hours(24));
        assert_eq!(MAX_DAYS, q.days(30));

        // beyond i32 falls back to the default
        let q = query("hours=99999999999").await;
        assert_eq!(24, q.hours(24));
    }
}
