use chrono::{DateTime, Local, Utc};

/// Human-relative label for an instant, as shown in the chat list.
///
/// Whole elapsed minutes are bucketed into minutes, hours and days; anything a
/// week or older is printed as an absolute local date (`M/D/YYYY`). Instants in
/// the future count as "Just now".
pub fn relative_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = now.signed_duration_since(then).num_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{} minutes ago", minutes);
    }
    if hours < 24 {
        return format!("{} hours ago", hours);
    }
    if days < 7 {
        return format!("{} days ago", days);
    }

    then.with_timezone(&Local).format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn label_after(elapsed: Duration) -> String {
        let now = Utc::now();
        relative_label(now - elapsed, now)
    }

    #[test]
    fn test_just_now() {
        assert_eq!(label_after(Duration::zero()), "Just now");
        assert_eq!(label_after(Duration::seconds(59)), "Just now");
    }

    #[test]
    fn test_minutes() {
        assert_eq!(label_after(Duration::minutes(1)), "1 minutes ago");
        assert_eq!(label_after(Duration::minutes(45)), "45 minutes ago");
        assert_eq!(label_after(Duration::minutes(59)), "59 minutes ago");
    }

    #[test]
    fn test_hours() {
        assert_eq!(label_after(Duration::minutes(60)), "1 hours ago");
        assert_eq!(label_after(Duration::minutes(23 * 60 + 59)), "23 hours ago");
    }

    #[test]
    fn test_days() {
        assert_eq!(label_after(Duration::hours(50)), "2 days ago");
        assert_eq!(label_after(Duration::hours(24)), "1 days ago");
        assert_eq!(label_after(Duration::days(6)), "6 days ago");
    }

    #[test]
    fn test_week_or_older_is_absolute() {
        let then = Local
            .with_ymd_and_hms(2024, 3, 5, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let now = then + Duration::days(7);
        assert_eq!(relative_label(then, now), "3/5/2024");
    }

    #[test]
    fn test_future_instant_is_just_now() {
        let now = Utc::now();
        assert_eq!(relative_label(now + Duration::hours(2), now), "Just now");
    }
}
