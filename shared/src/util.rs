//! Shared utility functions

/// Current UTC time in milliseconds since epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Case-insensitive username normalization (usernames are unique against email)
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Carla@Tienda.AR "), "carla@tienda.ar");
    }
}
