//! Utility functions

pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let keep = if local.chars().count() <= 2 { 1 } else { 2 };
        let prefix: String = local.chars().take(keep).collect();
        format!("{}***{}", prefix, domain)
    } else {
        "***".to_string()
    }
}

/// Splits a full name into first name and the remainder.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jane@clinic.com"), "ja***@clinic.com");
        assert_eq!(mask_email("jo@clinic.com"), "j***@clinic.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Ada Byron Lovelace"), ("Ada".to_string(), "Byron Lovelace".to_string()));
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }
}
