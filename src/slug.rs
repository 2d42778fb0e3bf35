use std::collections::HashSet;

/// Converts category names into URL keys, keeping keys unique among the
/// siblings they will live next to.
#[derive(Debug, Clone, Default)]
pub struct SlugConverter;

impl SlugConverter {
    /// Lowercase ASCII alphanumeric slug with `-` separators.
    pub fn url_key_from_name(&self, name: &str) -> String {
        let mut slug = String::new();
        let mut last_dash = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "category".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Slug for `name` that does not collide with any key in `used`.
    ///
    /// Collisions get a numeric suffix: `sale`, `sale-1`, `sale-2`, ...
    pub fn unique_url_key_from_name(&self, name: &str, used: &HashSet<String>) -> String {
        let base = self.url_key_from_name(name);
        if !used.contains(&base) {
            return base;
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}-{n}");
            if !used.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        let slugs = SlugConverter;
        assert_eq!(slugs.url_key_from_name("Shoes & Boots"), "shoes-boots");
        assert_eq!(slugs.url_key_from_name("  Sale!  "), "sale");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        let slugs = SlugConverter;
        assert_eq!(slugs.url_key_from_name("***"), "category");
    }

    #[test]
    fn suffixes_until_free() {
        let slugs = SlugConverter;
        let used: HashSet<String> = ["sale".to_string(), "sale-1".to_string()]
            .into_iter()
            .collect();
        assert_eq!(slugs.unique_url_key_from_name("Sale", &used), "sale-2");
        assert_eq!(slugs.unique_url_key_from_name("Outlet", &used), "outlet");
    }
}
