use std::collections::HashSet;

use super::Channel;
use crate::config::FilterConfig;

/// Immutable inclusion / exclusion policy applied during merge.
///
/// Country codes are compared upper-case, languages and categories
/// lower-case. An empty include set never restricts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    pub include_countries: HashSet<String>,
    pub exclude_countries: HashSet<String>,
    pub include_languages: HashSet<String>,
    pub exclude_languages: HashSet<String>,
    pub exclude_categories: HashSet<String>,
    pub exclude_nsfw: bool,
    /// Also apply `exclude_categories` to custom overlay channels
    pub exclude_categories_for_custom: bool,
}

impl FilterPolicy {
    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            include_countries: upper_set(&config.include_countries),
            exclude_countries: upper_set(&config.exclude_countries),
            include_languages: lower_set(&config.include_languages),
            exclude_languages: lower_set(&config.exclude_languages),
            exclude_categories: lower_set(&config.exclude_categories),
            exclude_nsfw: config.exclude_nsfw,
            exclude_categories_for_custom: config.exclude_categories_for_custom,
        }
    }

    /// Whether the channel passes the policy.
    ///
    /// Custom channels skip the country, language and nsfw rules; they only
    /// see category exclusion when `exclude_categories_for_custom` is set.
    /// Stream availability is checked by the merger, not here.
    #[must_use]
    pub fn admits(&self, channel: &Channel) -> bool {
        if channel.is_custom {
            return !self.exclude_categories_for_custom || !self.excludes_category(channel);
        }

        if self.exclude_nsfw && channel.is_nsfw {
            return false;
        }

        if !self.include_countries.is_empty() && !self.include_countries.contains(&channel.country)
        {
            return false;
        }
        if self.exclude_countries.contains(&channel.country) {
            return false;
        }

        if !self.include_languages.is_empty()
            && !channel
                .languages
                .iter()
                .any(|l| self.include_languages.contains(l))
        {
            return false;
        }
        if channel
            .languages
            .iter()
            .any(|l| self.exclude_languages.contains(l))
        {
            return false;
        }

        !self.excludes_category(channel)
    }

    /// Checks the raw categories; the `general` fallback is a genre only
    fn excludes_category(&self, channel: &Channel) -> bool {
        channel
            .categories
            .iter()
            .any(|c| self.exclude_categories.contains(c))
    }
}

fn upper_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_ascii_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn lower_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ChannelFixture;

    fn policy(config: FilterConfig) -> FilterPolicy {
        FilterPolicy::from_config(&config)
    }

    #[test]
    fn test_empty_policy_admits_everything_but_nsfw() {
        let policy = policy(FilterConfig::default());
        assert!(policy.admits(&ChannelFixture::new("a").country("GR").build()));
        assert!(!policy.admits(&ChannelFixture::new("b").nsfw().build()));
    }

    #[test]
    fn test_include_countries_normalized() {
        let policy = policy(FilterConfig {
            include_countries: vec!["gr ".to_string()],
            ..Default::default()
        });

        assert!(policy.admits(&ChannelFixture::new("ert1").country("GR").build()));
        assert!(!policy.admits(&ChannelFixture::new("bbc1").country("GB").build()));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let policy = policy(FilterConfig {
            include_languages: vec!["ell".to_string(), "eng".to_string()],
            exclude_languages: vec!["eng".to_string()],
            ..Default::default()
        });

        let greek = ChannelFixture::new("a").languages(&["ell"]).build();
        let bilingual = ChannelFixture::new("b").languages(&["ell", "eng"]).build();
        let silent = ChannelFixture::new("c").build();

        assert!(policy.admits(&greek));
        assert!(!policy.admits(&bilingual));
        assert!(!policy.admits(&silent));
    }

    #[test]
    fn test_category_exclusion_checks_raw_categories() {
        let policy = policy(FilterConfig {
            exclude_categories: vec!["General".to_string()],
            ..Default::default()
        });

        // No categories supplied: only the genre falls back to general
        assert!(policy.admits(&ChannelFixture::new("a").build()));
        assert!(!policy.admits(&ChannelFixture::new("b").categories(&["general"]).build()));
        assert!(policy.admits(&ChannelFixture::new("c").categories(&["news"]).build()));
    }

    #[test]
    fn test_custom_channels_bypass_rules() {
        let policy = policy(FilterConfig {
            include_countries: vec!["GR".to_string()],
            exclude_categories: vec!["news".to_string()],
            include_languages: vec!["ell".to_string()],
            ..Default::default()
        });

        let custom = ChannelFixture::new("x1")
            .country("AU")
            .categories(&["news"])
            .custom()
            .nsfw()
            .build();
        assert!(policy.admits(&custom));
    }

    #[test]
    fn test_custom_category_exclusion_flag() {
        let policy = policy(FilterConfig {
            exclude_categories: vec!["news".to_string()],
            exclude_categories_for_custom: true,
            ..Default::default()
        });

        let custom = ChannelFixture::new("x1").categories(&["news"]).custom().build();
        assert!(!policy.admits(&custom));
    }
}
