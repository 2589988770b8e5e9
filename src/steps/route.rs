//! Page route templates and step URL resolution

use crate::error::ConfigurationError;

const PLACEHOLDER: &str = ":step?";
const PLACEHOLDER_REQUIRED: &str = ":step";

/// Path prefix of the JSON API
pub const RESERVED_PREFIX: &str = "/api";

/// Whether `segment` can appear verbatim between two `/` in a URL path
pub fn is_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Route template such as `/signup/:step?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    template: String,
}

impl RouteTemplate {
    /// Parse a template; it must end with the step placeholder and every
    /// other segment must be a literal outside the API prefix
    pub fn parse(template: &str) -> Result<Self, ConfigurationError> {
        let template = template.trim();
        let normalized = if template.starts_with('/') {
            template.to_string()
        } else {
            format!("/{}", template)
        };
        let normalized = normalized.trim_end_matches('/');

        let (base, last) = normalized.rsplit_once('/').unwrap_or(("", normalized));
        if last != PLACEHOLDER && last != PLACEHOLDER_REQUIRED {
            return Err(ConfigurationError::MissingStepPlaceholder(
                template.to_string(),
            ));
        }

        let invalid = |reason: String| ConfigurationError::InvalidRoute {
            route: template.to_string(),
            reason,
        };
        for segment in base.split('/').skip(1) {
            if !is_path_segment(segment) {
                return Err(invalid(format!(
                    "'{}' is not a literal path segment",
                    segment
                )));
            }
        }
        if base == RESERVED_PREFIX || base.starts_with(&format!("{}/", RESERVED_PREFIX)) {
            return Err(invalid(format!("{} is reserved for the API", RESERVED_PREFIX)));
        }

        Ok(Self {
            template: normalized.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// The route without its step segment, e.g. `/signup`
    pub fn base(&self) -> &str {
        let base = self
            .template
            .rsplit_once('/')
            .map(|(base, _)| base)
            .unwrap_or("");
        if base.is_empty() {
            "/"
        } else {
            base
        }
    }

    /// URL of the page with `step` substituted for the placeholder
    pub fn url_for(&self, step: &str) -> String {
        let base = self.base().trim_end_matches('/');
        format!("{}/{}", base, step)
    }

    /// Router paths serving this template: without and with the step segment
    pub fn router_paths(&self) -> (String, String) {
        let base = self.base().to_string();
        let with_step = format!("{}/:step", base.trim_end_matches('/'));
        (base, with_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_url_for() {
        let route = RouteTemplate::parse("/signup/:step?").unwrap();
        assert_eq!(route.base(), "/signup");
        assert_eq!(route.url_for("account"), "/signup/account");
    }

    #[test]
    fn test_nested_route() {
        let route = RouteTemplate::parse("shop/checkout/:step").unwrap();
        assert_eq!(route.as_str(), "/shop/checkout/:step");
        assert_eq!(route.url_for("pay"), "/shop/checkout/pay");
        assert_eq!(
            route.router_paths(),
            ("/shop/checkout".to_string(), "/shop/checkout/:step".to_string())
        );
    }

    #[test]
    fn test_root_route() {
        let route = RouteTemplate::parse("/:step?").unwrap();
        assert_eq!(route.base(), "/");
        assert_eq!(route.url_for("one"), "/one");
        assert_eq!(route.router_paths(), ("/".to_string(), "/:step".to_string()));
    }

    #[test]
    fn test_missing_placeholder() {
        assert_eq!(
            RouteTemplate::parse("/signup").unwrap_err(),
            ConfigurationError::MissingStepPlaceholder("/signup".to_string())
        );
        assert!(RouteTemplate::parse("/signup/:step?/extra").is_err());
    }

    #[test]
    fn test_parameters_and_wildcards_rejected() {
        for template in ["/users/:id/:step?", "/files/*rest/:step", "/a//:step?", "/a b/:step?"] {
            assert!(
                matches!(
                    RouteTemplate::parse(template),
                    Err(ConfigurationError::InvalidRoute { .. })
                ),
                "{} should be rejected",
                template
            );
        }
    }

    #[test]
    fn test_api_prefix_reserved() {
        assert!(matches!(
            RouteTemplate::parse("/api/v1/wizards/:step?"),
            Err(ConfigurationError::InvalidRoute { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/api/:step"),
            Err(ConfigurationError::InvalidRoute { .. })
        ));
        assert!(RouteTemplate::parse("/apiary/:step?").is_ok());
    }

    #[test]
    fn test_is_path_segment() {
        assert!(is_path_segment("step-2_a.b"));
        assert!(!is_path_segment("a/b"));
        assert!(!is_path_segment("why?"));
        assert!(!is_path_segment(":id"));
        assert!(!is_path_segment(".."));
        assert!(!is_path_segment(""));
    }
}
