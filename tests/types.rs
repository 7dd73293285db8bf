// ABOUTME: Integration tests for validated types and image references.
// ABOUTME: Tests parsing, validation, and tag/repository manipulation.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rollout::types::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_ecr_repository_url() {
        let img = ImageRef::parse("123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/agent").unwrap();
        assert_eq!(
            img.registry(),
            Some("123456789012.dkr.ecr.ap-northeast-1.amazonaws.com")
        );
        assert_eq!(img.name(), "agent");
        assert_eq!(img.tag(), Some("latest"));
    }

    #[test]
    fn parse_strips_scheme_and_trailing_slash() {
        let img = ImageRef::parse("https://registry.example.com/team/api/").unwrap();
        assert_eq!(img.registry(), Some("registry.example.com"));
        assert_eq!(img.name(), "team/api");
    }

    #[test]
    fn parse_registry_with_port() {
        let img = ImageRef::parse("localhost:5000/agent:dev").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "agent");
        assert_eq!(img.tag(), Some("dev"));
    }

    #[test]
    fn parse_with_digest() {
        let img = ImageRef::parse("nginx@sha256:abc123").unwrap();
        assert_eq!(img.digest(), Some("sha256:abc123"));
        assert!(img.tag().is_none());
    }

    #[test]
    fn parse_rejects_empty_and_bad_chars() {
        assert_eq!(ImageRef::parse(""), Err(ParseImageRefError::Empty));
        assert!(matches!(
            ImageRef::parse("agent image"),
            Err(ParseImageRefError::InvalidChar(' '))
        ));
    }

    #[test]
    fn with_tag_replaces_tag_and_drops_digest() {
        let img = ImageRef::parse("ghcr.io/org/app:v1@sha256:aaa").unwrap();
        let tag = ImageTag::new("v2").unwrap();
        let retagged = img.with_tag(&tag);
        assert_eq!(retagged.to_string(), "ghcr.io/org/app:v2");
        assert!(retagged.same_repository(&img));
    }

    #[test]
    fn repository_excludes_tag() {
        let img = ImageRef::parse("ghcr.io/org/app:v1").unwrap();
        assert_eq!(img.repository(), "ghcr.io/org/app");
    }

    #[test]
    fn same_repository_compares_registry_and_name() {
        let a = ImageRef::parse("r.example.com/agent:1").unwrap();
        let b = ImageRef::parse("r.example.com/agent:2").unwrap();
        let c = ImageRef::parse("other.example.com/agent:1").unwrap();
        assert!(a.same_repository(&b));
        assert!(!a.same_repository(&c));
    }
}

mod service_name_tests {
    use super::*;

    #[test]
    fn accepts_dns_labels() {
        for name in ["agent", "backend", "parking-mcp", "a1"] {
            assert!(ServiceName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(ServiceName::new(""), Err(ServiceNameError::Empty));
        assert_eq!(ServiceName::new("-agent"), Err(ServiceNameError::EdgeHyphen));
        assert_eq!(ServiceName::new("Agent"), Err(ServiceNameError::NotLowercase));
        assert_eq!(
            ServiceName::new("parking_mcp"),
            Err(ServiceNameError::InvalidChar('_'))
        );
        assert_eq!(
            ServiceName::new(&"a".repeat(64)),
            Err(ServiceNameError::TooLong)
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: ServiceName = serde_yaml::from_str("agent").unwrap();
        assert_eq!(ok.as_str(), "agent");
        assert!(serde_yaml::from_str::<ServiceName>("Agent").is_err());
    }
}

mod image_tag_tests {
    use super::*;

    #[test]
    fn build_tag_combines_timestamp_and_digest() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let tag = ImageTag::for_build(at, "0123456789ab");
        assert_eq!(tag.as_str(), "20250314092653-0123456789ab");
        assert!(ImageTag::new(tag.as_str()).is_ok());
        assert!(!tag.is_latest());
    }

    #[test]
    fn rejects_invalid_tags() {
        assert_eq!(ImageTag::new(""), Err(ImageTagError::Empty));
        assert_eq!(ImageTag::new(".hidden"), Err(ImageTagError::InvalidStart('.')));
        assert_eq!(ImageTag::new("a/b"), Err(ImageTagError::InvalidChar('/')));
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn short_returns_last_arn_segment() {
        let id = PlatformServiceId::new("arn:aws:ecs:ap-northeast-1:1:service/prod/agent");
        assert_eq!(id.short(), "agent");
        let plain = ClusterId::new("prod-cluster");
        assert_eq!(plain.short(), "prod-cluster");
    }
}

proptest! {
    #[test]
    fn generated_dns_labels_are_valid(name in "[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?") {
        let parsed = ServiceName::new(&name).unwrap();
        prop_assert_eq!(parsed.as_str(), name.as_str());
    }

    #[test]
    fn uppercase_is_always_rejected(name in "[a-z]{0,10}[A-Z][a-z]{0,10}") {
        prop_assert_eq!(ServiceName::new(&name), Err(ServiceNameError::NotLowercase));
    }

    #[test]
    fn build_tags_are_valid_tags(secs in 0i64..4_102_444_800, digest in "[0-9a-f]{12}") {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let tag = ImageTag::for_build(at, &digest);
        prop_assert!(ImageTag::new(tag.as_str()).is_ok());
        prop_assert!(tag.as_str().ends_with(&digest));
    }
}
