//! Application and cloud-resource records created once per run.

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::Domain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub app_id: String,
    pub name: String,
    pub description: String,
    pub criticality: String,
    pub business_unit: String,
    pub business_service: String,
    pub owner: String,
    pub creation_date: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

/// A billable resource serving one location. `resource_id` joins samples,
/// incidents and cost rows back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub app_id: String,
    pub location: String,
    pub resource_type: String,
    pub provider: String,
    pub region: String,
    pub environment: String,
    pub specifications: serde_json::Value,
    pub creation_date: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

/// `"The Woodlands"` -> `"the_woodlands"`.
pub fn location_slug(location: &str) -> String {
    location.to_lowercase().replace(' ', "_")
}

fn start_of_year(year: i32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn pick<R: Rng>(rng: &mut R, options: &[&'static str]) -> String {
    options.choose(rng).copied().unwrap_or("other").to_string()
}

pub fn build_application<R: Rng>(
    rng: &mut R,
    domain: Domain,
    year: i32,
    now: NaiveDateTime,
) -> Application {
    let profile = domain.profile();
    Application {
        app_id: profile.app_id(),
        name: profile.application_name.to_string(),
        description: profile.application_description.to_string(),
        criticality: pick(rng, &["high", "medium"]),
        business_unit: profile.business_unit.to_string(),
        business_service: profile.business_service.to_string(),
        owner: profile.owner.to_string(),
        creation_date: start_of_year(year),
        last_modified: now,
    }
}

pub fn build_resource<R: Rng>(
    rng: &mut R,
    domain: Domain,
    location: &str,
    year: i32,
    now: NaiveDateTime,
) -> Resource {
    let profile = domain.profile();
    let slug = location_slug(location);
    let (resource_id, provider, region, specifications) = match domain {
        Domain::Pos => (
            format!("{}-pos-terminal-{}", slug, rng.gen_range(100..=999)),
            "other".to_string(),
            "us-central-1".to_string(),
            json!({
                "os": pick(rng, &["Windows", "Linux"]),
                "cpu": "ARMv7",
                "memory_gb": 4,
                "storage_gb": 128,
            }),
        ),
        Domain::Ecommerce => (
            format!("{}-ecommerce-site", slug),
            pick(rng, &["aws", "azure", "gcp", "other"]),
            pick(rng, &["region-1", "dc-2", "gcp", "other"]),
            json!({
                "platform": "Custom",
                "language": "Python/JavaScript",
                "framework": "Django/React",
            }),
        ),
    };

    Resource {
        resource_id,
        app_id: profile.app_id(),
        location: location.to_string(),
        resource_type: profile.resource_type.to_string(),
        provider,
        region,
        environment: "prod".to_string(),
        specifications,
        creation_date: start_of_year(year),
        last_modified: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_pos_resource_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let r = build_resource(&mut rng, Domain::Pos, "The Woodlands", 2024, now());
        assert!(r.resource_id.starts_with("the_woodlands-pos-terminal-"));
        let suffix: u32 = r.resource_id.rsplit('-').next().unwrap().parse().unwrap();
        assert!((100..=999).contains(&suffix));
        assert_eq!(r.app_id, "retailpos-app-01");
        assert_eq!(r.resource_type, "POS Terminal");
        assert_eq!(r.specifications["memory_gb"], 4);
    }

    #[test]
    fn test_ecommerce_resource_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let r = build_resource(&mut rng, Domain::Ecommerce, "Dallas-Fort Worth", 2024, now());
        assert_eq!(r.resource_id, "dallas-fort_worth-ecommerce-site");
        assert!(["aws", "azure", "gcp", "other"].contains(&r.provider.as_str()));
    }

    #[test]
    fn test_application_record() {
        let mut rng = StdRng::seed_from_u64(5);
        let app = build_application(&mut rng, Domain::Ecommerce, 2025, now());
        assert_eq!(app.app_id, "ecommerceplatform-app-01");
        assert_eq!(app.creation_date.to_string(), "2025-01-01 00:00:00");
        assert!(app.criticality == "high" || app.criticality == "medium");
    }
}
