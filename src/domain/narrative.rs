//! Description templates for incident and problem records.
//!
//! These strings end up in the `description` field that downstream search and
//! question answering index, so each one names the category symptoms plainly.

use chrono::NaiveDateTime;

use super::AnomalyCategory;

const STAMP: &str = "%Y-%m-%d %H:%M";

pub fn incident_description(
    category: AnomalyCategory,
    application: &str,
    location: &str,
    resource_id: &str,
    at: NaiveDateTime,
) -> String {
    use AnomalyCategory::*;
    let lead = match category.domain() {
        super::Domain::Pos => format!(
            "Incident detected for {} at {} location, affecting terminal {} at {}. ",
            application,
            location,
            resource_id,
            at.format(STAMP)
        ),
        super::Domain::Ecommerce => format!(
            "Incident detected for {} at {} at {}. ",
            application,
            location,
            at.format(STAMP)
        ),
    };
    let body = match category {
        SystemMalfunction => format!(
            "The POS terminal {} is reporting a complete system malfunction, rendering it inoperable. Transactions cannot be processed.",
            resource_id
        ),
        PeakEventImpact => format!(
            "During a peak retail event, the POS system at {} experienced extreme load. Performance degradation or temporary transaction failures are likely due to high volume on terminal {}.",
            location, resource_id
        ),
        EmployeeInefficiency => format!(
            "Average transaction times on terminal {} have significantly increased, pointing to employee training needs or a subtle hardware/software issue impacting workflow.",
            resource_id
        ),
        SignificantTechnicalProblem => format!(
            "Terminal {} is logging a high volume of transaction and system errors, leading to low transaction success rates. A critical technical issue with the device or its network connection is suspected.",
            resource_id
        ),
        UnauthorizedShutdown => format!(
            "POS terminal {} at {} was unexpectedly shut down or logged out during normal operating hours, disrupting service.",
            resource_id, location
        ),
        NetworkConnectivityLoss => format!(
            "Intermittent or complete loss of network connectivity detected for POS terminal {}. Transactions are delayed and payment processing may fail.",
            resource_id
        ),
        HardwareFailure => format!(
            "POS terminal {} has experienced a critical hardware failure (touchscreen unresponsive, card reader broken), rendering it unusable for transactions.",
            resource_id
        ),
        SoftwareUpdateIssue => format!(
            "Since the latest software update, POS terminal {} is exhibiting intermittent errors, slow response times and occasional freezes during transaction processing.",
            resource_id
        ),
        WebsiteOutage => format!(
            "The e-commerce website for {} is completely inaccessible. All online transactions are failing. Affected resource: {}.",
            location, resource_id
        ),
        UnexpectedTrafficSurge => format!(
            "Unanticipated and massive traffic surge detected on the e-commerce platform for {}. System performance is degraded. Affected resource: {}.",
            location, resource_id
        ),
        PaymentProcessingIssues => format!(
            "Significant decline in successful payment transactions observed for {}. Customers are reporting payment failures and the payment gateway is under investigation. Affected resource: {}.",
            location, resource_id
        ),
        DdosAttack => format!(
            "Severe distributed denial of service (DDoS) attack in progress against {}'s e-commerce presence. High network load and service unavailability. Affected resource: {}.",
            location, resource_id
        ),
        ThirdPartyApiFailure => format!(
            "A critical third-party API (search, recommendations, shipping) is failing for {}'s online store. Customers may experience degraded functionality. Affected resource: {}.",
            location, resource_id
        ),
        FlashSaleGoneWrong => format!(
            "A flash sale for {} drew traffic beyond system capacity, leading to rapid service degradation and transaction failures. Affected resource: {}.",
            location, resource_id
        ),
    };
    lead + &body
}

pub fn problem_description(
    category: AnomalyCategory,
    application: &str,
    location: &str,
    opened: NaiveDateTime,
) -> String {
    use AnomalyCategory::*;
    let lead = format!(
        "Problem identified affecting {} at {} starting around {}. Root cause analysis required. ",
        application,
        location,
        opened.format(STAMP)
    );
    let body = match category {
        SystemMalfunction => "Persistent system malfunctions across terminals, or recurring ones on a single terminal, suggest a deeper software bug or a systemic configuration error.",
        EmployeeInefficiency => "A trend of increased transaction times indicates widespread device degradation, a need for revised employee training, or a flaw in the POS workflow itself.",
        SignificantTechnicalProblem => "Frequent high error counts and low transaction volumes point to an underlying technical issue with the POS infrastructure, such as network instability, server problems or database corruption.",
        UnauthorizedShutdown => "Repeated unauthorized shutdowns indicate potential security vulnerabilities, power management issues, or gaps in operational procedures.",
        NetworkConnectivityLoss => "Ongoing network connectivity issues suggest a failure in the store's local network infrastructure (router, switch, cabling) or ISP service.",
        HardwareFailure => "A pattern of hardware failures across terminals of the same model indicates a manufacturing defect or a widespread environmental issue.",
        SoftwareUpdateIssue => "Recurring issues following a software update point to a defect in the update package, insufficient testing, or peripheral compatibility problems.",
        WebsiteOutage => "Recurring or prolonged website outages indicate a fundamental instability in the hosting infrastructure or core application.",
        DdosAttack => "Repeated or sustained DDoS attacks highlight inadequate network protection. Long-term mitigation is required.",
        PaymentProcessingIssues => "Persistent payment failures suggest a systemic issue with the payment gateway integration, vendor reliability, or internal transaction processing logic.",
        ThirdPartyApiFailure => "Continuous external API failures point to an unstable third-party service or insufficient fallback handling within the application.",
        FlashSaleGoneWrong => "The impact of the failed flash sale shows a lack of load testing and capacity planning for high-demand promotions.",
        PeakEventImpact | UnexpectedTrafficSurge => "Ongoing or major incidents indicate a deeper systemic issue requiring a problem investigation.",
    };
    lead + body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap().and_hms_opt(14, 5, 0).unwrap()
    }

    #[test]
    fn test_incident_description_names_resource_and_time() {
        let d = incident_description(
            AnomalyCategory::HardwareFailure,
            "RetailPOS",
            "Houston",
            "houston-pos-terminal-123",
            at(),
        );
        assert!(d.starts_with("Incident detected for RetailPOS at Houston location"));
        assert!(d.contains("houston-pos-terminal-123"));
        assert!(d.contains("2024-02-20 14:05"));
        assert!(d.contains("hardware failure"));
    }

    #[test]
    fn test_problem_description_lead() {
        let d = problem_description(AnomalyCategory::WebsiteOutage, "ECommercePlatform", "Austin", at());
        assert!(d.contains("Root cause analysis required."));
        assert!(d.contains("website outages"));
    }
}
