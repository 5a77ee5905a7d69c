use serde_json::json;

use super::names;
use crate::fragment::{Fragment, get_att};
use crate::synth::Ingress;

/// Hosted zone id CloudFront distributions (edge API endpoints) live in.
const CLOUDFRONT_ZONE_ID: &str = "Z2FDTNDATAQYW2";

impl Ingress<'_> {
    /// `{service}-lb.{zone}` pointing at the shared load balancer.
    pub fn lb_cname(&self) -> Fragment {
        let ctx = self.synth.ctx;
        Fragment::new(
            names::LB_CNAME,
            "AWS::Route53::RecordSetGroup",
            json!({
                "HostedZoneName": format!("{}.", self.zone.domain()),
                "Comment": format!("Load balancer alias for {}", ctx.service_name),
                "RecordSets": [{
                    "Name": ctx.lb_domain(self.zone),
                    "Type": "CNAME",
                    "TTL": "60",
                    "ResourceRecords": [self.lb.dns],
                }],
            }),
        )
    }

    /// `{service}.{zone}` aliased to the API's edge distribution.
    pub fn api_alias(&self) -> Fragment {
        Fragment::new(
            names::API_ALIAS,
            "AWS::Route53::RecordSet",
            json!({
                "HostedZoneName": format!("{}.", self.zone.domain()),
                "Name": self.synth.ctx.api_domain(self.zone),
                "Type": "A",
                "AliasTarget": {
                    "DNSName": get_att(names::CUSTOM_DOMAIN, "DistributionDomainName"),
                    "HostedZoneId": CLOUDFRONT_ZONE_ID,
                },
            }),
        )
        .depends_on([names::REST_API])
    }
}
