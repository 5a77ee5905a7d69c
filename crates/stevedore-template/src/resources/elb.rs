use serde_json::json;

use crate::fragment::{Fragment, reference};
use crate::synth::{Ingress, Route, collapse_slashes};

impl Ingress<'_> {
    pub fn target_group(&self, route: &Route<'_>) -> Fragment {
        let health = &route.container.health_check;

        Fragment::new(
            route.target_group_name(),
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "HealthCheckIntervalSeconds": 30,
                "HealthCheckPath": health.path,
                "HealthCheckProtocol": health.protocol,
                "HealthCheckPort": health.port.to_string(),
                "HealthyThresholdCount": 5,
                "UnhealthyThresholdCount": 5,
                "Matcher": { "HttpCode": health.codes },
                "Port": route.container.port,
                "Protocol": "HTTP",
                "TargetType": "ip",
                "VpcId": self.synth.config.network.vpc_id,
            }),
        )
    }

    /// Forwards the route's path prefix on the service hostnames to its target group.
    pub fn listener_rule(&self, route: &Route<'_>) -> Fragment {
        let ctx = self.synth.ctx;
        let target_group = route.target_group_name();

        Fragment::new(
            format!("{}ListenerRule", route.name()),
            "AWS::ElasticLoadBalancingV2::ListenerRule",
            json!({
                "Actions": [{
                    "Type": "forward",
                    "TargetGroupArn": reference(&target_group),
                }],
                "Conditions": [
                    {
                        "Field": "path-pattern",
                        "Values": path_patterns(route.path),
                    },
                    {
                        "Field": "host-header",
                        "Values": [ctx.api_domain(self.zone), ctx.lb_domain(self.zone)],
                    },
                ],
                "Priority": route.priority(),
                "ListenerArn": self.lb.listener_arn,
            }),
        )
        .depends_on([target_group])
    }
}

/// The exact prefix and everything below it, e.g. `/v1` and `/v1/*`.
pub fn path_patterns(path: &str) -> [String; 2] {
    let trimmed = path.trim_matches('/');
    [
        collapse_slashes(&format!("/{trimmed}")),
        collapse_slashes(&format!("/{trimmed}/*")),
    ]
}
