use serde_json::{Value, json};

use super::names;
use crate::fragment::{Fragment, get_att, reference};
use crate::synth::{Ingress, Route};

const PROXY_PARAM: &str = "method.request.path.proxy";

impl Ingress<'_> {
    pub fn rest_api(&self) -> Fragment {
        let service = &self.synth.ctx.service_name;
        Fragment::new(
            names::REST_API,
            "AWS::ApiGateway::RestApi",
            json!({
                "Description": format!("API for {service}"),
                "Name": service,
                "EndpointConfiguration": { "Types": ["EDGE"] },
            }),
        )
    }

    pub fn custom_domain(&self) -> Fragment {
        Fragment::new(
            names::CUSTOM_DOMAIN,
            "AWS::ApiGateway::DomainName",
            json!({
                "CertificateArn": self.zone.certificate_arn,
                "DomainName": self.synth.ctx.api_domain(self.zone),
            }),
        )
    }

    /// Maps the custom domain onto the deployed stage.
    pub fn base_path_mapping(&self, deployment: &str) -> Fragment {
        Fragment::new(
            names::BASE_PATH_MAPPING,
            "AWS::ApiGateway::BasePathMapping",
            json!({
                "DomainName": reference(names::CUSTOM_DOMAIN),
                "RestApiId": reference(names::REST_API),
                "Stage": self.synth.ctx.stage,
            }),
        )
        .depends_on([deployment])
    }

    /// Resource for the route's path under the API root.
    ///
    /// Root routes have no path resource; their methods hang off the root.
    pub fn path_resource(&self, route: &Route<'_>) -> Fragment {
        Fragment::new(
            path_resource_name(route),
            "AWS::ApiGateway::Resource",
            json!({
                "ParentId": get_att(names::REST_API, "RootResourceId"),
                "RestApiId": reference(names::REST_API),
                "PathPart": route.trimmed_path(),
            }),
        )
    }

    /// `ANY` on the route's own path, proxied to the load balancer.
    pub fn path_method(&self, route: &Route<'_>) -> Fragment {
        let (name, resource_id) = if route.is_root() {
            (
                format!("{}RootMethod", route.name()),
                get_att(names::REST_API, "RootResourceId"),
            )
        } else {
            (
                format!("{}PathMethod", route.name()),
                reference(&path_resource_name(route)),
            )
        };

        Fragment::new(
            name,
            "AWS::ApiGateway::Method",
            json!({
                "HttpMethod": "ANY",
                "ResourceId": resource_id,
                "AuthorizationType": "NONE",
                "Integration": {
                    "IntegrationHttpMethod": "ANY",
                    "Type": "HTTP_PROXY",
                    "Uri": self.upstream_uri(route, ""),
                },
                "RestApiId": reference(names::REST_API),
            }),
        )
        .api_method()
    }

    /// Greedy `{proxy+}` child of the route's path.
    pub fn proxy_resource(&self, route: &Route<'_>) -> Fragment {
        Fragment::new(
            format!("{}ProxyResource", route.name()),
            "AWS::ApiGateway::Resource",
            json!({
                "ParentId": parent_of_proxy(route),
                "RestApiId": reference(names::REST_API),
                "PathPart": "{proxy+}",
            }),
        )
    }

    pub fn proxy_method(&self, route: &Route<'_>) -> Fragment {
        Fragment::new(
            format!("{}ProxyMethod", route.name()),
            "AWS::ApiGateway::Method",
            json!({
                "HttpMethod": "ANY",
                "AuthorizationType": "NONE",
                "RequestParameters": { PROXY_PARAM: true },
                "ResourceId": reference(&format!("{}ProxyResource", route.name())),
                "RestApiId": reference(names::REST_API),
                "Integration": {
                    "IntegrationHttpMethod": "ANY",
                    "Type": "HTTP_PROXY",
                    "Uri": self.upstream_uri(route, "{proxy}"),
                    "CacheKeyParameters": [PROXY_PARAM],
                    "RequestParameters": {
                        "integration.request.path.proxy": PROXY_PARAM,
                    },
                    "PassthroughBehavior": "WHEN_NO_MATCH",
                },
            }),
        )
        .api_method()
    }

    /// API deployment for the stage, created after every method it exposes.
    ///
    /// `id` becomes part of the logical name, so a new id forces a new
    /// deployment on the next stack update.
    pub fn deployment(&self, id: &str, methods: Vec<String>) -> Fragment {
        let ctx = self.synth.ctx;
        Fragment::new(
            format!("Stage{id}"),
            "AWS::ApiGateway::Deployment",
            json!({
                "Description": format!("{} stage {}", ctx.service_name, ctx.stage),
                "RestApiId": reference(names::REST_API),
                "StageName": ctx.stage,
            }),
        )
        .depends_on(methods)
    }

    fn upstream_uri(&self, route: &Route<'_>, suffix: &str) -> String {
        let host = self.synth.ctx.lb_domain(self.zone);
        [route.trimmed_path(), suffix]
            .into_iter()
            .filter(|part| !part.is_empty())
            .fold(format!("https://{host}"), |uri, part| format!("{uri}/{part}"))
    }
}

fn path_resource_name(route: &Route<'_>) -> String {
    format!("{}PathResource", route.name())
}

fn parent_of_proxy(route: &Route<'_>) -> Value {
    if route.is_root() {
        get_att(names::REST_API, "RootResourceId")
    } else {
        reference(&path_resource_name(route))
    }
}
