use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::json;
use stevedore_core::{
    ContainerRole, ContainerSpec, DeploymentContext, HealthCheck, HostedZone, LoadBalancer,
    NetworkPlacement, Registry, SecretRef, SecretStore, ServiceConfig,
};
use stevedore_template::{
    InfrastructureGraph, SynthesisError, SynthesisOptions, Synthesizer, Template, names,
};
use tempfile::TempDir;

const ACCOUNT: &str = "123456789012";

fn ctx() -> DeploymentContext {
    DeploymentContext {
        service_name: "orders".to_owned(),
        stage: "dev".to_owned(),
        region: "us-east-1".to_owned(),
        environment: BTreeMap::from([("LOG_LEVEL".to_owned(), "info".to_owned())]),
    }
}

fn container(name: &str, path: Option<&str>) -> ContainerSpec {
    ContainerSpec {
        name: name.to_owned(),
        role: match path {
            Some(p) => ContainerRole::Routable { path: p.to_owned() },
            None => ContainerRole::Internal,
        },
        port: 80,
        context: "./".to_owned(),
        dockerfile: "./Dockerfile".to_owned(),
        health_check: HealthCheck {
            path: "/".to_owned(),
            port: 80,
            protocol: "HTTP".to_owned(),
            codes: "200-299".to_owned(),
        },
        secrets: Vec::new(),
        environment: BTreeMap::new(),
        tag: None,
        priority: None,
    }
}

fn service(containers: Vec<ContainerSpec>) -> ServiceConfig {
    ServiceConfig {
        cluster: "main".to_owned(),
        network: NetworkPlacement {
            vpc_id: "vpc-1".to_owned(),
            subnets: vec!["subnet-1".to_owned()],
            security_groups: vec!["sg-1".to_owned()],
            assign_public_ip: false,
        },
        scale: 1,
        cpu: 1024,
        memory: 2048,
        registry: Registry {
            account_id: ACCOUNT.to_owned(),
            namespace: None,
        },
        hosted_zone: Some(HostedZone {
            name: "example.com.".to_owned(),
            certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc".to_owned(),
        }),
        load_balancer: Some(LoadBalancer {
            dns: "shared-lb.us-east-1.elb.amazonaws.com".to_owned(),
            listener_arn: "arn:aws:elasticloadbalancing:listener/app/shared/1/2".to_owned(),
        }),
        task_permissions: vec!["sns:Publish".to_owned()],
        containers,
    }
}

fn options(deployment_id: &str) -> SynthesisOptions {
    SynthesisOptions {
        tag: "abc123".to_owned(),
        deployment_id: deployment_id.to_owned(),
    }
}

fn synthesize(config: &ServiceConfig) -> InfrastructureGraph {
    let ctx = ctx();
    Synthesizer::new(config, &ctx)
        .unwrap()
        .synthesize(&options("1"))
        .unwrap()
        .graph
}

fn kinds(graph: &InfrastructureGraph) -> Vec<String> {
    graph
        .resources()
        .map(|(_, resource)| resource.kind.clone())
        .collect()
}

// ── Ingress gating ──

#[test]
fn internal_only_service_has_no_ingress_resources() {
    let graph = synthesize(&service(vec![
        container("worker", None),
        container("cron", None),
    ]));

    for kind in kinds(&graph) {
        assert!(
            !kind.starts_with("AWS::Route53::")
                && !kind.starts_with("AWS::ApiGateway::")
                && !kind.starts_with("AWS::ElasticLoadBalancingV2::"),
            "unexpected ingress resource {kind}"
        );
    }
    assert!(graph.contains(names::SERVICE));
    assert!(graph.to_json().unwrap()["Outputs"].get("ServiceEndpoint").is_none());
}

#[test]
fn internal_only_service_needs_no_zone_or_listener() {
    let mut config = service(vec![container("worker", None)]);
    config.hosted_zone = None;
    config.load_balancer = None;

    let graph = synthesize(&config);
    assert_eq!(
        graph.get(names::SERVICE).unwrap().properties["LoadBalancers"],
        json!([])
    );
}

#[test]
fn routable_container_without_zone_is_rejected() {
    let mut config = service(vec![container("api", Some("/v1"))]);
    config.hosted_zone = None;
    let ctx = ctx();

    let err = Synthesizer::new(&config, &ctx).unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::IngressNotConfigured { ref container, .. } if container == "api"
    ));
}

#[test]
fn routable_container_gets_full_ingress_chain() {
    let graph = synthesize(&service(vec![
        container("api", Some("/v1/")),
        container("worker", None),
    ]));

    for name in [
        "CName",
        "RestAPI",
        "CustomDomain",
        "ApiDnsEntry",
        "apiTargetGroup",
        "apiListenerRule",
        "apiPathResource",
        "apiPathMethod",
        "apiProxyResource",
        "apiProxyMethod",
        "Stage1",
        "BasePathMapping",
    ] {
        assert!(graph.contains(name), "missing {name}");
    }
    assert!(!graph.contains("workerTargetGroup"));
    assert!(!graph.contains("workerPathMethod"));
}

// ── Naming and routing ──

#[test]
fn listener_rule_patterns_and_hosts() {
    let graph = synthesize(&service(vec![container("api", Some("/v1/"))]));
    let rule = &graph.get("apiListenerRule").unwrap().properties;

    assert_eq!(rule["Conditions"][0]["Values"], json!(["/v1", "/v1/*"]));
    assert_eq!(
        rule["Conditions"][1]["Values"],
        json!(["orders.example.com", "orders-lb.example.com"])
    );
    assert_eq!(rule["Priority"], 1);
}

#[test]
fn listener_priority_follows_config_order_unless_overridden() {
    let mut admin = container("admin", Some("/admin"));
    admin.priority = Some(42);
    let graph = synthesize(&service(vec![
        container("worker", None),
        container("api", Some("/v1")),
        admin,
    ]));

    assert_eq!(graph.get("apiListenerRule").unwrap().properties["Priority"], 2);
    assert_eq!(graph.get("adminListenerRule").unwrap().properties["Priority"], 42);
}

#[test]
fn proxy_integration_targets_load_balancer_domain() {
    let graph = synthesize(&service(vec![container("api", Some("/v1"))]));

    let path = &graph.get("apiPathMethod").unwrap().properties;
    assert_eq!(path["Integration"]["Uri"], "https://orders-lb.example.com/v1");

    let proxy = &graph.get("apiProxyMethod").unwrap().properties;
    assert_eq!(
        proxy["Integration"]["Uri"],
        "https://orders-lb.example.com/v1/{proxy}"
    );
    assert_eq!(proxy["ResourceId"], json!({ "Ref": "apiProxyResource" }));
}

#[test]
fn root_path_mounts_on_api_root() {
    let graph = synthesize(&service(vec![container("web", Some("/"))]));

    assert!(!graph.contains("webPathResource"));
    assert!(graph.contains("webRootMethod"));
    let proxy = &graph.get("webProxyResource").unwrap().properties;
    assert_eq!(
        proxy["ParentId"],
        json!({ "Fn::GetAtt": ["RestAPI", "RootResourceId"] })
    );
    assert_eq!(
        graph.get("webProxyMethod").unwrap().properties["Integration"]["Uri"],
        "https://orders-lb.example.com/{proxy}"
    );
}

#[test]
fn names_are_derived_from_service_stage_and_tag() {
    let graph = synthesize(&service(vec![container("api", Some("/v1"))]));

    let svc = &graph.get(names::SERVICE).unwrap().properties;
    assert_eq!(svc["ServiceName"], "orders-dev-abc123");

    let task = &graph.get(names::TASK_DEFINITION).unwrap().properties;
    assert_eq!(task["Family"], "orders-ecs-service-dev");
    assert_eq!(
        task["ContainerDefinitions"][0]["Image"],
        "123456789012.dkr.ecr.us-east-1.amazonaws.com/api:abc123"
    );
    assert_eq!(
        graph.get(names::LOG_GROUP).unwrap().properties["LogGroupName"],
        "orders-ecs-service-dev"
    );
}

// ── Dependency edges ──

#[test]
fn service_depends_on_every_target_group() {
    let graph = synthesize(&service(vec![
        container("api", Some("/v1")),
        container("admin", Some("/admin")),
        container("worker", None),
    ]));

    let svc = graph.get(names::SERVICE).unwrap();
    assert_eq!(svc.depends_on, vec!["apiTargetGroup", "adminTargetGroup"]);
    assert_eq!(
        graph.get("apiListenerRule").unwrap().depends_on,
        vec!["apiTargetGroup"]
    );
}

#[test]
fn deployment_depends_on_every_method() {
    let graph = synthesize(&service(vec![
        container("api", Some("/v1")),
        container("web", Some("/")),
    ]));

    let deployment = graph.get("Stage1").unwrap();
    assert_eq!(
        deployment.depends_on,
        vec!["apiPathMethod", "apiProxyMethod", "webProxyMethod", "webRootMethod"]
    );
    assert_eq!(
        graph.get(names::BASE_PATH_MAPPING).unwrap().depends_on,
        vec!["Stage1"]
    );
    assert_eq!(
        graph.get(names::API_ALIAS).unwrap().depends_on,
        vec![names::REST_API]
    );
}

#[test]
fn deployment_name_follows_deployment_id() {
    let config = service(vec![container("api", Some("/v1"))]);
    let ctx = ctx();
    let synth = Synthesizer::new(&config, &ctx).unwrap();

    let graph = synth.synthesize(&options("1700000000000")).unwrap().graph;
    assert!(graph.contains("Stage1700000000000"));
    assert!(!graph.contains("Stage1"));
}

#[test]
fn deployment_id_must_be_a_logical_id_suffix() {
    let config = service(vec![container("api", Some("/v1"))]);
    let ctx = ctx();
    let synth = Synthesizer::new(&config, &ctx).unwrap();

    for id in ["", "v-2", "2024.1", "a b"] {
        let err = synth.synthesize(&options(id)).unwrap_err();
        assert_eq!(err, SynthesisError::InvalidDeploymentId(id.to_owned()), "{id:?}");
    }
}

// ── Secrets ──

#[test]
fn ssm_and_kms_secrets_grant_two_wildcarded_arns() {
    let mut api = container("api", Some("/v1"));
    api.secrets = vec![
        SecretRef {
            name: "DB_PASSWORD".to_owned(),
            store: SecretStore::parse("ssm"),
            id: "orders/db".to_owned(),
        },
        SecretRef {
            name: "SIGNING_KEY".to_owned(),
            store: SecretStore::parse("kms"),
            id: "key-1".to_owned(),
        },
    ];
    let graph = synthesize(&service(vec![api]));

    let role = &graph.get(names::EXECUTION_ROLE).unwrap().properties;
    let statements = &role["Policies"][0]["PolicyDocument"]["Statement"];
    assert_eq!(
        statements[1]["Resource"],
        json!([
            "arn:aws:ssm:us-east-1:123456789012:parameter/orders/db*",
            "arn:aws:kms:us-east-1:123456789012:key/key-1*",
        ])
    );

    let task = &graph.get(names::TASK_DEFINITION).unwrap().properties;
    assert_eq!(
        task["ContainerDefinitions"][0]["Secrets"][0],
        json!({
            "Name": "DB_PASSWORD",
            "ValueFrom": "arn:aws:ssm:us-east-1:123456789012:parameter/orders/db",
        })
    );
}

#[test]
fn unsupported_secret_is_skipped_and_reported() {
    let mut api = container("api", Some("/v1"));
    api.secrets = vec![
        SecretRef {
            name: "TOKEN".to_owned(),
            store: SecretStore::parse("vault"),
            id: "kv/token".to_owned(),
        },
        SecretRef {
            name: "DB_PASSWORD".to_owned(),
            store: SecretStore::parse("secretsmanager"),
            id: "orders/db".to_owned(),
        },
    ];
    let config = service(vec![api]);
    let ctx = ctx();

    let synth = Synthesizer::new(&config, &ctx).unwrap();
    assert_eq!(synth.skipped_secrets().len(), 1);
    let synthesis = synth.synthesize(&options("1")).unwrap();

    assert_eq!(synthesis.skipped_secrets.len(), 1);
    assert_eq!(synthesis.skipped_secrets[0].secret, "TOKEN");
    assert_eq!(synthesis.skipped_secrets[0].store, "vault");

    let role = &synthesis.graph.get(names::EXECUTION_ROLE).unwrap().properties;
    let resources = role["Policies"][0]["PolicyDocument"]["Statement"][1]["Resource"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(resources.len(), 1);
    assert!(resources.iter().all(|r| !r.as_str().unwrap().contains("kv/token")));

    let task = &synthesis.graph.get(names::TASK_DEFINITION).unwrap().properties;
    assert_eq!(
        task["ContainerDefinitions"][0]["Secrets"].as_array().unwrap().len(),
        1
    );
}

#[test]
fn no_secrets_means_no_secrets_statement() {
    let graph = synthesize(&service(vec![container("api", Some("/v1"))]));
    let role = &graph.get(names::EXECUTION_ROLE).unwrap().properties;
    assert_eq!(
        role["Policies"][0]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

// ── Whole-pass properties ──

#[test]
fn synthesis_is_idempotent() {
    let config = service(vec![
        container("api", Some("/v1/")),
        container("worker", None),
    ]);
    assert_eq!(synthesize(&config), synthesize(&config));
}

#[test]
fn synthesized_graph_merges_into_host_template() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("template.json");
    std::fs::write(
        &path,
        serde_json::to_string(&json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": { "Bucket": { "Type": "AWS::S3::Bucket" } }
        }))
        .unwrap(),
    )
    .unwrap();

    let graph = synthesize(&service(vec![container("api", Some("/v1"))]));
    let mut template = Template::load(&path).unwrap();
    template.merge_graph(&graph).unwrap();
    // Second merge of the same graph changes nothing
    let once = template.clone();
    template.merge_graph(&graph).unwrap();
    assert_eq!(template, once);

    template.write(&path).unwrap();
    let reloaded = Template::load(&path).unwrap();
    assert!(reloaded.resource("Bucket").is_some());
    assert_eq!(
        reloaded.resource("apiTargetGroup").unwrap()["Type"],
        "AWS::ElasticLoadBalancingV2::TargetGroup"
    );
    assert_eq!(
        reloaded.output("ServiceEndpoint").unwrap()["Value"],
        "https://orders.example.com"
    );
}

#[test]
fn template_rejects_foreign_resource_with_same_name() {
    let mut template = Template::empty();
    let mut foreign = InfrastructureGraph::new();
    foreign
        .merge(stevedore_template::Fragment::new(
            names::LOG_GROUP,
            "AWS::Logs::LogGroup",
            json!({ "LogGroupName": "someone-else" }),
        ))
        .unwrap();
    template.merge_graph(&foreign).unwrap();

    let graph = synthesize(&service(vec![container("worker", None)]));
    assert!(template.merge_graph(&graph).is_err());
}

proptest! {
    #[test]
    fn container_cpu_is_floor_of_task_cpu(cpu in 1u32..=16384, count in 1usize..=10) {
        let containers = (0..count)
            .map(|i| container(&format!("c{i}"), None))
            .collect();
        let mut config = service(containers);
        config.cpu = cpu;

        let graph = synthesize(&config);
        let task = &graph.get(names::TASK_DEFINITION).unwrap().properties;
        let defs = task["ContainerDefinitions"].as_array().unwrap();

        let expected = cpu / u32::try_from(count).unwrap();
        let mut total = 0u64;
        for def in defs {
            let assigned = def["Cpu"].as_u64().unwrap();
            prop_assert_eq!(assigned, u64::from(expected));
            total += assigned;
        }
        prop_assert!(total <= u64::from(cpu));
    }

    #[test]
    fn listener_patterns_never_double_slash(path in "/{0,3}[a-z]{1,8}(/[a-z]{1,8}){0,2}/{0,3}") {
        let [exact, nested] = stevedore_template::path_patterns(&path);
        prop_assert!(!exact.contains("//"));
        prop_assert!(!nested.contains("//"));
        prop_assert_eq!(format!("{exact}/*"), nested);
    }
}
