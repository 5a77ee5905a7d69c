use chrono::{TimeZone, Utc};
use mockall::mock;
use stevedore_cloud::aws::AwsError;
use stevedore_cloud::client::{AwsClient, CredentialError, DeploymentError, RegistryError};
use stevedore_cloud::executor::AwsExecutor;
use stevedore_cloud::staleness::{
    MARKER_FILE, clear_deploy_start, primary_is_stale, read_deploy_start, record_deploy_start,
};
use tempfile::TempDir;

mock! {
    Executor {}

    impl AwsExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, AwsError>;
    }
}

fn failed(stderr: &str) -> AwsError {
    AwsError::CommandFailed {
        args: vec![],
        stderr: stderr.to_owned(),
    }
}

const NOT_FOUND: &str = "An error occurred (RepositoryNotFoundException) when calling the \
    DescribeRepositories operation: The repository with name 'shop/api' does not exist";

const REPOSITORY_JSON: &str = r#"{
    "repositoryName": "shop/api",
    "repositoryUri": "123456789012.dkr.ecr.us-east-1.amazonaws.com/shop/api",
    "repositoryArn": "arn:aws:ecr:us-east-1:123456789012:repository/shop/api"
}"#;

// ── ECR Tests ──

#[tokio::test]
async fn describe_repository_parses_first_entry() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| {
            args.contains(&"describe-repositories".to_owned())
                && args.contains(&"--registry-id".to_owned())
                && args.contains(&"shop/api".to_owned())
        })
        .times(1)
        .returning(|_| Ok(format!(r#"{{ "repositories": [{REPOSITORY_JSON}] }}"#)));

    let client = AwsClient::with_executor(mock);
    let repo = client
        .describe_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap();

    assert_eq!(repo.repository_name, "shop/api");
    assert!(repo.repository_uri.ends_with("/shop/api"));
}

#[tokio::test]
async fn describe_missing_repository_is_not_found() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| Err(failed(NOT_FOUND)));

    let client = AwsClient::with_executor(mock);
    let err = client
        .describe_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::NotFound { ref repository } if repository == "shop/api"));
}

#[tokio::test]
async fn describe_other_failure_is_not_not_found() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .returning(|_| Err(failed("An error occurred (AccessDeniedException)")));

    let client = AwsClient::with_executor(mock);
    let err = client
        .describe_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Describe { .. }));
}

#[tokio::test]
async fn ensure_repository_creates_only_when_missing() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args.contains(&"describe-repositories".to_owned()))
        .times(1)
        .returning(|_| Err(failed(NOT_FOUND)));
    mock.expect_exec()
        .withf(|args| {
            args.contains(&"create-repository".to_owned()) && args.contains(&"shop/api".to_owned())
        })
        .times(1)
        .returning(|_| Ok(format!(r#"{{ "repository": {REPOSITORY_JSON} }}"#)));

    let client = AwsClient::with_executor(mock);
    let repo = client
        .ensure_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap();

    assert_eq!(
        repo.repository_arn,
        "arn:aws:ecr:us-east-1:123456789012:repository/shop/api"
    );
}

#[tokio::test]
async fn ensure_existing_repository_does_not_create() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args.contains(&"describe-repositories".to_owned()))
        .times(1)
        .returning(|_| Ok(format!(r#"{{ "repositories": [{REPOSITORY_JSON}] }}"#)));
    mock.expect_exec()
        .withf(|args| args.contains(&"create-repository".to_owned()))
        .never();

    let client = AwsClient::with_executor(mock);
    client
        .ensure_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn ensure_repository_propagates_other_failures() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args.contains(&"describe-repositories".to_owned()))
        .returning(|_| Err(failed("Unable to locate credentials")));
    mock.expect_exec()
        .withf(|args| args.contains(&"create-repository".to_owned()))
        .never();

    let client = AwsClient::with_executor(mock);
    let err = client
        .ensure_repository("123456789012", "shop/api", "us-east-1")
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Describe { .. }));
}

#[tokio::test]
async fn delete_repository_forces_when_asked() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| {
            args.contains(&"delete-repository".to_owned()) && args.contains(&"--force".to_owned())
        })
        .times(1)
        .returning(|_| Ok("{}".to_owned()));

    let client = AwsClient::with_executor(mock);
    client
        .delete_repository("shop/api", "us-east-1", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn login_password_is_trimmed() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args.contains(&"get-login-password".to_owned()))
        .returning(|_| Ok("eyJwYXlsb2FkIjoi\n".to_owned()));

    let client = AwsClient::with_executor(mock);
    assert_eq!(
        client.login_password("us-east-1").await.unwrap(),
        "eyJwYXlsb2FkIjoi"
    );
}

#[tokio::test]
async fn empty_login_password_is_an_error() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| Ok("\n".to_owned()));

    let client = AwsClient::with_executor(mock);
    let err = client.login_password("us-east-1").await.unwrap_err();
    assert!(matches!(err, CredentialError::EmptyPassword { .. }));
}

// ── ECS Tests ──

#[tokio::test]
async fn describe_deployments_parses_iso_and_epoch_timestamps() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| {
            args.contains(&"describe-services".to_owned())
                && args.contains(&"main".to_owned())
                && args.contains(&"orders-dev-abc".to_owned())
        })
        .returning(|_| {
            Ok(r#"{
                "services": [{
                    "serviceName": "orders-dev-abc",
                    "deployments": [
                        {
                            "status": "PRIMARY",
                            "createdAt": "2024-05-01T12:00:00.123000+00:00",
                            "updatedAt": "2024-05-01T12:05:00+02:00"
                        },
                        {
                            "status": "ACTIVE",
                            "createdAt": 1714550400.0,
                            "updatedAt": 1714550400.5
                        }
                    ]
                }],
                "failures": []
            }"#
            .to_owned())
        });

    let client = AwsClient::with_executor(mock);
    let deployments = client
        .describe_service_deployments("main", "orders-dev-abc", "us-east-1")
        .await
        .unwrap();

    assert_eq!(deployments.len(), 2);
    assert!(deployments[0].is_primary());
    assert_eq!(
        deployments[0].updated_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap()
    );
    assert_eq!(
        deployments[1].created_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn describe_unknown_service_is_not_found() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .returning(|_| Ok(r#"{ "services": [], "failures": [{ "reason": "MISSING" }] }"#.to_owned()));

    let client = AwsClient::with_executor(mock);
    let err = client
        .describe_service_deployments("main", "orders-dev-abc", "us-east-1")
        .await
        .unwrap_err();

    assert!(matches!(err, DeploymentError::ServiceNotFound { .. }));
}

#[tokio::test]
async fn force_new_deployment_targets_service() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| {
            args.contains(&"update-service".to_owned())
                && args.contains(&"--force-new-deployment".to_owned())
                && args.contains(&"orders-dev-abc".to_owned())
        })
        .times(1)
        .returning(|_| Ok("{}".to_owned()));

    let client = AwsClient::with_executor(mock);
    client
        .force_new_deployment("main", "orders-dev-abc", "us-east-1")
        .await
        .unwrap();
}

// ── Staleness Tests ──

#[tokio::test]
async fn stale_primary_detected_from_described_deployments() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| {
        Ok(r#"{ "services": [{
            "serviceName": "svc",
            "deployments": [{
                "status": "PRIMARY",
                "createdAt": "2024-05-01T09:00:00Z",
                "updatedAt": "2024-05-01T09:30:00Z"
            }]
        }] }"#
            .to_owned())
    });

    let client = AwsClient::with_executor(mock);
    let deployments = client
        .describe_service_deployments("main", "svc", "us-east-1")
        .await
        .unwrap();

    let started = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    assert!(primary_is_stale(&deployments, started));
    let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    assert!(!primary_is_stale(&deployments, earlier));
}

#[test]
fn deploy_marker_round_trip() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(read_deploy_start(tmp.path()).unwrap(), None);

    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let path = record_deploy_start(tmp.path(), at).unwrap();

    assert_eq!(path, tmp.path().join(MARKER_FILE));
    assert_eq!(read_deploy_start(tmp.path()).unwrap(), Some(at));
}

#[test]
fn cleared_marker_is_gone() {
    let tmp = TempDir::new().unwrap();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    record_deploy_start(tmp.path(), at).unwrap();

    assert!(clear_deploy_start(tmp.path()).unwrap());
    assert_eq!(read_deploy_start(tmp.path()).unwrap(), None);
    assert!(!clear_deploy_start(tmp.path()).unwrap());
}

#[test]
fn corrupt_deploy_marker_is_an_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join(".stevedore")).unwrap();
    std::fs::write(tmp.path().join(MARKER_FILE), "yesterday").unwrap();

    assert!(read_deploy_start(tmp.path()).is_err());
}
