//! Secret ARN resolution and the execution-role read grant.

use serde_json::{Value, json};
use stevedore_core::{ContainerSpec, SecretRef, SecretStore};

/// Actions the execution role needs to inject secrets at task start.
pub const SECRET_READ_ACTIONS: [&str; 3] = [
    "ssm:GetParameters",
    "secretsmanager:GetSecretValue",
    "kms:Decrypt",
];

/// A secret whose backing store is known, with its fully-qualified ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub name: String,
    pub arn: String,
}

/// A secret dropped from synthesis because its store is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{store} is not a supported type for secret {secret} (container '{container}')")]
pub struct UnsupportedSecretType {
    pub container: String,
    pub secret: String,
    pub store: String,
}

/// ARN of a secret in `region` under `account`.
pub fn secret_arn(secret: &SecretRef, region: &str, account: &str) -> Option<String> {
    let id = &secret.id;
    match &secret.store {
        SecretStore::ParameterStore => Some(format!("arn:aws:ssm:{region}:{account}:parameter/{id}")),
        SecretStore::KeyManagement => Some(format!("arn:aws:kms:{region}:{account}:key/{id}")),
        SecretStore::SecretsManager => Some(format!(
            "arn:aws:secretsmanager:{region}:{account}:secret:{id}"
        )),
        SecretStore::Unsupported(_) => None,
    }
}

/// Resolve every secret of a container, splitting off the unsupported ones.
pub fn resolve_container_secrets(
    container: &ContainerSpec,
    region: &str,
    account: &str,
) -> (Vec<ResolvedSecret>, Vec<UnsupportedSecretType>) {
    let mut resolved = Vec::new();
    let mut skipped = Vec::new();

    for secret in &container.secrets {
        match secret_arn(secret, region, account) {
            Some(arn) => resolved.push(ResolvedSecret {
                name: secret.name.clone(),
                arn,
            }),
            None => {
                let unsupported = UnsupportedSecretType {
                    container: container.name.clone(),
                    secret: secret.name.clone(),
                    store: secret.store.as_str().to_owned(),
                };
                tracing::warn!(%unsupported, "skipping secret");
                skipped.push(unsupported);
            }
        }
    }

    (resolved, skipped)
}

/// Policy statement granting read access to every resolved secret.
///
/// Returns `None` when there is nothing to grant.
pub fn secrets_policy_statement<'a, I>(secrets: I) -> Option<Value>
where
    I: IntoIterator<Item = &'a ResolvedSecret>,
{
    let resources: Vec<String> = secrets.into_iter().map(|s| format!("{}*", s.arn)).collect();
    if resources.is_empty() {
        return None;
    }

    Some(json!({
        "Effect": "Allow",
        "Action": SECRET_READ_ACTIONS,
        "Resource": resources,
    }))
}
