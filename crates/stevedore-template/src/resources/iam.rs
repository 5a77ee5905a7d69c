use serde_json::{Value, json};

use super::names;
use crate::fragment::Fragment;
use crate::secrets::secrets_policy_statement;
use crate::synth::Synthesizer;

const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

const EXECUTION_ACTIONS: [&str; 6] = [
    "ecr:GetAuthorizationToken",
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

impl Synthesizer<'_> {
    /// Role ECS assumes to pull images, ship logs, and inject secrets.
    ///
    /// The secrets statement is present only when at least one secret
    /// resolved to an ARN.
    pub fn execution_role(&self) -> Fragment {
        let mut statements = vec![json!({
            "Effect": "Allow",
            "Action": EXECUTION_ACTIONS,
            "Resource": "*",
        })];
        if let Some(secrets) = secrets_policy_statement(self.all_secrets()) {
            statements.push(secrets);
        }

        Fragment::new(
            names::EXECUTION_ROLE,
            "AWS::IAM::Role",
            role_properties(
                format!("{}TaskExecution", self.ctx.service_name),
                statements,
            ),
        )
    }

    /// Role assumed by the application code inside the task.
    pub fn task_role(&self) -> Fragment {
        let statements = if self.config.task_permissions.is_empty() {
            Vec::new()
        } else {
            vec![json!({
                "Effect": "Allow",
                "Action": self.config.task_permissions,
                "Resource": "*",
            })]
        };

        Fragment::new(
            names::TASK_ROLE,
            "AWS::IAM::Role",
            role_properties(format!("{}TaskRole", self.ctx.service_name), statements),
        )
    }
}

fn role_properties(policy_name: String, statements: Vec<Value>) -> Value {
    let policies = if statements.is_empty() {
        json!([])
    } else {
        json!([{
            "PolicyName": policy_name,
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": statements,
            },
        }])
    };

    json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": [ECS_TASKS_PRINCIPAL] },
                "Action": ["sts:AssumeRole"],
            }],
        },
        "Path": "/",
        "Policies": policies,
    })
}
