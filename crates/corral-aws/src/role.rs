//! IAM execution role for the function and its gateway.

use crate::client::Aws;
use anyhow::{Context, Result};
use aws_sdk_iam::types::Role as RoleData;

/// Trust policy letting the lambda and apigateway services assume the
/// role.
fn assume_role_policy() -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": [
                        "lambda.amazonaws.com",
                        "apigateway.amazonaws.com"
                    ]
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

/// The account id is the fifth colon-separated ARN field.
pub fn account_id_from_arn(arn: &str) -> Option<&str> {
    arn.split(':').nth(4).filter(|id| !id.is_empty())
}

pub struct Role {
    client: aws_sdk_iam::Client,
    name: String,
    description: String,
    raw: Option<RoleData>,
}

impl Role {
    pub fn new(aws: &Aws, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_iam::Client::new(aws.config()),
            name: name.into(),
            description: description.into(),
            raw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> Option<&str> {
        self.raw.as_ref().map(|role| role.arn())
    }

    pub fn account_id(&self) -> Option<&str> {
        self.arn().and_then(account_id_from_arn)
    }

    pub async fn exists(&mut self) -> bool {
        self.load().await
    }

    /// Fetch the role unless it is already cached. A failed lookup means
    /// the role does not exist.
    pub async fn load(&mut self) -> bool {
        if self.raw.is_none() {
            match self.client.get_role().role_name(&self.name).send().await {
                Ok(out) => self.raw = out.role().cloned(),
                Err(err) => {
                    let err = err.into_service_error();
                    tracing::debug!("no role named {}: {err}", self.name);
                }
            }
        }
        self.raw.is_some()
    }

    /// Create the role if it does not exist yet.
    pub async fn save(&mut self) -> Result<()> {
        if self.exists().await {
            return Ok(());
        }
        let policy = serde_json::to_string(&assume_role_policy())
            .context("failed to encode assume-role policy")?;
        let out = self
            .client
            .create_role()
            .role_name(&self.name)
            .description(&self.description)
            .assume_role_policy_document(policy)
            .send()
            .await
            .with_context(|| format!("failed to create role {}", self.name))?;
        self.raw = out.role().cloned();
        tracing::info!("created role {}", self.name);
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        self.client
            .delete_role()
            .role_name(&self.name)
            .send()
            .await
            .with_context(|| format!("failed to delete role {}", self.name))?;
        Ok(())
    }
}

/// Names of every role in the account.
pub async fn list_role_names(aws: &Aws) -> Result<Vec<String>> {
    let client = aws_sdk_iam::Client::new(aws.config());
    let mut names = Vec::new();
    let mut pages = client.list_roles().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.context("failed to list roles")?;
        for role in page.roles() {
            names.push(role.role_name().to_string());
        }
    }
    Ok(names)
}
