//! Lambda function wrapper: bundle, upload, permit, invoke.

use crate::client::Aws;
use anyhow::{Context, Result, bail};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    Environment, FunctionCode, FunctionConfiguration, InvocationType, Runtime,
};
use corral_core::environ::Environ;
use corral_resolve::bundle::Bundler;
use corral_resolve::resolver::Resolver;
use std::path::PathBuf;

/// Everything needed to create or update one function.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    /// The Python file holding the handler.
    pub file: PathBuf,
    /// Function name on AWS; defaults to the file stem.
    pub name: String,
    /// `module.function` entry point.
    pub handler: String,
    /// Shown in the console; taken from the handler docstring.
    pub description: String,
    /// Runtime identifier, e.g. `python3.12`.
    pub runtime: String,
    /// Execution timeout in seconds.
    pub timeout: i32,
    /// Environment variables for the running function.
    pub environ: Environ,
}

pub struct LambdaFunction {
    client: aws_sdk_lambda::Client,
    spec: FunctionSpec,
    raw: Option<FunctionConfiguration>,
}

impl LambdaFunction {
    pub fn new(aws: &Aws, spec: FunctionSpec) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(aws.config()),
            spec,
            raw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn arn(&self) -> Option<&str> {
        self.raw.as_ref().and_then(|conf| conf.function_arn())
    }

    pub async fn exists(&mut self) -> bool {
        self.load().await
    }

    /// Fetch the function configuration unless it is already cached. A
    /// failed lookup means the function does not exist.
    pub async fn load(&mut self) -> bool {
        if self.raw.is_none() {
            match self
                .client
                .get_function()
                .function_name(&self.spec.name)
                .send()
                .await
            {
                Ok(out) => self.raw = out.configuration().cloned(),
                Err(err) => {
                    let err = err.into_service_error();
                    tracing::debug!("no function named {}: {err}", self.spec.name);
                }
            }
        }
        self.raw.is_some()
    }

    /// Bundle the handler with its resolved dependencies, then create the
    /// function or update its code and configuration in place.
    pub async fn save(&mut self, resolver: &mut Resolver, role_arn: &str) -> Result<()> {
        let deps = resolver.resolve_file(&self.spec.file);
        let bundle = Bundler::new()?.bundle(&self.spec.file, &deps)?;
        let code = bundle.read().context("failed to read bundle archive")?;

        let environment = Environment::builder()
            .set_variables(Some(self.spec.environ.to_map()))
            .build();
        let description = truncate_description(&self.spec.description);

        if self.exists().await {
            self.client
                .update_function_code()
                .function_name(&self.spec.name)
                .zip_file(Blob::new(code))
                .send()
                .await
                .with_context(|| format!("failed to update code for {}", self.spec.name))?;
            self.client
                .update_function_configuration()
                .function_name(&self.spec.name)
                .runtime(Runtime::from(self.spec.runtime.as_str()))
                .role(role_arn)
                .handler(&self.spec.handler)
                .timeout(self.spec.timeout)
                .description(description)
                .environment(environment)
                .send()
                .await
                .with_context(|| {
                    format!("failed to update configuration for {}", self.spec.name)
                })?;
            tracing::info!("updated function {}", self.spec.name);
        } else {
            self.client
                .create_function()
                .function_name(&self.spec.name)
                .runtime(Runtime::from(self.spec.runtime.as_str()))
                .role(role_arn)
                .handler(&self.spec.handler)
                .code(FunctionCode::builder().zip_file(Blob::new(code)).build())
                .timeout(self.spec.timeout)
                .description(description)
                .environment(environment)
                .send()
                .await
                .with_context(|| format!("failed to create function {}", self.spec.name))?;
            tracing::info!("created function {}", self.spec.name);
        }

        // refresh so arn() reflects what was just saved
        self.raw = None;
        self.load().await;
        Ok(())
    }

    /// Let the gateway invoke this function. A conflict means an earlier
    /// run already added the statement.
    pub async fn add_invoke_permission(&self, source_arn: &str) -> Result<()> {
        let res = self
            .client
            .add_permission()
            .function_name(&self.spec.name)
            .statement_id(format!("{}-invoke", self.spec.name))
            .action("lambda:InvokeFunction")
            .principal("apigateway.amazonaws.com")
            .source_arn(source_arn)
            .send()
            .await;
        if let Err(err) = res {
            let err = err.into_service_error();
            if !err.is_resource_conflict_exception() {
                return Err(anyhow::Error::from(err)).with_context(|| {
                    format!("failed to add invoke permission to {}", self.spec.name)
                });
            }
        }
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        self.client
            .delete_function()
            .function_name(&self.spec.name)
            .send()
            .await
            .with_context(|| format!("failed to delete function {}", self.spec.name))?;
        Ok(())
    }
}

/// Invoke a deployed function synchronously and decode its JSON response.
pub async fn invoke(aws: &Aws, name: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
    let client = aws_sdk_lambda::Client::new(aws.config());
    let body = serde_json::to_vec(&payload).context("failed to encode payload")?;
    let res = client
        .invoke()
        .function_name(name)
        .invocation_type(InvocationType::RequestResponse)
        .payload(Blob::new(body))
        .send()
        .await
        .with_context(|| format!("failed to invoke {name}"))?;
    if let Some(err) = res.function_error() {
        bail!("{name} raised an error: {err}");
    }
    match res.payload() {
        Some(blob) if !blob.as_ref().is_empty() => serde_json::from_slice(blob.as_ref())
            .with_context(|| format!("failed to decode response from {name}")),
        _ => Ok(serde_json::Value::Null),
    }
}

/// The service rejects descriptions over 256 characters.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > 256 {
        let head: String = description.chars().take(252).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_unchanged() {
        assert_eq!(truncate_description(""), "");
        assert_eq!(truncate_description("runs the thing"), "runs the thing");
        let exactly = "x".repeat(256);
        assert_eq!(truncate_description(&exactly), exactly);
    }

    #[test]
    fn test_long_description_truncated_with_ellipsis() {
        let long = "y".repeat(300);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.chars().count(), 255);
        assert!(truncated.ends_with("..."));
        assert!(truncated.starts_with("yyy"));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let wide = "\u{00e9}".repeat(300);
        let truncated = truncate_description(&wide);
        assert_eq!(truncated.chars().count(), 255);
    }
}
