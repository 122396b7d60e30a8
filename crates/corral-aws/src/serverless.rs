//! One-call deploy: role, then function, then api route.

use crate::client::Aws;
use crate::gateway::{ApiGateway, execute_api_arn};
use crate::lambda::{FunctionSpec, LambdaFunction};
use crate::role::Role;
use anyhow::{Context, Result};
use corral_resolve::resolver::Resolver;

/// What a successful deploy produced.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub function_name: String,
    pub url: String,
}

/// Deploy `spec` behind a public url.
///
/// Order matters: the role must exist before the function can reference
/// it, and the function must exist before the api can route to it. A
/// freshly created role can take a few seconds to propagate inside IAM;
/// rerunning the deploy after a propagation failure is safe because every
/// step is idempotent.
pub async fn deploy(
    aws: &Aws,
    resolver: &mut Resolver,
    spec: FunctionSpec,
    role_name: &str,
    api_name: &str,
    stage: &str,
) -> Result<Deployment> {
    let region = aws
        .region()
        .context("no AWS region configured")?
        .to_string();

    let mut role = Role::new(aws, role_name, "execution role for corral lambda functions");
    role.save().await?;
    let role_arn = role.arn().context("role has no arn")?.to_string();
    let account_id = role
        .account_id()
        .context("role arn carries no account id")?
        .to_string();

    let mut func = LambdaFunction::new(aws, spec);
    func.save(resolver, &role_arn).await?;
    let function_arn = func.arn().context("function has no arn")?.to_string();

    let mut api = ApiGateway::new(aws, api_name, "");
    let route = api.add_lambda(func.name(), &function_arn, stage).await?;
    func.add_invoke_permission(&execute_api_arn(
        &region,
        &account_id,
        &route.api_id,
        &route.path_part,
    ))
    .await?;

    Ok(Deployment {
        function_name: func.name().to_string(),
        url: route.url,
    })
}
