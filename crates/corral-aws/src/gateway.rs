//! REST API gateway wrapper (API Gateway v1; v2 is websockets).

use crate::client::Aws;
use anyhow::{Context, Result};
use aws_sdk_apigateway::types::{
    ApiKeySourceType, EndpointConfiguration, EndpointType, IntegrationType,
};

/// Invocation URI that connects an api method to the lambda service.
pub fn invocation_uri(region: &str, function_arn: &str) -> String {
    format!(
        "arn:aws:apigateway:{region}:lambda:path/2015-03-31/functions/{function_arn}/invocations"
    )
}

/// Public https endpoint of a routed function.
pub fn public_url(api_id: &str, region: &str, stage: &str, path_part: &str) -> String {
    format!("https://{api_id}.execute-api.{region}.amazonaws.com/{stage}/{path_part}")
}

/// Source ARN for the permission that lets the api invoke the function.
pub fn execute_api_arn(region: &str, account_id: &str, api_id: &str, path_part: &str) -> String {
    format!("arn:aws:execute-api:{region}:{account_id}:{api_id}/*/*/{path_part}")
}

/// One wired route on a deployed api.
#[derive(Debug, Clone)]
pub struct ApiRoute {
    pub api_id: String,
    pub path_part: String,
    pub url: String,
}

pub struct ApiGateway {
    client: aws_sdk_apigateway::Client,
    name: String,
    description: String,
    region: Option<String>,
    id: Option<String>,
}

impl ApiGateway {
    pub fn new(aws: &Aws, name: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            client: aws_sdk_apigateway::Client::new(aws.config()),
            name: name.into(),
            description: if description.is_empty() {
                "API Gateway for corral lambda functions".to_string()
            } else {
                description
            },
            region: aws.region().map(str::to_string),
            id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub async fn exists(&mut self) -> bool {
        self.load().await
    }

    /// Find the api by id, then fall back to a name scan. Names are the
    /// stable key here; the id changes whenever the api is recreated.
    /// The scan tops out at the service page limit of 500.
    pub async fn load(&mut self) -> bool {
        if self.id.is_some() {
            return true;
        }
        match self
            .client
            .get_rest_api()
            .rest_api_id(&self.name)
            .send()
            .await
        {
            Ok(out) => self.id = out.id().map(str::to_string),
            Err(err) => {
                let err = err.into_service_error();
                tracing::debug!("no api with id {}: {err}", self.name);
                match self.client.get_rest_apis().limit(500).send().await {
                    Ok(out) => {
                        for api in out.items() {
                            if api.name() == Some(self.name.as_str()) {
                                self.id = api.id().map(str::to_string);
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::debug!("failed to list apis: {}", err.into_service_error());
                    }
                }
            }
        }
        self.id.is_some()
    }

    /// Create the api if it does not exist yet.
    pub async fn save(&mut self) -> Result<()> {
        if self.exists().await {
            return Ok(());
        }
        let out = self
            .client
            .create_rest_api()
            .name(&self.name)
            .description(&self.description)
            .endpoint_configuration(
                EndpointConfiguration::builder()
                    .types(EndpointType::Edge)
                    .build(),
            )
            .api_key_source(ApiKeySourceType::Header)
            .send()
            .await
            .with_context(|| format!("failed to create api {}", self.name))?;
        self.id = out.id().map(str::to_string);
        tracing::info!("created api {}", self.name);
        Ok(())
    }

    /// Route `/{function}` on this api to the function and deploy the
    /// stage. Wiring is idempotent; conflicts left over from earlier runs
    /// are ignored.
    pub async fn add_lambda(
        &mut self,
        function_name: &str,
        function_arn: &str,
        stage: &str,
    ) -> Result<ApiRoute> {
        self.save().await?;
        let api_id = self.id.clone().context("api has no id after save")?;
        let region = self
            .region
            .clone()
            .context("no AWS region configured")?;

        let resources = self
            .client
            .get_resources()
            .rest_api_id(&api_id)
            .limit(500)
            .send()
            .await
            .context("failed to list api resources")?;
        let mut resource_id = None;
        let mut root_id = None;
        for item in resources.items() {
            if item.path_part() == Some(function_name) {
                resource_id = item.id().map(str::to_string);
            }
            if item.path() == Some("/") {
                root_id = item.id().map(str::to_string);
            }
        }
        let resource_id = match resource_id {
            Some(id) => id,
            None => {
                let root = root_id.context("api has no root resource")?;
                let out = self
                    .client
                    .create_resource()
                    .rest_api_id(&api_id)
                    .parent_id(root)
                    .path_part(function_name)
                    .send()
                    .await
                    .with_context(|| format!("failed to create api resource {function_name}"))?;
                out.id()
                    .map(str::to_string)
                    .context("created resource has no id")?
            }
        };

        // the route accepts any http method, no auth
        match self
            .client
            .put_method()
            .rest_api_id(&api_id)
            .resource_id(&resource_id)
            .http_method("ANY")
            .authorization_type("NONE")
            .send()
            .await
        {
            Ok(_) => {
                self.client
                    .put_method_response()
                    .rest_api_id(&api_id)
                    .resource_id(&resource_id)
                    .http_method("ANY")
                    .status_code("200")
                    .response_models("application/json", "Empty")
                    .send()
                    .await
                    .context("failed to put method response")?;
            }
            Err(err) => {
                let err = err.into_service_error();
                if !err.is_conflict_exception() {
                    return Err(anyhow::Error::from(err)).context("failed to put method");
                }
            }
        }

        let uri = invocation_uri(&region, function_arn);
        self.client
            .put_integration()
            .rest_api_id(&api_id)
            .resource_id(&resource_id)
            .http_method("ANY")
            .r#type(IntegrationType::AwsProxy)
            .integration_http_method("POST")
            .uri(&uri)
            .send()
            .await
            .context("failed to put integration")?;
        self.client
            .put_integration_response()
            .rest_api_id(&api_id)
            .resource_id(&resource_id)
            .http_method("ANY")
            .status_code("200")
            .response_templates("application/json", "")
            .send()
            .await
            .context("failed to put integration response")?;

        let stage = stage.to_lowercase();
        self.client
            .create_deployment()
            .rest_api_id(&api_id)
            .stage_name(&stage)
            .send()
            .await
            .with_context(|| format!("failed to deploy api stage {stage}"))?;
        tracing::info!("deployed {}/{function_name} to stage {stage}", self.name);

        Ok(ApiRoute {
            url: public_url(&api_id, &region, &stage, function_name),
            api_id,
            path_part: function_name.to_string(),
        })
    }

    /// Delete the api. The role and any invoke permissions survive.
    pub async fn delete(&mut self) -> bool {
        if !self.exists().await {
            return false;
        }
        let Some(id) = self.id.clone() else {
            return false;
        };
        if let Err(err) = self.client.delete_rest_api().rest_api_id(&id).send().await {
            tracing::error!(
                "failed to delete api {}: {}",
                self.name,
                err.into_service_error()
            );
            return false;
        }
        self.id = None;
        true
    }
}
