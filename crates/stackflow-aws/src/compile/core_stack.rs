//! Core stack: the deployment bucket the rest of the service is uploaded to

use crate::context::CommandContext;
use crate::error::Result;
use serde_json::json;
use stackflow_core::{CompilationContext, OutputSpec, ResourceSpec, intrinsic, naming};
use tracing::debug;

pub const TEMPLATE_DESCRIPTION: &str = "The AWS CloudFormation template for this stackflow service";

/// Starts a fresh compilation and freezes the create-stack template.
///
/// With a configured `deploymentBucket` nothing is generated and the core
/// template stays empty.
pub fn compile(ctx: &mut CommandContext) -> Result<()> {
    ctx.template = CompilationContext::new().with_description(TEMPLATE_DESCRIPTION);
    ctx.compiled = None;

    if ctx.service.provider.deployment_bucket.is_none() {
        ctx.template.put_resource(
            naming::DEPLOYMENT_BUCKET_ID,
            ResourceSpec::new("AWS::S3::Bucket").with_property(
                "BucketEncryption",
                json!({
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                    }]
                }),
            ),
        )?;
        ctx.template.put_resource(
            naming::DEPLOYMENT_BUCKET_POLICY_ID,
            bucket_policy(),
        )?;
        ctx.template.put_output(
            naming::DEPLOYMENT_BUCKET_OUTPUT_ID,
            OutputSpec::new(intrinsic::reference(naming::DEPLOYMENT_BUCKET_ID))
                .with_description("Name of the S3 bucket holding deployment artifacts"),
        )?;
    }

    ctx.core_template = Some(ctx.template.freeze()?);
    debug!(
        resources = ctx.template.resources().len(),
        "compiled core template"
    );
    Ok(())
}

/// Denies any request to the bucket that is not made over TLS
fn bucket_policy() -> ResourceSpec {
    let bucket_arn = intrinsic::join(
        "",
        vec![
            json!("arn:"),
            intrinsic::reference("AWS::Partition"),
            json!(":s3:::"),
            intrinsic::reference(naming::DEPLOYMENT_BUCKET_ID),
        ],
    );
    let objects_arn = intrinsic::join(
        "",
        vec![
            json!("arn:"),
            intrinsic::reference("AWS::Partition"),
            json!(":s3:::"),
            intrinsic::reference(naming::DEPLOYMENT_BUCKET_ID),
            json!("/*"),
        ],
    );

    ResourceSpec::new("AWS::S3::BucketPolicy")
        .with_property("Bucket", intrinsic::reference(naming::DEPLOYMENT_BUCKET_ID))
        .with_property(
            "PolicyDocument",
            json!({
                "Statement": [{
                    "Action": "s3:*",
                    "Effect": "Deny",
                    "Principal": "*",
                    "Resource": [objects_arn, bucket_arn],
                    "Condition": { "Bool": { "aws:SecureTransport": false } }
                }]
            }),
        )
}
