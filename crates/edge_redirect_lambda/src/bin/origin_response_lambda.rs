use aws_sdk_s3::error::DisplayErrorContext;
use edge_redirect_core::contract::PrefixListing;
use edge_redirect_lambda::adapters::object_store::PrefixLister;
use edge_redirect_lambda::config::RedirectConfig;
use edge_redirect_lambda::handlers::origin_response::handle_origin_response;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct S3PrefixLister {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl PrefixLister for S3PrefixLister {
    fn list_prefix(&self, prefix: &str, delimiter: &str) -> Result<PrefixListing, String> {
        let bucket = self.bucket.clone();
        let key_prefix = prefix.to_string();
        let key_delimiter = delimiter.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                // One entry is enough to tell a directory from a missing key.
                client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(key_prefix)
                    .delimiter(key_delimiter)
                    .max_keys(1)
                    .send()
                    .await
                    .map(|output| PrefixListing {
                        common_prefixes: output
                            .common_prefixes()
                            .iter()
                            .map(|entry| entry.prefix().unwrap_or_default().to_string())
                            .collect(),
                        contents: output
                            .contents()
                            .iter()
                            .map(|object| object.key().unwrap_or_default().to_string())
                            .collect(),
                    })
                    .map_err(|error| {
                        format!("failed to list s3 prefix: {}", DisplayErrorContext(&error))
                    })
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RedirectConfig::from_env()?;

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = config.region.clone() {
        loader = loader.region(aws_config::Region::new(region));
    }
    let aws_config = loader.load().await;

    let lister = S3PrefixLister {
        bucket: config.bucket,
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let lister = &lister;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_origin_response(event.payload, lister).map_err(Error::from)
    }))
    .await
}
