//! AWS Lambda function that echoes normalized API Gateway requests.

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    apigw_adapter_echo::run().await
}
