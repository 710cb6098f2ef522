use resilient_http::{HttpRequest, RetryClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("TARGET_URL")?;

    // Retry settings come from BASE_BACKOFF_MS, MAX_ATTEMPTS, RETRY_STATUS_SET, ...
    let client = RetryClient::from_env();
    println!("policy: {:?}", client.retry_policy());

    let response = client.send_async_with_retry(&HttpRequest::get(url)).await?;

    println!("status: {}", response.status());
    println!("{}", response.text());

    Ok(())
}
