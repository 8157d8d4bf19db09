#[tokio::main]
async fn main() {
    queuectl::boot::boot().await;
}
