use fusebox::ServerBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let handle = ServerBuilder::from_env()?.start().await?;
	handle.wait().await?;
	Ok(())
}
