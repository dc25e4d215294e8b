use fusebox::{ServerBuilder, ServerHandle, Settings};

/// Start a server on an ephemeral port with a fast maintenance tick.
pub async fn spawn_server() -> ServerHandle {
	spawn_server_with(|_| {}).await
}

pub async fn spawn_server_with(tweak: impl FnOnce(&mut Settings)) -> ServerHandle {
	let mut settings = Settings::default();
	settings.server.port = 0;
	settings.maintenance.interval_ms = 100;
	tweak(&mut settings);
	ServerBuilder::with_settings(settings)
		.start()
		.await
		.expect("server should start on an ephemeral port")
}
