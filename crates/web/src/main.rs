use std::sync::Arc;

use playback::{Dispatcher, LogSink, PlaybackConfig, ProviderSpec};
use web::{start_web_server, ServerConfig, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    // dispatcher
    let playback_config = PlaybackConfig::from_env();
    log::debug!("playback config: {:?}", playback_config);
    let dispatcher =
        Dispatcher::new(Arc::new(LogSink), ProviderSpec::defaults(), playback_config).spawn();

    // web server
    let server_config = ServerConfig::from_env();
    if let Err(why) = start_web_server(server_config, WebState { dispatcher }).await {
        log::error!("web server stopped: {}", why);
    }
}
