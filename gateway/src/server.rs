use crate::context::GatewayContext;
use crate::methods;
use hyper::Method;
use jsonrpsee::server::{AllowHosts, ServerBuilder};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub async fn run_server(context: GatewayContext) -> anyhow::Result<()> {
    let cors = CorsLayer::new().allow_methods([Method::POST]).allow_origin(Any).allow_headers([hyper::header::CONTENT_TYPE]);
    let middleware = ServiceBuilder::new().layer(cors);

    let host = format!("0.0.0.0:{}", context.config.port);

    let server = ServerBuilder::default()
        .set_host_filtering(AllowHosts::Any)
        .set_middleware(middleware)
        .max_request_body_size(10 * 1024 * 1024)
        .build(host.parse::<SocketAddr>()?)
        .await?;

    let mut module = RpcModule::new(context);
    module.register_async_method("join", methods::join)?;
    module.register_async_method("leave", methods::leave)?;
    module.register_async_method("rejoin", methods::rejoin)?;
    module.register_async_method("ready", methods::ready)?;
    module.register_async_method("input", methods::input)?;
    module.register_async_method("position", methods::position)?;
    module.register_subscription("subscribe_room", "s_room", "unsubscribe_room", methods::subscribe_room)?;

    let handle = server.start(module)?;
    info!(%host, "gateway listening");
    handle.stopped().await;
    Ok(())
}
