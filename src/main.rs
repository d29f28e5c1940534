use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::header::{HOST, PROXY_AUTHORIZATION};
use hyper::{Request, Uri};
use tower_service::Service;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use proxy_dispatch::adapters::{default_dispatcher, HyperConnector, PacProxyResolver};
use proxy_dispatch::domain::{
    DispatchSettings, ProxyDispatcher, RequestOptions, TargetProtocol, TargetRequest, TlsOptions,
};

#[derive(Parser, Debug)]
#[clap(version = env!("PROXY_DISPATCH_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// Target URL (http, https, ws or wss)
    url: String,

    /// Settings file, instead of the per-user default
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Proxy for http targets
    #[clap(long)]
    http_proxy: Option<String>,

    /// Proxy for https targets
    #[clap(long)]
    https_proxy: Option<String>,

    /// Proxy for ws targets
    #[clap(long)]
    ws_proxy: Option<String>,

    /// Proxy for wss targets
    #[clap(long)]
    wss_proxy: Option<String>,

    /// Fallback proxy for every protocol
    #[clap(long)]
    all_proxy: Option<String>,

    /// Hosts that bypass the proxy
    #[clap(long)]
    no_proxy: Option<String>,

    /// PAC script consulted before anything else
    #[clap(long, short = 'p')]
    pac_url: Option<String>,

    /// Connect timeout in milliseconds
    #[clap(long)]
    connect_timeout_ms: Option<u64>,

    /// Skip certificate verification
    #[clap(long, short = 'k')]
    insecure: bool,
}

impl Opts {
    fn load_settings(&self) -> Result<DispatchSettings, confy::ConfyError> {
        let mut settings: DispatchSettings = match &self.config {
            Some(path) => confy::load_path(path)?,
            None => confy::load("proxy-dispatch", None)?,
        };

        let overrides = [
            (&mut settings.http_proxy, &self.http_proxy),
            (&mut settings.https_proxy, &self.https_proxy),
            (&mut settings.ws_proxy, &self.ws_proxy),
            (&mut settings.wss_proxy, &self.wss_proxy),
            (&mut settings.all_proxy, &self.all_proxy),
            (&mut settings.no_proxy, &self.no_proxy),
            (&mut settings.pac_url, &self.pac_url),
        ];
        for (setting, flag) in overrides {
            if flag.is_some() {
                *setting = flag.clone();
            }
        }
        if self.connect_timeout_ms.is_some() {
            settings.connect_timeout_ms = self.connect_timeout_ms;
        }
        settings.insecure |= self.insecure;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let settings = opts.load_settings()?;

    let mut config = settings.to_config();
    if let Some(pac_url) = &settings.pac_url {
        info!("Using PAC file at {}", pac_url);
        config = config.with_hook(Arc::new(PacProxyResolver::new(pac_url)?));
    }
    let dispatcher = Arc::new(default_dispatcher(config)?);

    let options = RequestOptions {
        tls: TlsOptions {
            reject_unauthorized: !settings.insecure,
            server_name: None,
        },
        ..Default::default()
    };
    let target = TargetRequest::new(Url::parse(&opts.url)?)?.with_options(options.clone());

    let result = match target.protocol {
        TargetProtocol::Ws | TargetProtocol::Wss => open_socket(&dispatcher, &target).await,
        TargetProtocol::Http | TargetProtocol::Https => fetch(&dispatcher, &target, options).await,
    };
    dispatcher.close().await;
    result
}

/// WebSocket targets: establish the stream and report the route only.
async fn open_socket(dispatcher: &ProxyDispatcher, target: &TargetRequest) -> Result<(), Box<dyn std::error::Error>> {
    let conn = dispatcher.connect(target).await?;
    println!("{} connected via {}", target.url, conn.route());
    Ok(())
}

/// One GET over a connection taken straight from the dispatcher, so the
/// route printed and the credentials sent are those of the stream in use.
async fn fetch(
    dispatcher: &Arc<ProxyDispatcher>,
    target: &TargetRequest,
    options: RequestOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let uri: Uri = target.url.as_str().parse()?;
    let mut connector = HyperConnector::new(dispatcher.clone()).with_options(options);
    let stream = connector.call(uri.clone()).await?;

    let conn = stream.connection();
    println!("route: {} {}", target.url, conn.route());
    let forwarding = conn.is_forwarding();
    let authorization = conn.proxy_authorization().map(str::to_string);

    let (mut sender, connection) = http1::handshake::<_, Empty<Bytes>>(stream).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("Connection error: {}", e);
        }
    });

    // Forwarding proxies expect absolute-form request targets.
    let request_target: Uri = if forwarding {
        uri.clone()
    } else {
        uri.path_and_query().map(|p| p.as_str()).unwrap_or("/").parse()?
    };
    let mut request = Request::get(request_target);
    if let Some(authority) = uri.authority() {
        request = request.header(HOST, authority.as_str());
    }
    if let Some(authorization) = authorization.filter(|_| forwarding) {
        request = request.header(PROXY_AUTHORIZATION, authorization);
    }

    let response = sender.send_request(request.body(Empty::new())?).await?;
    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    let body = response.into_body().collect().await?.to_bytes();
    match std::str::from_utf8(&body) {
        Ok(text) => println!("\n{}", text),
        Err(_) => warn!("Response body is not UTF-8 ({} bytes)", body.len()),
    }
    Ok(())
}
