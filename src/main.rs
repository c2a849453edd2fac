use clap::Parser;
use imageopto::config::Config;
use imageopto::server::AdminGateway;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;

/// Imageopto admin service - pushes Fastly image optimization settings
#[derive(Parser, Debug)]
#[command(name = "imageopto")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() {
    // Initialize logging subsystem
    imageopto::logging::init_subscriber().expect("Failed to initialize logging subsystem");

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration from file
    let config = Config::from_file(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        fastly_api_url = %config.fastly.api_url,
        webhooks_enabled = config.webhooks.enabled,
        "Configuration loaded successfully"
    );

    // Build Pingora server options
    let opt = Opt {
        daemon: args.daemon,
        test: args.test,
        upgrade: args.upgrade,
        ..Default::default()
    };

    // Create Pingora server
    let mut server = Server::new(Some(opt)).expect("Failed to create Pingora server");
    server.bootstrap();

    // Create AdminGateway instance
    let gateway = AdminGateway::new(&config).unwrap_or_else(|e| {
        eprintln!("Failed to create admin gateway: {}", e);
        std::process::exit(1);
    });

    // Create HTTP service
    let mut gateway_service = pingora_proxy::http_proxy_service(&server.configuration, gateway);

    // Add TCP listener for HTTP
    let listen_addr = format!("{}:{}", config.server.address, config.server.port);
    gateway_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        "Starting Imageopto admin service"
    );

    // Register service with server
    server.add_service(gateway_service);

    // Run server forever (blocks until shutdown)
    server.run_forever();
}
