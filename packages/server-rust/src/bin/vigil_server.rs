//! vigil-server: HTTP server and credential issuance tool.
//!
//! Runs over the in-memory adapters. Secrets come from the environment
//! (`VIGIL_ADMIN_SECRET`, `VIGIL_TENANT_SECRET`) or flags.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vigil_core::{
    AdminClaims, AdminId, TenantClaims, TenantId, TenantRole, UserId, UserStatus,
};
use vigil_server::auth::AuthConfig;
use vigil_server::network::{NetworkConfig, TlsConfig};
use vigil_server::service::{BackgroundWorker, ServerConfig};
use vigil_server::storage::unix_now;
use vigil_server::Vigil;

/// Vigil whistleblowing server
#[derive(Parser, Debug)]
#[command(name = "vigil-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// HMAC secret for admin credentials
    #[arg(long, env = "VIGIL_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: String,

    /// HMAC secret for tenant credentials (must differ from the admin secret)
    #[arg(long, env = "VIGIL_TENANT_SECRET", hide_env_values = true)]
    tenant_secret: String,

    /// Tolerated clock skew for credential expiry, in seconds
    #[arg(long, default_value_t = 30)]
    clock_skew_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "VIGIL_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve HTTP (default)
    Serve(ServeArgs),
    /// Mint a credential signed with the configured secrets
    IssueToken {
        /// Lifetime in seconds
        #[arg(long, default_value_t = 3_600, value_parser = clap::value_parser!(i64).range(1..))]
        ttl_secs: i64,

        #[command(subcommand)]
        kind: TokenKind,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "VIGIL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port (0 picks a free one)
    #[arg(long, env = "VIGIL_PORT", default_value_t = 8080)]
    port: u16,

    /// PEM certificate; enables TLS together with --tls-key
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "VIGIL_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Node identifier stamped on every operation
    #[arg(long, env = "VIGIL_NODE_ID", default_value = "vigil-0")]
    node_id: String,

    /// Interval between stale-case sweeps, in seconds
    #[arg(long, default_value_t = 300)]
    stale_sweep_secs: u64,

    /// Seed a demo admin, tenant, and manager
    #[arg(long)]
    seed_demo: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls_cert: None,
            tls_key: None,
            cors_origins: vec!["*".to_string()],
            node_id: "vigil-0".to_string(),
            stale_sweep_secs: 300,
            seed_demo: false,
        }
    }
}

#[derive(Subcommand, Debug)]
enum TokenKind {
    /// Platform administrator credential
    Admin {
        #[arg(long)]
        sub: i64,
    },
    /// Tenant user credential
    Tenant {
        #[arg(long)]
        sub: i64,
        #[arg(long)]
        tenant: i64,
        #[arg(long, value_enum, default_value_t = RoleArg::Responder)]
        role: RoleArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Responder,
    Manager,
    AnonymousChannel,
}

impl From<RoleArg> for TenantRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Responder => Self::Responder,
            RoleArg::Manager => Self::Manager,
            RoleArg::AnonymousChannel => Self::AnonymousChannel,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let auth = AuthConfig {
        admin_secret: args.admin_secret,
        tenant_secret: args.tenant_secret,
        clock_skew_secs: args.clock_skew_secs,
        ..AuthConfig::default()
    };

    match args.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::IssueToken { ttl_secs, kind } => {
            let vigil = Vigil::in_memory(&auth, ServerConfig::default())?;
            let token = issue_token(&vigil, kind, ttl_secs)?;
            println!("{token}");
            Ok(())
        }
        Command::Serve(serve_args) => serve(&auth, serve_args).await,
    }
}

fn issue_token(vigil: &Vigil, kind: TokenKind, ttl_secs: i64) -> anyhow::Result<String> {
    let now = unix_now();
    let token = match kind {
        TokenKind::Admin { sub } => {
            let claims = AdminClaims::new(AdminId::new(sub)?, now, ttl_secs);
            vigil.dispatcher.admin().codec().encode(&claims)?
        }
        TokenKind::Tenant { sub, tenant, role } => {
            let claims = TenantClaims::new(
                UserId::new(sub)?,
                TenantId::new(tenant)?,
                role.into(),
                now,
                ttl_secs,
            );
            vigil.dispatcher.tenant().codec().encode(&claims)?
        }
    };
    Ok(token)
}

async fn serve(auth: &AuthConfig, args: ServeArgs) -> anyhow::Result<()> {
    let server_config = ServerConfig {
        node_id: args.node_id,
        stale_sweep_interval_ms: args.stale_sweep_secs.saturating_mul(1_000),
        ..ServerConfig::default()
    };
    let sweep_interval_ms = server_config.stale_sweep_interval_ms;
    let vigil = Vigil::in_memory(auth, server_config).context("invalid configuration")?;

    if args.seed_demo {
        seed_demo(&vigil)?;
    }

    let tls = match (args.tls_cert, args.tls_key) {
        (Some(cert), Some(key)) => Some(TlsConfig::new(cert, key)),
        _ => None,
    };
    let network_config = NetworkConfig {
        host: args.host,
        port: args.port,
        tls,
        cors_origins: args.cors_origins,
        ..NetworkConfig::default()
    };

    let mut network = vigil.network(network_config);
    let port = network.start().await?;
    info!(port, "vigil-server listening");

    let mut worker = BackgroundWorker::start(vigil.tenant_jobs(), sweep_interval_ms);

    network
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
                // Without a signal handler, park until killed.
                std::future::pending::<()>().await;
            }
            info!("ctrl-c received");
        })
        .await?;

    tokio::time::timeout(Duration::from_secs(5), worker.stop())
        .await
        .context("background worker did not stop in time")?;
    info!("vigil-server stopped");
    Ok(())
}

/// Admin 1, tenant 1 ("demo"), and active manager 1 in it.
fn seed_demo(vigil: &Vigil) -> anyhow::Result<()> {
    let dir = &vigil.directory;
    let tenant = TenantId::new(1)?;
    dir.add_admin(AdminId::new(1)?, true);
    dir.add_tenant(tenant, "demo", true);
    dir.add_user(UserId::new(1)?, tenant, TenantRole::Manager, UserStatus::Active);
    info!("demo directory seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ttl: &str) -> Result<Args, clap::Error> {
        Args::try_parse_from([
            "vigil-server",
            "--admin-secret",
            "a",
            "--tenant-secret",
            "t",
            "issue-token",
            "--ttl-secs",
            ttl,
            "admin",
            "--sub",
            "1",
        ])
    }

    #[test]
    fn ttl_must_be_positive() {
        assert!(parse("0").is_err());
        assert!(parse("-60").is_err());
        let args = parse("60").unwrap();
        assert!(matches!(args.command, Some(Command::IssueToken { ttl_secs: 60, .. })));
    }
}
