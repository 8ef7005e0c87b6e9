use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use dashboard_proxy::config::{load_config, ConfigError};
use dashboard_proxy::embed::{EmbedTarget, Kiosk, Theme, UrlParams, VarValue};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the dashboard proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the frame source URL for a dashboard
    EmbedUrl {
        /// Proxy base URL (the proxy path prefix)
        #[arg(long, default_value = "/api/grafana")]
        base: String,
        /// Dashboard UID
        #[arg(long)]
        uid: String,
        #[arg(long, default_value = "dashboard")]
        slug: String,
        /// Hide navigation and sidebar
        #[arg(long, conflicts_with = "kiosk_tv")]
        kiosk: bool,
        /// Persistent "tv" kiosk mode
        #[arg(long)]
        kiosk_tv: bool,
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        #[arg(long)]
        refresh: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        org_id: Option<u64>,
        /// Template variable as name=value; repeat a name for multiple values
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Load and validate a configuration file
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Send a GET through a running proxy and show what came back
    Probe {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
        #[arg(short, long, default_value = "/api/grafana/api/health")]
        path: String,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))
}

fn collect_vars(vars: Vec<(String, String)>) -> std::collections::BTreeMap<String, VarValue> {
    let mut out = std::collections::BTreeMap::new();
    for (name, value) in vars {
        let merged = match out.remove(&name) {
            None => VarValue::One(value),
            Some(VarValue::One(first)) => VarValue::Many(vec![first, value]),
            Some(VarValue::Many(mut values)) => {
                values.push(value);
                VarValue::Many(values)
            }
        };
        out.insert(name, merged);
    }
    out
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::EmbedUrl {
            base,
            uid,
            slug,
            kiosk,
            kiosk_tv,
            theme,
            refresh,
            from,
            to,
            org_id,
            vars,
        } => {
            let params = UrlParams {
                kiosk: if kiosk_tv {
                    Some(Kiosk::Tv)
                } else if kiosk {
                    Some(Kiosk::On)
                } else {
                    None
                },
                theme: theme.map(|t| match t {
                    ThemeArg::Light => Theme::Light,
                    ThemeArg::Dark => Theme::Dark,
                }),
                refresh,
                from,
                to,
                org_id,
                auth_token: None,
                variables: collect_vars(vars),
            };
            let target = EmbedTarget::new(base, uid).with_slug(slug).with_params(params);
            println!("{}", target.src());
        }
        Commands::Check { config } => match load_config(&config) {
            Ok(cfg) => {
                println!("OK: upstream {} under {}", cfg.upstream.url, cfg.upstream.path_prefix);
            }
            Err(ConfigError::Validation(errors)) => {
                eprintln!("Invalid configuration:");
                for error in errors {
                    eprintln!("  - {}", error);
                }
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Probe { url, path } => {
            let client = reqwest::Client::builder().no_proxy().build()?;
            let res = client
                .get(format!("{}{}", url.trim_end_matches('/'), path))
                .send()
                .await?;
            println!("Status: {}", res.status());
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            let body = res.text().await?;
            println!();
            println!("{}", body);
        }
    }

    Ok(())
}
