//! QR server configuration bootstrap entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present) so `$ENV$` sentinels can see it
//!   2. Parse CLI
//!   3. Init logger once
//!   4. Resolve config: defaults → document → indirection
//!   5. Apply listen overrides and report the effective settings

use std::env;
use std::path::PathBuf;

use tracing::info;

use qr_svr::config::{self, ResolveContext};
use qr_svr::error::AppError;
use qr_svr::logger;
use qr_svr::server_config::{ListenOverrides, ListenSettings, ServerConfig};

const DEFAULT_CONFIG: &str = "cfg.json";

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args(env::args().skip(1))?;
    if args.help {
        print_usage();
        return Ok(());
    }

    logger::init(args.verbosity)?;

    let config_path = effective_config_path(&args.config_path);
    let ctx = ResolveContext::from_env().verbose(args.verbosity >= 3);
    let cfg = config::read_config::<ServerConfig>(&config_path, &ctx)?;

    let listen = ListenSettings::new(&cfg, &args.overrides);

    info!(
        source = %cfg.source().display(),
        redis = %cfg.redis_addr(),
        redis_auth = cfg.redis_auth_enabled(),
        host_port = %listen.host_port,
        dir = %listen.dir,
        qr_dir = %cfg.qr_dir,
        qr_level = %cfg.qr_level,
        qr_size = cfg.qr_size,
        login_ttl = cfg.login_ttl,
        "server configuration ready"
    );
    println!(
        "✓ qr-svr configured: listen={} dir={} redis={}",
        listen.host_port,
        listen.dir,
        cfg.redis_addr()
    );

    Ok(())
}

#[derive(Debug, Default)]
struct CliArgs {
    help: bool,
    verbosity: u8,
    config_path: String,
    overrides: ListenOverrides,
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, AppError> {
    let mut parsed = CliArgs {
        config_path: DEFAULT_CONFIG.to_string(),
        ..Default::default()
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        // `--flag=value` carries its value inline
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };

        match flag {
            "-c" | "-cfg" | "--cfg" => {
                if let Some(path) = value_for(flag, inline, &mut iter)? {
                    parsed.config_path = path;
                }
            }
            "-hostport" | "--hostport" => {
                parsed.overrides.host_port = value_for(flag, inline, &mut iter)?;
            }
            "-dir" | "--dir" => parsed.overrides.dir = value_for(flag, inline, &mut iter)?,
            _ if inline.is_some() => {
                return Err(AppError::Usage(format!("{flag} does not take a value")));
            }
            "-h" | "--help" => parsed.help = true,
            "--verbose" => parsed.verbosity = parsed.verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                let count = u8::try_from(a.len() - 1).unwrap_or(u8::MAX);
                parsed.verbosity = parsed.verbosity.saturating_add(count);
            }
            a if a.starts_with('-') => {
                return Err(AppError::Usage(format!("unknown option {a}")));
            }
            a => return Err(AppError::Usage(format!("extra argument supplied: {a}"))),
        }
    }

    Ok(parsed)
}

/// Value of a flag, inline or from the next argument. An empty value means
/// "not given".
fn value_for(
    flag: &str,
    inline: Option<String>,
    rest: &mut impl Iterator<Item = String>,
) -> Result<Option<String>, AppError> {
    let value = match inline {
        Some(v) => v,
        None => rest
            .next()
            .ok_or_else(|| AppError::Usage(format!("{flag} requires a value")))?,
    };
    Ok(Some(value).filter(|v| !v.is_empty()))
}

/// An environment variable named exactly like the `--cfg` argument, when set
/// and non-empty, supplies the real path.
fn effective_config_path(arg: &str) -> PathBuf {
    let usable_name = !arg.is_empty() && !arg.contains(['=', '\0']);
    if usable_name {
        if let Ok(path) = env::var(arg) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
    }
    PathBuf::from(arg)
}

fn print_usage() {
    println!("Usage: qr-svr [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -h, --help                 Print help");
    println!("  -c, --cfg <PATH>           Configuration document (default: {DEFAULT_CONFIG})");
    println!("      --hostport <ADDR>      Host/port to listen on (overrides host_port)");
    println!("      --dir <DIR>            Directory to serve from (overrides dir)");
    println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
}
