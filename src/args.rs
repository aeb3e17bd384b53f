//! Command line argument parsing for MapGate.
//!
//! This module defines the CLI interface using [`clap`] for argument parsing.
//! The listen address falls back to `SERVER_HOST` / `SERVER_PORT` when the
//! flags are absent.
//!
//! # Example
//!
//! ```no_run
//! use mapgate::args::Args;
//! use clap::Parser;
//!
//! let args = Args::parse();
//! if let Err(e) = args.validate() {
//!     eprintln!("Configuration error: {}", e);
//!     std::process::exit(1);
//! }
//! ```

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use mapgate_core::defaults;

use crate::env_vars;

/// Command line arguments for MapGate.
///
/// # Example
///
/// ```no_run
/// use mapgate::args::Args;
/// use clap::Parser;
///
/// let args = Args::parse();
/// println!("Listening on {}:{}", args.bind, args.listen);
/// ```
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(
    long_about = "Ingress gate for a geospatial map server\nRate limits proxy traffic per client, only forwards to whitelisted upstream hosts, and serves cached data files\n\nExample usage:\n  mapgate --listen 9700\n  mapgate -b 127.0.0.1 -l 8080 --verbose"
)]
#[command(
    after_help = "Environment variables (a .env file is loaded if present):\n  SGS_SERVER_URL         Upstream base URL (default: http://124.17.4.220:24088/SG)\n  SGS_USERNAME           Upstream basic-auth user\n  SGS_PASSWORD           Upstream basic-auth password\n  SGS_ACCESS_TOKEN       Upstream X-Access-Token\n  PROXY_ALLOWED_HOSTS    Comma-separated upstream host whitelist\n  RATE_LIMIT_REQUESTS    Max requests per window (default: 100)\n  RATE_LIMIT_WINDOW_SECS Rate limit window seconds (default: 60)\n  DATA_DIR               Directory served under /data (default: data)"
)]
pub struct Args {
    /// Address to bind to
    #[arg(
        long,
        short = 'b',
        env = env_vars::SERVER_HOST,
        help = "Bind address for listening",
        value_name = "ADDRESS",
        default_value = defaults::SERVER_HOST
    )]
    pub bind: String,

    /// Port to listen on for incoming requests
    #[arg(
        long,
        short = 'l',
        env = env_vars::SERVER_PORT,
        help = "Listen port for incoming connections",
        value_name = "PORT",
        default_value_t = defaults::SERVER_PORT
    )]
    pub listen: u16,

    /// Enable verbose output
    #[arg(
        long,
        short = 'v',
        help = "Show detailed configuration and debug logs"
    )]
    pub verbose: bool,

    /// Enable quiet mode (minimal output)
    #[arg(
        long,
        short = 'q',
        help = "Only log warnings and errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output logs in JSON format (for structured logging)
    #[arg(long, help = "Output logs in JSON format for structured logging")]
    pub json_logs: bool,
}

impl Args {
    /// Validates the parsed command line arguments.
    ///
    /// - The listen port must be greater than 0
    /// - The bind address must be a valid IP address
    ///
    /// # Example
    ///
    /// ```
    /// use mapgate::args::Args;
    /// use clap::Parser;
    ///
    /// let args = Args::try_parse_from(["mapgate", "-b", "not-an-ip", "-l", "8080"]).unwrap();
    /// assert!(args.validate().is_err());
    ///
    /// let args = Args::try_parse_from(["mapgate", "-b", "127.0.0.1", "-l", "8080"]).unwrap();
    /// assert!(args.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), String> {
        if self.listen == 0 {
            return Err("Listen port must be greater than 0".to_string());
        }

        if self.bind.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address: '{}'", self.bind));
        }

        Ok(())
    }

    /// Returns the socket address to listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        self.validate()?;
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| format!("Invalid bind address: '{}'", self.bind))?;
        Ok(SocketAddr::from((ip, self.listen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flags() {
        let args = Args::try_parse_from(["mapgate", "--bind", "127.0.0.1", "--listen", "8080"]).unwrap();
        assert_eq!(args.bind, "127.0.0.1");
        assert_eq!(args.listen, 8080);
        assert!(!args.verbose);
        assert!(!args.json_logs);
    }

    #[test]
    fn test_port_zero_rejected() {
        let args = Args::try_parse_from(["mapgate", "-b", "127.0.0.1", "-l", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let args = Args::try_parse_from(["mapgate", "-b", "localhost", "-l", "9700"]).unwrap();
        assert_eq!(args.validate(), Err("Invalid bind address: 'localhost'".to_string()));
    }

    #[test]
    fn test_ipv6_bind_accepted() {
        let args = Args::try_parse_from(["mapgate", "-b", "::1", "-l", "9700"]).unwrap();
        assert_eq!(args.listen_addr().unwrap(), "[::1]:9700".parse().unwrap());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["mapgate", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_json_logs_flag() {
        let args = Args::try_parse_from(["mapgate", "-b", "0.0.0.0", "-l", "9700", "--json-logs"]).unwrap();
        assert!(args.json_logs);
    }
}
