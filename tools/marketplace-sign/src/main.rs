//! marketplace-sign: developer tooling for signed marketplace requests.
//!
//! Derives principals, prints canonical payloads, produces signed request
//! bodies and checks bodies against a locally configured gate.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use marketplace_auth::domain::timestamp::parse_timestamp;
use marketplace_auth::{
    authorize_body, Algorithm, AuthConfig, AuthenticationGate, CanonicalPayloadBuilder,
    OperationKind, RequestFields, RequestSigner, SignedRequestBody,
};

/// marketplace-sign: sign and inspect marketplace write requests
#[derive(Parser, Debug)]
#[command(name = "marketplace-sign", version)]
#[command(about = "Sign and inspect authenticated marketplace write requests")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the principal and public key for a secret key
    Principal {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Print the canonical payload a signature must cover
    Canonical {
        /// Operation tag (script_upload, script_update, ...)
        #[arg(short, long)]
        operation: String,

        /// JSON object of operation fields ("-" for stdin)
        #[arg(short, long)]
        fields: PathBuf,

        /// RFC 3339 signing time
        #[arg(short, long)]
        timestamp: String,
    },

    /// Produce a signed request body
    Sign {
        #[command(flatten)]
        key: KeyArgs,

        /// Operation tag (script_upload, script_update, ...)
        #[arg(short, long)]
        operation: String,

        /// JSON object of operation fields ("-" for stdin)
        #[arg(short, long)]
        fields: PathBuf,

        /// RFC 3339 signing time (defaults to now)
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Pretty-print the body
        #[arg(long)]
        pretty: bool,
    },

    /// Check a signed body against a gate configured from the environment
    Verify {
        /// Signed request body ("-" for stdin)
        #[arg(short, long)]
        body: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct KeyArgs {
    /// Signature algorithm
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::Ed25519)]
    algorithm: AlgorithmArg,

    /// 32-byte secret key as hex (Ed25519 seed or secp256k1 scalar)
    #[arg(short, long)]
    secret_hex: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlgorithmArg {
    Ed25519,
    Secp256k1,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Ed25519 => Algorithm::Ed25519,
            AlgorithmArg::Secp256k1 => Algorithm::Secp256k1,
        }
    }
}

impl KeyArgs {
    fn signer(&self) -> Result<RequestSigner> {
        let bytes = Zeroizing::new(
            hex::decode(self.secret_hex.trim().trim_start_matches("0x"))
                .context("secret key is not valid hex")?,
        );
        if bytes.len() != 32 {
            bail!("secret key must be 32 bytes (64 hex chars), got {}", bytes.len());
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&bytes);

        RequestSigner::from_secret(self.algorithm.into(), secret)
            .context("secret key rejected")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    debug!(?args.command, "Running command");

    match args.command {
        Command::Principal { key } => {
            let signer = key.signer()?;
            println!("principal:  {}", signer.principal());
            println!("public_key: {}", hex::encode(signer.public_key_bytes()));
        }

        Command::Canonical {
            operation,
            fields,
            timestamp,
        } => {
            let operation = parse_operation(&operation)?;
            let fields = read_fields(&fields)?;
            let timestamp = parse_timestamp(&timestamp)
                .map_err(|_| anyhow!("timestamp must be RFC 3339, got {timestamp:?}"))?;

            let payload = CanonicalPayloadBuilder::build(operation, &fields, timestamp)
                .context("fields do not form a valid payload")?;
            println!("{}", String::from_utf8_lossy(payload.as_bytes()));
        }

        Command::Sign {
            key,
            operation,
            fields,
            timestamp,
            pretty,
        } => {
            let signer = key.signer()?;
            let operation = parse_operation(&operation)?;
            let fields = read_fields(&fields)?;
            let timestamp = match timestamp {
                Some(text) => parse_timestamp(&text)
                    .map_err(|_| anyhow!("timestamp must be RFC 3339, got {text:?}"))?,
                None => Utc::now(),
            };

            let request = signer
                .sign(operation, fields, timestamp)
                .context("signing failed")?;
            info!(%operation, principal = %signer.principal(), "Signed request");

            let body = SignedRequestBody::from_signed_request(&request);
            let json = if pretty {
                serde_json::to_string_pretty(&body)?
            } else {
                serde_json::to_string(&body)?
            };
            println!("{json}");
        }

        Command::Verify { body } => {
            let config = AuthConfig::from_env().context("invalid authentication configuration")?;
            let gate = AuthenticationGate::new(config)?;
            let body = read_input(&body)?;

            match authorize_body(&gate, &body) {
                Ok(principal) => println!("authorized: {principal}"),
                Err(reason) => bail!("rejected: {} ({reason})", reason.code()),
            }
        }
    }

    Ok(())
}

fn parse_operation(tag: &str) -> Result<OperationKind> {
    tag.parse().map_err(|_| {
        let known: Vec<_> = OperationKind::ALL.iter().map(|k| k.as_str()).collect();
        anyhow!("unknown operation {tag:?}; expected one of {}", known.join(", "))
    })
}

fn read_fields(path: &Path) -> Result<RequestFields> {
    let text = read_input(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).context("fields file is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(RequestFields::from(map)),
        _ => bail!("fields must be a JSON object"),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}
