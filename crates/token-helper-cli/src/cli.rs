use std::ffi::OsString;

use clap::{Parser, Subcommand};

/// CLI surface definition. Vault invokes the helper with a single subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "vault-token-helper-gcp-kms",
    about = "Vault token helper that keeps the token encrypted with Google Cloud KMS",
    disable_version_flag = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Print version information to stderr and exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read a token from stdin, encrypt it and write it to the token file.
    Store,
    /// Decrypt the token file (if any) and print the token to stdout.
    Get,
    /// Delete the token file.
    Erase,
    /// Print version information to stderr and exit.
    Version,
}

/// Map the single-dash `-version` spelling Vault users may pass onto `--version`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-version" {
                OsString::from("--version")
            } else {
                arg
            }
        })
        .collect()
}
