//! Command-line interface definitions for the `stratus` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `stratus` binary.
#[derive(Debug, Parser)]
#[command(
    name = "stratus",
    version,
    about = "Run one-shot Google Cloud tasks from the command line",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create, list, or delete Compute Engine instances.
    #[command(subcommand)]
    Instance(InstanceCommand),
    /// Create, list, fill, or delete Cloud Storage buckets.
    #[command(subcommand)]
    Bucket(BucketCommand),
    /// Front a bucket with a global HTTP load balancer.
    #[command(name = "load-balancer", subcommand)]
    LoadBalancer(LoadBalancerCommand),
    /// Create an instance and a bucket, wait, then remove both.
    Demo(DemoArgs),
    /// Convert a WAV file to mono and transcribe it.
    Transcribe(TranscribeArgs),
    /// Read or write spreadsheet ranges.
    #[command(subcommand)]
    Sheet(SheetCommand),
    /// Translate text, prompting for anything not given as a flag.
    Translate(TranslateArgs),
}

/// `stratus instance` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum InstanceCommand {
    /// Create an instance and wait for the operation to finish.
    Create {
        /// Instance name; defaults to `instance_name` from configuration.
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
    /// List running instances in the configured zone.
    List,
    /// Delete an instance and wait for the operation to finish.
    Delete {
        /// Instance name; defaults to `instance_name` from configuration.
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
}

/// `stratus bucket` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum BucketCommand {
    /// Create a bucket with the configured location and storage class.
    Create {
        /// Globally unique bucket name.
        name: String,
    },
    /// List the project's buckets.
    List,
    /// Upload a local file.
    Upload {
        /// Target bucket.
        bucket: String,
        /// File to upload.
        file: String,
        /// Object name; defaults to the file name.
        #[arg(long, value_name = "OBJECT")]
        destination: Option<String>,
    },
    /// Delete every object in a bucket, then the bucket.
    Delete {
        /// Bucket to delete.
        name: String,
    },
}

/// `stratus load-balancer` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum LoadBalancerCommand {
    /// Create the backend bucket, URL map, proxy, address, and forwarding rule.
    Create(LoadBalancerArgs),
}

/// Resources fronted by a load balancer.
#[derive(Debug, Args)]
pub(crate) struct LoadBalancerArgs {
    /// Bucket served through the load balancer.
    pub(crate) bucket: String,
    /// Name of the backend bucket resource.
    pub(crate) backend_bucket: String,
    /// Host name routed to the bucket.
    #[arg(long, value_name = "DOMAIN")]
    pub(crate) domain: Option<String>,
}

/// Arguments for `stratus demo`.
#[derive(Debug, Args)]
pub(crate) struct DemoArgs {
    /// Bucket created for the run.
    #[arg(long, value_name = "NAME")]
    pub(crate) bucket: String,
    /// Instance name; defaults to `instance_name` from configuration.
    #[arg(long, value_name = "NAME")]
    pub(crate) instance: Option<String>,
    /// Local file uploaded into the bucket.
    #[arg(long, value_name = "PATH")]
    pub(crate) upload: Option<String>,
    /// Also build a load balancer with this backend bucket name.
    #[arg(long, value_name = "NAME")]
    pub(crate) backend_bucket: Option<String>,
    /// Host name routed by the load balancer.
    #[arg(long, value_name = "DOMAIN", requires = "backend_bucket")]
    pub(crate) domain: Option<String>,
    /// Seconds to wait before cleanup; defaults to `cleanup_delay_secs`.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) cleanup_delay: Option<u64>,
}

/// Arguments for `stratus transcribe`.
#[derive(Debug, Args)]
pub(crate) struct TranscribeArgs {
    /// WAV file to transcribe.
    pub(crate) input: String,
    /// Where the mono conversion is written; defaults to `<input>.mono.wav`.
    #[arg(long, value_name = "PATH", conflicts_with = "no_convert")]
    pub(crate) mono_output: Option<String>,
    /// Send the input as-is, skipping mono conversion.
    #[arg(long)]
    pub(crate) no_convert: bool,
}

/// `stratus sheet` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum SheetCommand {
    /// Print the rows of a range.
    Read {
        /// Range in A1 notation, for example `Sheet1!A1:C10`.
        range: String,
    },
    /// Overwrite a range with raw values.
    Write {
        /// Range in A1 notation, for example `Sheet1!A12:C14`.
        range: String,
        /// One row of comma-separated cells, or a JSON array of strings
        /// (`["Smith, Jane","42"]`) when a cell contains a comma; repeat for
        /// more rows.
        #[arg(long = "row", value_name = "CELLS", required = true)]
        rows: Vec<String>,
    },
}

/// Arguments for `stratus translate`.
#[derive(Debug, Args)]
pub(crate) struct TranslateArgs {
    /// Text to translate; prompted for when absent.
    #[arg(long, value_name = "TEXT")]
    pub(crate) text: Option<String>,
    /// Target language code such as `es` or `fr`; prompted for when absent.
    #[arg(long, value_name = "LANG")]
    pub(crate) target: Option<String>,
    /// Source language code; detected when absent.
    #[arg(long, value_name = "LANG")]
    pub(crate) source: Option<String>,
}
