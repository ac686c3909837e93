// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use omfdump::{cli, DumpOptions, Flavour, Variant};

/// Dump Intel OMF-85, OMF-51, OMF-96 and OMF-86 object files and libraries.
#[derive(Debug, Parser)]
#[clap(name = env!("CARGO_CRATE_NAME"), version)]
#[command(version, about, long_about = None)]
pub struct App {
    /// hex dump each record without decoding its fields
    #[clap(short, long)]
    raw: bool,

    /// decode OMF-86 records as this flavour instead of inferring it
    #[arg(long, value_enum)]
    flavour: Option<Flavour>,

    /// decode the input as this variant instead of detecting it
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// an object file or library
    #[arg(required = true)]
    infile: PathBuf,

    /// where to write the dump, stdout if omitted
    outfile: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = App::parse();

    // diagnostics are inline in the dump, so only repeat them on stderr
    // when the dump goes to a file
    let filter = if args.outfile.is_some() { "warn" } else { "off" };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(filter));

    let options = DumpOptions {
        raw: args.raw,
        flavour: args.flavour,
        variant: args.variant,
    };

    match &args.outfile {
        Some(outfile) => {
            let file = File::create(outfile)
                .with_context(|| format!("cannot create {}", outfile.display()))?;
            let mut out = BufWriter::new(file);
            cli::dump(&mut out, &args.infile, &options)?;
            out.flush()?;
        }
        None => {
            cli::dump(&mut io::stdout().lock(), &args.infile, &options)?;
        }
    }

    Ok(())
}
