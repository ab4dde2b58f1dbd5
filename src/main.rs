//! peakcap: MACS2 call-peak wrapper
//!
//! Usage: peakcap <TA> [CTL_TA] --fraglen <N> --chrsz <FILE> [OPTIONS]

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;

use log::info;

use peakcap::chrsz::ChromSizes;
use peakcap::commands::CallPeakCommand;
use peakcap::narrowpeak::Result;
use peakcap::runner::ShellRunner;

#[derive(Parser)]
#[command(name = "peakcap")]
#[command(version)]
#[command(
    about = "Call peaks with MACS2, then rank, cap, and clip the output into a gzipped narrowPeak file",
    long_about = None
)]
struct Cli {
    /// Sample TAGALIGN file, optionally followed by a control TAGALIGN file
    #[arg(num_args = 1..=2, required = true)]
    tas: Vec<PathBuf>,

    /// Fragment length (MACS2 --extsize)
    #[arg(long, required = true)]
    fraglen: i64,

    /// Read shift (MACS2 --shift)
    #[arg(long, default_value = "0")]
    shift: i64,

    /// 2-column chromosome sizes file
    #[arg(long)]
    chrsz: PathBuf,

    /// Effective genome size ("hs", "mm", or a number).
    /// Defaults to the sum of the chromosome sizes file.
    #[arg(long)]
    gensz: Option<String>,

    /// P-value threshold
    #[arg(long, default_value = "0.01")]
    pval_thresh: f64,

    /// Cap the number of peaks by taking the top N
    #[arg(long, default_value = "500000")]
    cap_num_peak: usize,

    /// Subsample the control to this read depth (0: no subsampling)
    #[arg(long, default_value = "0")]
    ctl_subsample: u64,

    /// Control TAGALIGN is paired-end
    #[arg(long)]
    ctl_paired_end: bool,

    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&cli.log_level),
    )
    .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("Initializing and making output directory...");
    fs::create_dir_all(&cli.out_dir)?;

    let chrsz = ChromSizes::from_file(&cli.chrsz)?;
    let gensz = match cli.gensz {
        Some(gensz) => gensz,
        None => chrsz.total().to_string(),
    };

    let ta = &cli.tas[0];
    let ctl_ta = cli.tas.get(1).map(PathBuf::as_path);

    let cmd = CallPeakCommand {
        fraglen: cli.fraglen,
        shift: cli.shift,
        gensz,
        pval_thresh: cli.pval_thresh,
        cap_num_peak: cli.cap_num_peak,
        ctl_subsample: cli.ctl_subsample,
        ctl_paired_end: cli.ctl_paired_end,
        out_dir: cli.out_dir,
    };

    info!("Calling peaks with macs2...");
    let npeak = cmd.run(&ShellRunner::new(), ta, ctl_ta, &chrsz)?;

    info!("Wrote {}", npeak.display());
    info!("All done.");
    Ok(())
}
