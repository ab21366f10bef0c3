use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Serial port override (default from config.json)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Camera index override
    #[arg(long)]
    pub cam_index: Option<u32>,

    /// Drive the pipeline from the synthetic source instead of a camera
    #[arg(long, default_value_t = false)]
    pub synthetic: bool,

    /// Stop after this many frames (0 = run until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    pub frames: u64,

    /// Run without the actuator even if a port is configured
    #[arg(long, default_value_t = false)]
    pub no_actuator: bool,

    /// Print a status line every N frames (0 = transitions only)
    #[arg(long, default_value_t = 30)]
    pub report_every: u64,
}
