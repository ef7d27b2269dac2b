use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use spapanel::{
    balboa::{Button, PanelFrame, StatusSnapshot},
    cloud::{
        create_codec, create_transport, Codec, CodecError, CodecType, Credentials, Transport,
        TransportError, TransportType, DEFAULT_API_URL,
    },
    carried_temperature, PollInterval, Poller, SpaConfiguration, StatusModel,
};

// The cloud takes a few seconds to reflect a command in PanelUpdate
const REPOLL_DELAY: Duration = Duration::from_secs(5);

/// Poll and control a spa through the vendor cloud
#[derive(Parser, Debug)]
#[command(name = "spapanel", version)]
struct Args {
    /// Where frames come from: `cloud`, or `lines[:base64|hex]` to use stdin/stdout
    #[arg(short, long, default_value = "cloud")]
    transport: TransportType,

    #[arg(long, env = "SPA_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "SPA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "SPA_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// JSON file listing installed accessories, e.g. {"pump1": true, "light1": true}
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode PanelUpdate frames read from stdin, one per line
    Decode {
        #[arg(long, value_enum, default_value = "base64")]
        codec: CodecType,

        /// Print a hex dump of each frame
        #[arg(long)]
        dump: bool,

        /// Water temperature to use when the first frame reports it as unknown
        #[arg(long)]
        previous: Option<f64>,
    },

    /// Poll once and print the status and device events
    Status,

    /// Poll periodically and print device events as JSON lines
    Watch {
        /// One of 1m, 5m, 10m, 15m, 30m
        #[arg(short, long, default_value = "5m")]
        interval: PollInterval,
    },

    /// Press a button: pump1-6, light1-2, blower, mister, aux1-2, temp-range or heat-mode
    Press { button: Button },

    /// Set the target temperature in the spa's display scale
    SetTemp { temperature: f64 },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Decode {
            codec,
            dump,
            previous,
        } => decode_stdin(codec, dump, previous)?,
        Command::Status => {
            let mut poller = connect(&args)?;
            let events = poller.poll_events()?;
            if let Some(snapshot) = poller.last_snapshot() {
                print_snapshot(snapshot)?;
            }
            for event in events {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        Command::Watch { interval } => {
            let mut poller = connect(&args)?;
            info!(%interval, "watching spa");
            poller.run(interval.duration(), |events| {
                for event in events {
                    match serde_json::to_string(event) {
                        Ok(line) => println!("{}", line),
                        Err(err) => warn!(%err, "failed to serialize event"),
                    }
                }
            })?;
        }
        Command::Press { button } => {
            let mut poller = connect(&args)?;
            poller.press(button)?;
            repoll(&mut poller)?;
        }
        Command::SetTemp { temperature } => {
            let mut poller = connect(&args)?;
            poller.set_temperature(temperature)?;
            repoll(&mut poller)?;
        }
    }

    Ok(())
}

fn connect(args: &Args) -> anyhow::Result<Poller<Box<dyn Transport<Error = TransportError>>>> {
    let config = match &args.config {
        Some(path) => SpaConfiguration::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SpaConfiguration::default(),
    };
    info!(accessories = ?config.installed().collect::<Vec<_>>(), "spa configuration");

    let transport = create_transport(args.transport.clone(), &args.api_url, credentials(args)?)?;
    Ok(Poller::new(transport, StatusModel::new(config)))
}

fn credentials(args: &Args) -> anyhow::Result<Credentials> {
    match args.transport {
        TransportType::Cloud => Ok(Credentials {
            username: args
                .username
                .clone()
                .ok_or_else(|| anyhow!("--username (or SPA_USERNAME) is required"))?,
            password: args
                .password
                .clone()
                .ok_or_else(|| anyhow!("--password (or SPA_PASSWORD) is required"))?,
        }),
        // Not used off-cloud
        TransportType::Lines { .. } => Ok(Credentials {
            username: String::new(),
            password: String::new(),
        }),
    }
}

fn repoll<T: Transport<Error = TransportError>>(poller: &mut Poller<T>) -> anyhow::Result<()> {
    std::thread::sleep(REPOLL_DELAY);
    let snapshot = poller.poll()?;
    print_snapshot(snapshot)
}

fn print_snapshot(snapshot: &StatusSnapshot) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    io::stdout().flush()?;
    Ok(())
}

// Read encoded frames from stdin and print the decoded snapshot of each
fn decode_stdin(codec_type: CodecType, dump: bool, previous: Option<f64>) -> anyhow::Result<()> {
    let codec = create_codec(codec_type);
    let mut last: Option<StatusSnapshot> = None;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let frame = match decode_frame(codec.as_ref(), &line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "skipping frame");
                continue;
            }
        };

        if dump {
            println!(
                "{}",
                hexplay::HexViewBuilder::new(frame.as_bytes())
                    .row_width(16)
                    .finish()
            );
        }

        // --previous only seeds the first frame
        let carried = match &last {
            Some(last) => carried_temperature(last, &frame),
            None => previous,
        };
        let snapshot = frame.decode(carried);
        print_snapshot(&snapshot)?;
        last = Some(snapshot);
    }

    Ok(())
}

fn decode_frame(codec: &dyn Codec<Error = CodecError>, line: &str) -> anyhow::Result<PanelFrame> {
    Ok(PanelFrame::new(codec.decode(line)?)?)
}
