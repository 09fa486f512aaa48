use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracer_rs::{
    init_logger, log_info, log_warn, Measurements, Reply, Request, Scaling, StatusReply,
    TracerConfig, TracerDeviceManager,
};

#[derive(Parser)]
#[command(name = "tracer-cli")]
#[command(about = "CLI tool for Tracer solar charge controllers")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Serial device, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    device: Option<String>,
    /// Cache freshness window in seconds
    #[arg(long)]
    ttl: Option<u64>,
    #[arg(short, long)]
    retries: Option<u32>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Ignore the cache and query the controller
    #[arg(short, long)]
    force: bool,
    /// Raw readings are tens of millivolts/milliamps
    #[arg(long)]
    milli: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the controller status
    Status {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Switch the load output
    Load {
        #[arg(value_enum)]
        state: LoadState,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Oneline,
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum LoadState {
    On,
    Off,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(TracerConfig, Commands)> {
        let mut config = match &self.config {
            Some(path) => TracerConfig::from_json_file(path)?,
            None => TracerConfig::default(),
        };

        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(ttl) = self.ttl {
            config.cache_ttl_secs = ttl;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.read_timeout_ms = timeout_ms;
        }
        if self.cache_dir.is_some() {
            config.cache_dir = self.cache_dir;
        }
        config.force |= self.force;
        if self.milli {
            config.scaling = tracer_rs::ScalingPreset::Milli;
        }

        config.validate()?;
        Ok((config, self.command))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let (config, command) = Cli::parse().into_config()?;
    let manager = TracerDeviceManager::from_config(&config);
    let scaling = config.scaling.scaling();

    let request = match command {
        Commands::Status { .. } => Request::Status,
        Commands::Load { state: LoadState::On } => Request::PowerOn,
        Commands::Load { state: LoadState::Off } => Request::PowerOff,
    };

    let outcome = manager
        .execute(&config.device, request)
        .await
        .with_context(|| format!("{request} on {}", config.device))?;

    if let Some(warning) = &outcome.cache_warning {
        log_warn(&format!("frame cache: {warning}"));
    }
    log_info(&format!(
        "{request}: {:?} reply after {} attempt(s)",
        outcome.source, outcome.attempts
    ));

    match (command, outcome.reply) {
        (Commands::Status { format }, Reply::Status(status)) => {
            let rendered = match format {
                Format::Text => render_text(&status, &scaling),
                Format::Oneline => render_oneline(&status, &scaling),
                Format::Csv => render_csv(&status, &scaling),
                Format::Json => serde_json::to_string_pretty(&serde_json::json!({
                    "source": outcome.source,
                    "status": status,
                    "measurements": status.measurements(&scaling),
                }))?,
            };
            println!("{rendered}");
        }
        (_, Reply::SwitchAck { load_on }) => {
            println!("load power is {}", if load_on { "on" } else { "off" });
        }
        (_, reply) => anyhow::bail!("unexpected reply {reply:?}"),
    }

    Ok(())
}

fn level(m: &Measurements) -> String {
    match m.battery_level_percent {
        Some(level) => format!("{level:.1}%"),
        None => "n/a".to_string(),
    }
}

fn alarms(status: &StatusReply) -> String {
    [
        (status.overload, " overload!"),
        (status.fuse_tripped, " short-circuit!"),
        (status.battery_overload, " battery overload!"),
        (status.over_discharge, " over discharge!"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, text)| *text)
    .collect()
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn render_text(status: &StatusReply, scaling: &Scaling) -> String {
    let m = status.measurements(scaling);
    let (v, a, w) = (scaling.voltage_unit, scaling.current_unit, scaling.power_unit());

    let mut alarm_text = String::new();
    if status.battery_full {
        alarm_text.push_str(" battery full.");
    }
    alarm_text.push_str(&alarms(status));
    if !status.charging {
        alarm_text.push_str(" not charging!");
    }

    [
        format!("pv voltage: {:.2} {v}", m.panel_voltage),
        format!("battery voltage: {:.2} {v}", m.battery_voltage),
        format!("pv current: {:.2} {a}", m.pv_current),
        format!("panel power: {:.2} {w}", m.panel_power),
        format!("load power is {}", on_off(status.load_on)),
        format!("load current: {:.2} {a}", m.load_current),
        format!("battery flow: {:+.2} {w}", m.battery_flow_power),
        format!("battery level: {}", level(&m)),
        format!("temperature: {} deg C", m.temperature),
        format!("alarms:{alarm_text}"),
    ]
    .join("\n")
}

fn render_oneline(status: &StatusReply, scaling: &Scaling) -> String {
    let m = status.measurements(scaling);
    format!(
        "battery: {}{}; load: {}; flow: {:+.2} {}; t: {} degC;{}",
        level(&m),
        if status.battery_full { " (full)" } else { "" },
        on_off(status.load_on),
        m.battery_flow_power,
        scaling.power_unit(),
        m.temperature,
        alarms(status),
    )
}

fn render_csv(status: &StatusReply, scaling: &Scaling) -> String {
    let m = status.measurements(scaling);
    format!(
        concat!(
            "{:.2}, {:.2}, {:.2}, {:.2}, {:.2}, {:.2}, ",
            "{}, {}, {}, {}, {}, {}, {}, {}, 0x{:02x}, 0x{:02x}"
        ),
        m.battery_voltage,
        m.panel_voltage,
        m.pv_current,
        m.load_current,
        m.battery_min_voltage,
        m.battery_max_voltage,
        m.temperature,
        status.load_on as u8,
        status.charging as u8,
        status.overload as u8,
        status.fuse_tripped as u8,
        status.over_discharge as u8,
        status.battery_full as u8,
        status.battery_overload as u8,
        status.reserved1,
        status.reserved2,
    )
}
