use std::path::PathBuf;
use std::process::ExitCode;
use territory_marker::export::Delivery;
use territory_marker::{run_replay, ReplayOptions};

const USAGE: &str = "usage: territory_marker replay <script.json> [--out DIR] [--offline] [--config FILE] [--template URL] [--save-dialog]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<ReplayOptions, String> {
    match args.next().as_deref() {
        Some("replay") => {}
        Some(other) => return Err(format!("unknown command '{other}'")),
        None => return Err("missing command".into()),
    }

    let mut options = ReplayOptions {
        out_dir: PathBuf::from("."),
        ..Default::default()
    };
    let mut script = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => options.out_dir = args.next().ok_or("--out needs a directory")?.into(),
            "--config" => options.config = Some(args.next().ok_or("--config needs a file")?.into()),
            "--template" => options.template_url = Some(args.next().ok_or("--template needs a URL")?),
            "--offline" => options.offline = true,
            "--save-dialog" => options.save_dialog = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            path if script.is_none() => script = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }
    options.script = script.ok_or("missing script path")?;
    Ok(options)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Set up logging, filtered by RUST_LOG
    env_logger::init();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run_replay(options).await {
        Ok(report) => {
            for alert in &report.alerts {
                println!("alert: {alert}");
            }
            for delivery in &report.deliveries {
                match delivery {
                    Delivery::Saved(path) => println!("saved {}", path.display()),
                    Delivery::Kept(name) => println!("kept {name}"),
                    Delivery::Declined => println!("declined"),
                }
            }
            println!(
                "{} steps, {} shapes, {} labels",
                report.steps,
                report.territories.shapes.len(),
                report.territories.labels.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("replay failed: {e}");
            ExitCode::FAILURE
        }
    }
}
