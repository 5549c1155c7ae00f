use howto_import::config::load_config;
use howto_import::discovery::discover_links;
use howto_import::document::Document;
use howto_import::fetchers::{Fetcher, RequestFetcher};
use howto_import::persist::save_guides;
use howto_import::pipelines::{process_all, PipelineSet};
use log::{error, info, warn};
use std::env;
use std::path::PathBuf;

const USAGE: &str =
    "Usage: howto-import [--category <url>] [--profile <name>] [--output <path>] [<url>...]";

#[derive(Debug, Default)]
struct Args {
    category: Option<String>,
    profile: Option<String>,
    output: Option<PathBuf>,
    urls: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or(format!("{flag} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--category" => parsed.category = Some(value("--category")?),
            "--profile" => parsed.profile = Some(value("--profile")?),
            "--output" => parsed.output = Some(PathBuf::from(value("--output")?)),
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("Unknown option {flag}\n{USAGE}")),
            _ => parsed.urls.push(arg),
        }
    }
    if parsed.category.is_none() && parsed.urls.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args().skip(1))?;
    let config = load_config()?;

    let pipelines = match &args.profile {
        Some(name) => PipelineSet::single(&config.profile(name)?)?,
        None => PipelineSet::new(
            &config.profile(&config.default_profile)?,
            &config.site_profiles(),
        )?,
    };
    let fetcher = RequestFetcher::new(&config.fetch)?;

    let mut urls = args.urls.clone();
    if let Some(category) = &args.category {
        match fetcher.fetch(category).await {
            Some(html) => {
                let document = Document::parse(&html);
                urls.extend(discover_links(&document, category, &config.discovery.keyword));
            }
            None => error!("Could not fetch category page {}", category),
        }
    }
    if urls.is_empty() {
        warn!("No URLs to import");
        return Ok(());
    }

    let report = process_all(&fetcher, &pipelines, &urls).await;
    for (url, reason) in &report.rejected {
        info!("Skipped {}: {}", url, reason);
    }

    let output = args.output.unwrap_or(config.output.path);
    save_guides(&output, &report.accepted).await?;
    Ok(())
}
