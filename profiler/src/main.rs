use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use common::config::Settings;
use profiler::models::{FieldRef, SelectionSet};
use profiler::render::{ChartGeometry, RenderedReport, SortDirection, SortKey, SortState, render_report};
use profiler::report::{Report, ReportAggregator};
use profiler::services::{DEFAULT_CONTEXT, ProfilerService};
use std::path::Path;
use std::process;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .default_value("config/profiler.toml")
        .help("Sets a custom config file")
}

fn sort_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("sort")
                .long("sort")
                .value_name("KEY")
                .help("entity, field, totalCount, nonNullCount, nonNullPercentage or status"),
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .action(ArgAction::SetTrue)
                .help("Sort descending"),
        )
        .arg(
            Arg::new("out-dir")
                .long("out-dir")
                .value_name("DIR")
                .help("Writes report.json and chart SVGs into DIR"),
        )
}

fn cli() -> Command {
    Command::new("Field Fill-Rate Profiler")
        .version("1.0")
        .about("Profiles field fill rates of a Salesforce org through query plans")
        .subcommand_required(true)
        .subcommand(
            Command::new("entities")
                .about("Lists queryable entities")
                .arg(config_arg())
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .value_name("TEXT")
                        .help("Case-insensitive name or label filter"),
                ),
        )
        .subcommand(sort_args(
            Command::new("profile")
                .about("Runs a fill-rate profile and prints the report")
                .arg(config_arg())
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Entity to profile with all of its fields"),
                )
                .arg(
                    Arg::new("field")
                        .long("field")
                        .value_name("ENTITY:FIELD")
                        .action(ArgAction::Append)
                        .help("Single field to profile"),
                )
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .value_name("TEXT")
                        .help("Entity name or label used when nothing is selected"),
                ),
        ))
        .subcommand(sort_args(
            Command::new("render")
                .about("Renders a stored report payload (summary or distribution)")
                .arg(config_arg())
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .value_name("FILE")
                        .required(true)
                        .help("JSON payload with `results`"),
                ),
        ))
        .subcommand(
            Command::new("serve")
                .about("Starts the HTTP API")
                .arg(config_arg()),
        )
}

fn config_path(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/profiler.toml")
}

fn sort_state(matches: &ArgMatches) -> anyhow::Result<SortState> {
    let direction = if matches.get_flag("desc") {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    Ok(match matches.get_one::<String>("sort") {
        Some(key) => SortState::new(key.parse::<SortKey>()?, direction),
        None => SortState::default(),
    })
}

fn selection(matches: &ArgMatches) -> anyhow::Result<SelectionSet> {
    let mut selection = SelectionSet::new();
    for entity in matches.get_many::<String>("entity").into_iter().flatten() {
        selection.add_entity(entity);
    }
    for key in matches.get_many::<String>("field").into_iter().flatten() {
        let field_ref = FieldRef::parse(key)
            .with_context(|| format!("invalid field `{}`, expected ENTITY:FIELD", key))?;
        selection.add_field(&field_ref);
    }
    Ok(selection)
}

fn print_report(rendered: &RenderedReport) {
    println!("{}", rendered.generated);
    println!("{}", rendered.text);
    println!("{}", rendered.status);
}

fn write_outputs(dir: &Path, report: &Report, rendered: &RenderedReport) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(dir.join("report.json"), json)?;
    for (index, chart) in rendered.charts.iter().enumerate() {
        let path = dir.join(format!("chart-{}.svg", index + 1));
        std::fs::write(&path, &chart.svg).with_context(|| format!("writing {}", path.display()))?;
    }
    println!(
        "Wrote report.json and {} chart(s) to {}",
        rendered.charts.len(),
        dir.display()
    );
    Ok(())
}

fn present(report: &Report, settings: &Settings, matches: &ArgMatches) -> anyhow::Result<()> {
    let rendered = render_report(
        report,
        sort_state(matches)?,
        settings.profiler.chart_page_size,
        ChartGeometry::from_config(&settings.profiler),
    );
    print_report(&rendered);
    if let Some(dir) = matches.get_one::<String>("out-dir") {
        write_outputs(Path::new(dir), report, &rendered)?;
    }
    Ok(())
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("entities", sub)) => {
            let settings = Settings::new(config_path(sub))?;
            let service = ProfilerService::new(&settings);
            let filter = sub.get_one::<String>("filter").map(|s| s.as_str()).unwrap_or("");
            let entities = service.list_entities(DEFAULT_CONTEXT, filter).await?;
            for entity in &entities {
                println!("{}", entity.display_key());
            }
            println!("Loaded {} SObjects via API.", entities.len());
        }
        Some(("profile", sub)) => {
            let settings = Settings::new(config_path(sub))?;
            let service = ProfilerService::new(&settings);
            let filter = sub.get_one::<String>("filter").map(|s| s.as_str()).unwrap_or("");
            let report = service.run(DEFAULT_CONTEXT, &selection(sub)?, filter).await?;
            println!("Processed {} field(s).", report.results().len());
            present(&report, &settings, sub)?;
        }
        Some(("render", sub)) => {
            let settings = Settings::new(config_path(sub))?;
            let input = sub
                .get_one::<String>("input")
                .context("missing --input")?;
            let raw = std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)?;
            let report = ReportAggregator::from_payload(payload)?;
            present(&report, &settings, sub)?;
        }
        Some(("serve", sub)) => {
            profiler::run_server(config_path(sub)).await?;
        }
        _ => anyhow::bail!("No subcommand specified. Use --help for usage information."),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    profiler::init_logging("info", false);

    let matches = cli().get_matches();
    if let Err(e) = run(matches).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
