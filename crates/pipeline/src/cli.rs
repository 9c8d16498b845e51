//! Command line parsing
//!
//! ```text
//! pubmetric build [--domain TOPIC] [--limit N] [--tools NAME,NAME] [--sample N] [--seed S]
//! pubmetric score WORKFLOW.json [METRIC] [--transform T] [--adjust KIND[:mean|min]]...
//!                 [--aggregation sum|mean|product] [--decay D] [--factor F]
//!                 [--desirability MID,UPPER[,inverse]]
//! ```
//!
//! Everything else (service URLs, rate limits, graph policy) comes from
//! configuration files and `APP__` environment variables.

use pubmetric_common::{AppError, Result};
use pubmetric_graph::scoring::{DesirabilityBounds, Metric, ScoreOptions};
use std::path::PathBuf;

pub const USAGE: &str = "usage:
  pubmetric build [--domain TOPIC] [--limit N] [--tools NAME,NAME] [--sample N] [--seed S]
  pubmetric score WORKFLOW.json [METRIC] [--transform identity|log|sqrt] [--adjust age|degree|citations[:mean|min]]
                  [--aggregation sum|mean|product] [--decay D] [--factor F]
                  [--desirability MID,UPPER[,inverse]]";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Build(BuildArgs),
    Score(ScoreArgs),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildArgs {
    pub domain: Option<String>,
    pub limit: Option<usize>,
    pub tools: Vec<String>,
    pub sample: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreArgs {
    pub workflow: PathBuf,
    pub metric: Metric,
    pub options: ScoreOptions,
    pub desirability: Option<DesirabilityBounds>,
}

fn usage_error(message: impl Into<String>) -> AppError {
    AppError::Validation {
        message: format!("{}\n{}", message.into(), USAGE),
        field: None,
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T> {
    let value = value.ok_or_else(|| usage_error(format!("{} needs a value", flag)))?;
    value
        .parse()
        .map_err(|_| usage_error(format!("invalid value {:?} for {}", value, flag)))
}

fn graph_error(e: pubmetric_graph::GraphError) -> AppError {
    usage_error(e.to_string())
}

/// Parse the arguments after the program name
pub fn parse(args: &[String], defaults: ScoreOptions) -> Result<Command> {
    let (command, rest) = args.split_first().ok_or_else(|| usage_error("missing command"))?;
    match command.as_str() {
        "build" => parse_build(rest).map(Command::Build),
        "score" => parse_score(rest, defaults).map(Command::Score),
        other => Err(usage_error(format!("unknown command {:?}", other))),
    }
}

fn parse_build(args: &[String]) -> Result<BuildArgs> {
    let mut parsed = BuildArgs::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--domain" => parsed.domain = Some(parse_value(flag, iter.next())?),
            "--limit" => parsed.limit = Some(parse_value(flag, iter.next())?),
            "--tools" => {
                let names: String = parse_value(flag, iter.next())?;
                parsed.tools = names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "--sample" => parsed.sample = Some(parse_value(flag, iter.next())?),
            "--seed" => parsed.seed = parse_value(flag, iter.next())?,
            other => return Err(usage_error(format!("unexpected argument {:?}", other))),
        }
    }
    Ok(parsed)
}

fn parse_score(args: &[String], mut options: ScoreOptions) -> Result<ScoreArgs> {
    let mut positional = Vec::new();
    let mut desirability: Option<DesirabilityBounds> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--transform" => {
                let value: String = parse_value(arg, iter.next())?;
                options.transform = value.parse().map_err(graph_error)?;
            }
            "--adjust" => {
                let value: String = parse_value(arg, iter.next())?;
                options.adjustments.push(value.parse().map_err(graph_error)?);
            }
            "--aggregation" => {
                let value: String = parse_value(arg, iter.next())?;
                options.aggregation = value.parse().map_err(graph_error)?;
            }
            "--decay" => options.decay = Some(parse_value(arg, iter.next())?),
            "--factor" => options.connectivity_factor = parse_value(arg, iter.next())?,
            "--desirability" => {
                let value: String = parse_value(arg, iter.next())?;
                desirability = Some(value.parse::<DesirabilityBounds>().map_err(graph_error)?);
            }
            flag if flag.starts_with("--") => {
                return Err(usage_error(format!("unexpected argument {:?}", flag)));
            }
            value => positional.push(value.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let workflow = positional
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| usage_error("missing workflow file"))?;
    let metric = match positional.next() {
        Some(name) => name.parse::<Metric>().map_err(AppError::from)?,
        None => Metric::WorkflowAverage,
    };
    if let Some(extra) = positional.next() {
        return Err(usage_error(format!("unexpected argument {:?}", extra)));
    }

    Ok(ScoreArgs {
        workflow,
        metric,
        options,
        desirability,
    })
}
