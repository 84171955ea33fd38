//! Send feature vectors to a scoring endpoint and print one prediction per input.

use irisflow::logging;
use irisflow::scoring::{
    DEFAULT_DATA, ResponseFormat, ScoringClient, ScoringRequest, format_prediction_lines,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("irisflow-score") {
        eprintln!("Logging disabled: {err}");
    }

    let request = ScoringRequest::from_json(&options.data).map_err(|err| err.to_string())?;
    let client = ScoringClient::new(&options.scoring_url, options.primary_key, options.format)
        .map_err(|err| err.to_string())?;
    let predictions = client.score(&request).map_err(|err| err.to_string())?;
    for line in format_prediction_lines(&request.data, &predictions) {
        println!("{line}");
    }
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    scoring_url: String,
    primary_key: Option<String>,
    format: ResponseFormat,
    data: String,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut scoring_url = None;
    let mut primary_key = None;
    let mut format = ResponseFormat::default();
    let mut data = DEFAULT_DATA.to_string();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--scoring-url" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--scoring-url requires a value".to_string())?;
                scoring_url = Some(value.clone());
            }
            "--primary-key" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--primary-key requires a value".to_string())?;
                primary_key = Some(value.clone());
            }
            "--response-format" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--response-format requires a value".to_string())?;
                format = value
                    .parse()
                    .map_err(|err: irisflow::scoring::ScoringError| err.to_string())?;
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data = value.clone();
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let scoring_url = scoring_url.ok_or_else(help_text)?;
    Ok(CliOptions {
        scoring_url,
        primary_key,
        format,
        data,
    })
}

fn help_text() -> String {
    [
        "irisflow-score",
        "",
        "Posts feature vectors to a deployed iris model and prints each input with its",
        "prediction.",
        "",
        "Usage:",
        "  irisflow-score --scoring-url <url> [--primary-key <key>] [options]",
        "",
        "Options:",
        "  --scoring-url <url>        Scoring endpoint (required).",
        "  --primary-key <key>        Sent as a Bearer token when given.",
        "  --response-format <fmt>    string: body is a JSON string holding the list;",
        "                             object: body is {\"predict\": [...]} (default: string).",
        "  --data <json>              Feature vectors as a JSON list of lists",
        "                             (default: [[0.1,2.3,4.1,2.0],[0.2,1.8,3.9,2.1]]).",
    ]
    .join("\n")
}
