//! CLI module for wscli
//!
//! Argument parsing and the mapping from command-line actions to
//! [`wsman::Client`] operations.

use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

use wsman::auth::AuthMode;
use wsman::config::Config;
use wsman::enumeration::EnumerationMode;
use wsman::xml::{self, Element};
use wsman::{Client, Error, Message, Result};

/// wscli - talk WS-Management to a remote endpoint
#[derive(Parser, Debug, Clone)]
#[command(name = "wscli")]
#[command(author = "wsman Contributors")]
#[command(version)]
#[command(about = "Send WS-Management requests and print the responses", long_about = None)]
pub struct Cli {
    /// The WSMAN endpoint URL, e.g. https://10.0.0.12/wsman
    #[arg(short = 'e', long)]
    pub endpoint: Option<String>,

    /// Username to authenticate with
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Password to authenticate with
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Authentication scheme (none, basic, digest)
    #[arg(long, value_parser = parse_auth_mode)]
    pub auth: Option<AuthMode>,

    /// Identify, Enumerate, EnumerateEPR, Get, Put, Create, Delete, Invoke,
    /// or any action URI
    #[arg(short = 'a', long, default_value = "Identify")]
    pub action: String,

    /// ResourceURI for the action
    #[arg(short = 'r', long)]
    pub resource: Option<String>,

    /// Method to call when the action is Invoke
    #[arg(short = 'm', long)]
    pub method: Option<String>,

    /// Comma-separated selector:value pairs
    #[arg(short = 's', long)]
    pub selectors: Option<String>,

    /// Comma-separated option:value pairs
    #[arg(short = 'o', long)]
    pub options: Option<String>,

    /// Comma-separated parameter:value pairs for Invoke
    #[arg(short = 'x', long)]
    pub parameters: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Verify the server's TLS certificate
    #[arg(long)]
    pub verify_tls: bool,

    /// Don't ask for items in the Enumerate response
    #[arg(long)]
    pub no_optimize: bool,

    /// Path to configuration file
    #[arg(short = 'c', long, env = "WSMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Indent the XML output
    #[arg(long)]
    pub pretty: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Encode a response for printing
    pub fn render(&self, message: &Message) -> Result<String> {
        if self.pretty {
            message.to_pretty_xml()
        } else {
            message.to_xml()
        }
    }
}

fn parse_auth_mode(value: &str) -> std::result::Result<AuthMode, String> {
    value.parse()
}

/// Run the requested action and return the rendered response.
pub async fn run(cli: &Cli, config: &Config) -> Result<String> {
    let selectors = handle_slice(cli.selectors.as_deref().unwrap_or_default())?;
    let options = handle_slice(cli.options.as_deref().unwrap_or_default())?;
    let parameters = handle_slice(cli.parameters.as_deref().unwrap_or_default())?;

    let mut client = build_client(cli, config)?;

    if cli.action == "Identify" {
        let reply = client.identify().await?;
        return cli.render(&reply);
    }

    let resource = cli
        .resource
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::argument(format!("{} requires a resource URI passed in with -r", cli.action)))?;

    let reply = match cli.action.as_str() {
        "Enumerate" | "EnumerateEPR" => {
            let mode = if cli.action == "EnumerateEPR" {
                EnumerationMode::EndpointReferences
            } else {
                EnumerationMode::Objects
            };
            let request = client.enumerate_request(resource, mode);
            let request = decorate(request, &options, &selectors, &parameters)?;
            client.run_enumeration(&request).await?
        }
        action => {
            let request = match action {
                "Get" => client.get(resource),
                "Put" => client.put(resource).with_body(read_body(std::io::stdin(), action)?),
                "Create" => client.create(resource).with_body(read_body(std::io::stdin(), action)?),
                "Delete" => client.delete(resource),
                "Invoke" => {
                    let method = cli
                        .method
                        .as_deref()
                        .filter(|m| !m.is_empty())
                        .ok_or_else(|| Error::argument("Invoke requires a method passed in with -m"))?;
                    client.invoke(resource, method)
                }
                custom => client.new_message(custom).with_resource_uri(resource),
            };
            let request = decorate(request, &options, &selectors, &parameters)?;
            client.send(&request).await?
        }
    };

    cli.render(&reply)
}

fn build_client(cli: &Cli, config: &Config) -> Result<Client> {
    let mut config = config.clone();
    let settings = &mut config.endpoint;

    if let Some(endpoint) = &cli.endpoint {
        settings.url = Some(endpoint.clone());
    }
    if let Some(username) = &cli.username {
        settings.username = Some(username.clone());
    }
    if let Some(password) = &cli.password {
        settings.password = Some(password.clone());
    }
    if let Some(auth) = cli.auth {
        settings.auth = auth;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout = timeout;
    }
    if cli.verify_tls {
        settings.verify_tls = true;
    }
    if cli.no_optimize {
        settings.optimize_enumeration = false;
    }

    config
        .client_builder()
        .ok_or_else(|| Error::argument("no endpoint given (use -e, WSMAN_ENDPOINT or a config file)"))?
        .build()
}

fn decorate(
    request: Message,
    options: &[String],
    selectors: &[String],
    parameters: &[String],
) -> Result<Message> {
    let mut request = request;
    if !options.is_empty() {
        request = request.with_options(options)?;
    }
    if !selectors.is_empty() {
        request = request.with_selectors(selectors)?;
    }
    if !parameters.is_empty() {
        request = request.with_parameters(parameters)?;
    }
    Ok(request)
}

/// Split `a:1,b:2` into `["a", "1", "b", "2"]`.
pub fn handle_slice(list: &str) -> Result<Vec<String>> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    let mut values = Vec::new();
    for segment in list.split(',') {
        let (name, value) = segment.split_once(':').ok_or_else(|| {
            Error::argument(format!("segment '{segment}' does not have 2 ':' separated elements"))
        })?;
        values.push(name.trim().to_string());
        values.push(value.trim().to_string());
    }
    Ok(values)
}

/// Read the instance document for Put/Create.
pub fn read_body(mut input: impl Read, action: &str) -> Result<Element> {
    let mut buf = Vec::new();
    input
        .read_to_end(&mut buf)
        .map_err(|e| Error::argument(format!("failed to read stdin: {e}")))?;
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::argument(format!("{action} needs an XML document on stdin")));
    }
    xml::parse(&buf).map_err(|e| Error::argument(format!("failed to parse XML document on stdin: {e}")))
}
