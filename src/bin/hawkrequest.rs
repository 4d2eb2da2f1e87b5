//! Issue a MAC-signed request against a running gateway and verify the
//! signed reply.

use anyhow::Context;
use clap::Parser;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use hawkgate::config::Config;
use hawkgate::hawk::{CredentialResolver, Sender, StaticCredentialResolver};

#[derive(Parser)]
#[command(about = "Make a MAC-authenticated request")]
struct Args {
    /// Absolute URL to request.
    #[clap(long)]
    url: String,
    /// ID of the configured credentials to sign with.
    #[clap(long)]
    creds: String,
    /// Request method.
    #[clap(short = 'X', long, default_value = "GET")]
    method: String,
    /// Body payload to send.
    #[clap(short = 'd', long)]
    data: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("loading configuration")?;
    let resolver = StaticCredentialResolver::new(config.hawk.credentials.clone());
    let credentials = resolver
        .resolve(&args.creds)
        .with_context(|| format!("looking up credentials for id {:?}", args.creds))?;

    let body = args.data.unwrap_or_default();
    let content_type = if body.is_empty() {
        "text/plain"
    } else {
        "application/x-www-form-urlencoded"
    };
    let method = args.method.to_uppercase();

    let sender = Sender::new(
        credentials,
        &config.hawk.scheme,
        &args.url,
        &method,
        body.as_bytes(),
        content_type,
    )
    .context("signing the request")?;

    let client = reqwest::Client::new();
    let response = client
        .request(
            reqwest::Method::from_bytes(method.as_bytes())
                .with_context(|| format!("invalid request method {method:?}"))?,
            &args.url,
        )
        .header(AUTHORIZATION, sender.request_header())
        .header(CONTENT_TYPE, content_type)
        .body(body.clone())
        .send()
        .await
        .context("sending the request")?;

    let status = response.status();
    let server_authorization = response
        .headers()
        .get("server-authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let response_content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_default();
    let text = response.text().await.context("reading the response body")?;

    println!("{method} {url} -> {status}", url = args.url);
    println!("{text}");

    match server_authorization {
        Some(header) => {
            sender
                .accept_response(&header, text.as_bytes(), &response_content_type)
                .context("verifying the Server-Authorization header")?;
            println!("<response was verified>");
        }
        None => {
            println!("** NO Server-Authorization header **");
            println!("<response was NOT verified>");
        }
    }

    Ok(())
}
