//! Offline demo: wires mock collaborators into the scanner, runs one scan
//! against the balanced preset, and prints the JSON result.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use url_verdict_engine::evidence::{
    ContentEvidence, DnsProbe, Evidence, HttpProbe, ProbeEvidence, TlsEvidence,
};
use url_verdict_engine::{
    ConfigStore, MockModelClient, ScanRequest, Scanner, StaticProber, StaticTiSource, Verdict,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .compact()
        .init();

    let target = "https://paypal-secure-login.weebly.com/account/verify";

    let probe = ProbeEvidence {
        dns: DnsProbe {
            resolved: true,
            addresses: vec!["203.0.113.10".into()],
            attempts: 1,
        },
        tcp_connected: Some(true),
        http: Some(HttpProbe {
            status: Some(200),
            server_header: Some("nginx".into()),
            redirect_chain: vec![],
            final_url: Some(target.to_string()),
            body_snippet: Some("<html>Sign in to continue</html>".into()),
        }),
        error: None,
    };

    let mut evidence = Evidence::for_target(target);
    evidence.domain.age_days = Some(4);
    evidence.tls = Some(TlsEvidence {
        valid: false,
        expired: false,
        self_signed: true,
        hostname_mismatch: false,
        issued_days_ago: Some(2),
        issuer: None,
    });
    evidence.content = Some(ContentEvidence {
        title: Some("PayPal - Log In".into()),
        has_login_form: true,
        detected_brands: vec!["paypal".into()],
        ..ContentEvidence::default()
    });

    let scanner = Scanner::new(
        Arc::new(StaticProber::new(probe)),
        vec![
            Arc::new(StaticTiSource::new("urlhaus", Verdict::Malicious)),
            Arc::new(StaticTiSource::new("virustotal", Verdict::Safe)),
            Arc::new(StaticTiSource::new("phishtank", Verdict::Malicious)),
        ],
        vec![
            Arc::new(MockModelClient::new(
                "gpt-4o-mini",
                "Verdict: MALICIOUS\nConfidence: 92%\nClassic brand-spoof phishing page.",
            )),
            Arc::new(MockModelClient::new(
                "claude-haiku",
                "Verdict: MALICIOUS\nConfidence: 88%\nLogin form on a free host claiming PayPal.",
            )),
            Arc::new(MockModelClient::new(
                "llama-groq",
                "Verdict: SUSPICIOUS\nConfidence: 60%\nRisky but content is limited.",
            )),
        ],
    );

    let store = ConfigStore::new();
    let request = ScanRequest::new(target);
    let config = store.resolve(request.configuration_ref.as_deref());

    let result = scanner.scan(&request, evidence, config).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
