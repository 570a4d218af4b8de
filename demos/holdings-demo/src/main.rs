//! Walks one client through login, a holdings call, and logout against
//! an in-process fake broker.
//!
//! Reads `BROKER_*` variables from the environment or a `.env` file and
//! falls back to demo values for anything unset.

use std::env;

use brokergate::prelude::*;
use brokergate::telemetry::{DEFAULT_LOG_LEVEL, init_tracing};
use serde::Serialize;
use tracing::info;

// ---------------------------------------------------------------------------
// Fake broker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct Holding {
    tradingsymbol: &'static str,
    quantity: u32,
    average_price: f64,
    last_price: f64,
}

impl Holding {
    fn pnl(&self) -> f64 {
        (self.last_price - self.average_price) * f64::from(self.quantity)
    }
}

/// Issues `access-<request_token>` for any request token.
struct FakeBroker;

impl TokenExchanger for FakeBroker {
    async fn exchange(
        &self,
        request_token: &str,
        _api_secret: &str,
    ) -> Result<ExchangedSession, ExchangeError> {
        Ok(ExchangedSession {
            user_id: "DEMO01".into(),
            access_token: format!("access-{request_token}"),
            public_token: None,
        })
    }
}

impl FakeBroker {
    async fn holdings(access_token: String) -> Result<Vec<Holding>, ExchangeError> {
        if !access_token.starts_with("access-") {
            return Err(ExchangeError::Rejected {
                code: 403,
                message: "invalid access token".into(),
            });
        }
        Ok(vec![
            Holding {
                tradingsymbol: "INFY",
                quantity: 10,
                average_price: 1420.5,
                last_price: 1512.0,
            },
            Holding {
                tradingsymbol: "TCS",
                quantity: 4,
                average_price: 3890.0,
                last_price: 3811.25,
            },
        ])
    }
}

fn demo_default(key: &str) -> Option<String> {
    let value = match key {
        BrokerConfig::API_KEY_VAR => "demo_api_key",
        BrokerConfig::API_SECRET_VAR => "demo_api_secret",
        BrokerConfig::USER_ID_VAR => "DEMO01",
        _ => return None,
    };
    Some(value.to_string())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), BrokerError> {
    dotenvy::dotenv().ok();
    init_tracing(DEFAULT_LOG_LEVEL);

    let config = BrokerConfig::from_lookup(|key| env::var(key).ok().or_else(|| demo_default(key)))?;
    let service = BrokerServiceBuilder::new()
        .broker_config(config)
        .build(FakeBroker)?;

    // 1. A client asks to log in.
    let ticket = service.login(None)?;
    info!(session_id = %ticket.session_id, "open {}", ticket.login_url);
    println!("{}", ticket.to_json()?);

    // 2. Before login completes, API calls are refused.
    let early = service
        .call_api(&ticket.session_id, "fetch holdings", FakeBroker::holdings)
        .await;
    if let Err(e) = early {
        info!(requires_login = e.requires_login(), "{e}");
    }

    // 3. The broker redirects back to our callback.
    let query = format!(
        "request_token=demo-request-token&client_session={}&status=success&type=login",
        ticket.session_id
    );
    let outcome = service.handle_callback_query(&query).await;
    info!(redirect = outcome.redirect(), "callback handled");

    // 4. Authenticated API call.
    let holdings = service
        .call_api(&ticket.session_id, "fetch holdings", FakeBroker::holdings)
        .await?;
    for h in &holdings {
        info!(symbol = h.tradingsymbol, quantity = h.quantity, pnl = h.pnl(), "holding");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&holdings).unwrap_or_default()
    );

    // 5. Logout ends the session.
    service.logout(&ticket.session_id);
    if let Err(e) = service
        .call_api(&ticket.session_id, "fetch holdings", FakeBroker::holdings)
        .await
    {
        info!("after logout: {e}");
    }

    if let Some((sessions, tokens)) = service.shutdown().await {
        info!(
            session_sweeps = sessions.total_runs,
            token_sweeps = tokens.total_runs,
            "maintenance stopped"
        );
    }
    Ok(())
}
