//! Seeds a demo organization for local development.
//!
//! Creates a small chart of accounts, the current fiscal year with monthly
//! periods, an opening balance entry and one settled invoice. Everything goes
//! through the ledger engine, so the seeded books obey the same rules as real
//! ones. Running it twice is harmless: an organization that already has
//! accounts is left alone.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use folio_core::chart::{AccountType, NewAccount};
use folio_core::events::ChannelPublisher;
use folio_core::ledger::{LineInput, NewJournalEntry};
use folio_core::reconciliation::{NewInvoice, NewInvoiceLine, NewPayment, PaymentMethod};
use folio_core::{EngineSettings, LedgerEngine, Scope};
use folio_db::PgLedgerStore;
use folio_shared::config::TelemetryConfig;
use folio_shared::AppConfig;
use folio_shared::types::{
    AccountId, Currency, CustomerId, Money, OrganizationId, TenantId, UserId,
};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Demo tenant (stable across runs).
const DEMO_TENANT: Uuid = Uuid::from_u128(0x0000_0001);
/// Demo organization (stable across runs).
const DEMO_ORGANIZATION: Uuid = Uuid::from_u128(0x0000_0002);
/// Actor recorded on seeded documents.
const SEED_USER: Uuid = Uuid::from_u128(0x0000_0003);
/// Customer of the demo invoice.
const DEMO_CUSTOMER: Uuid = Uuid::from_u128(0x0000_0004);

/// Demo chart: code, name, type, parent code.
const CHART: &[(&str, &str, AccountType, Option<&str>)] = &[
    ("1000", "Assets", AccountType::Asset, None),
    ("1100", "Cash", AccountType::Asset, Some("1000")),
    ("1200", "Accounts Receivable", AccountType::Asset, Some("1000")),
    ("2000", "Liabilities", AccountType::Liability, None),
    ("2100", "Accounts Payable", AccountType::Liability, Some("2000")),
    ("3000", "Equity", AccountType::Equity, None),
    ("3100", "Owner Capital", AccountType::Equity, Some("3000")),
    ("4000", "Revenue", AccountType::Revenue, None),
    ("4100", "Consulting Revenue", AccountType::Revenue, Some("4000")),
    ("5000", "Expenses", AccountType::Expense, None),
    ("5100", "Rent", AccountType::Expense, Some("5000")),
];

type Engine = LedgerEngine<PgLedgerStore>;

fn init_tracing(config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json()))
        .with((!config.json).then(fmt::layer))
        .init();
}

fn money(value: i64) -> anyhow::Result<Money> {
    Ok(Money::from_decimal(Decimal::from(value))?)
}

fn ymd(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month}-{day}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.telemetry);

    let db = folio_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let (publisher, mut events) = ChannelPublisher::new(config.ledger.event_buffer);
    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = event.payload.name(), payload = %json, "Ledger event"),
                Err(e) => info!(event = event.payload.name(), error = %e, "Ledger event"),
            }
        }
    });

    let engine = LedgerEngine::new(PgLedgerStore::from_config(db, &config.database))
        .with_settings(EngineSettings::from(&config.ledger))
        .with_publisher(Arc::new(publisher));

    let scope = Scope::new(
        TenantId::from(DEMO_TENANT),
        OrganizationId::from(DEMO_ORGANIZATION),
    );
    seed(&engine, &scope).await?;

    // Closing the last sender ends the listener once buffered events are logged.
    drop(engine);
    listener.await?;
    Ok(())
}

async fn seed(engine: &Engine, scope: &Scope) -> anyhow::Result<()> {
    if !engine.list_accounts(scope).await?.is_empty() {
        info!(scope = %scope, "Demo organization already seeded, skipping");
        return Ok(());
    }
    let actor = UserId::from(SEED_USER);

    let accounts = seed_chart(engine, scope).await?;
    let account = |code: &str| {
        accounts
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, id)| *id)
            .with_context(|| format!("account {code} was not seeded"))
    };

    let year = Utc::now().year();
    let fiscal_year = engine
        .create_fiscal_year(
            scope,
            &format!("FY{year}"),
            ymd(year, 1, 1)?,
            ymd(year, 12, 31)?,
        )
        .await?;
    let periods = engine.generate_monthly_periods(scope, fiscal_year.id).await?;
    info!(fiscal_year = %fiscal_year.code, periods = periods.len(), "Fiscal calendar seeded");

    let opening = engine
        .create_draft_entry(
            scope,
            NewJournalEntry {
                entry_date: ymd(year, 1, 1)?,
                description: "Opening capital".to_string(),
                currency: Currency::Usd,
                source_type: None,
                source_id: None,
                lines: vec![
                    LineInput::debit(account("1100")?, money(50_000)?),
                    LineInput::credit(account("3100")?, money(50_000)?),
                ],
            },
            actor,
        )
        .await?;
    let opening = engine.post(scope, opening.entry.id, actor).await?;
    info!(entry_number = %opening.entry_number, "Opening entry posted");

    seed_receivable(engine, scope, actor, ymd(year, 1, 15)?).await
}

async fn seed_chart(
    engine: &Engine,
    scope: &Scope,
) -> anyhow::Result<Vec<(&'static str, AccountId)>> {
    let mut seeded: Vec<(&'static str, AccountId)> = Vec::with_capacity(CHART.len());
    for &(code, name, account_type, parent) in CHART {
        let mut input = NewAccount::new(code, name, account_type, Currency::Usd);
        if let Some(parent) = parent {
            let parent_id = seeded
                .iter()
                .find(|(c, _)| *c == parent)
                .map(|(_, id)| *id)
                .with_context(|| format!("parent {parent} must precede {code}"))?;
            input = input.with_parent(parent_id);
        }
        let account = engine.create_account(scope, input).await?;
        seeded.push((code, account.id));
    }
    info!(accounts = seeded.len(), "Chart of accounts seeded");
    Ok(seeded)
}

async fn seed_receivable(
    engine: &Engine,
    scope: &Scope,
    actor: UserId,
    invoice_date: NaiveDate,
) -> anyhow::Result<()> {
    let customer = CustomerId::from(DEMO_CUSTOMER);
    let due_date = invoice_date
        .checked_add_days(chrono::Days::new(30))
        .context("due date out of range")?;

    let (invoice, _) = engine
        .create_invoice(
            scope,
            NewInvoice {
                customer_id: customer,
                invoice_date,
                due_date,
                currency: Currency::Usd,
                notes: Some("Demo engagement".to_string()),
                lines: vec![NewInvoiceLine::new(
                    "Consulting hours",
                    Decimal::from(12),
                    money(150)?,
                )],
            },
            actor,
        )
        .await?;
    let invoice = engine.send_invoice(scope, invoice.id).await?;

    let payment = engine
        .record_payment(
            scope,
            NewPayment {
                customer_id: customer,
                payment_date: due_date,
                amount: invoice.total_amount,
                currency: Currency::Usd,
                method: PaymentMethod::BankTransfer,
                reference: Some("DEMO-WIRE-1".to_string()),
                pending: false,
            },
            actor,
        )
        .await?;
    engine
        .allocate(scope, payment.id, invoice.id, invoice.total_amount, actor)
        .await?;

    info!(
        invoice_number = %invoice.invoice_number,
        payment_number = %payment.payment_number,
        amount = %invoice.total_amount,
        "Demo invoice settled"
    );
    Ok(())
}
