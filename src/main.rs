use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulseboard_core::{
    api::{ApiClient, BoardApi, HttpBoardApi, StaticToken, TokenProvider},
    config::{ClientConfig, MetricsSource},
    domain::{BoardId, CardId, ColumnId, ProjectId},
    state::BoardStore,
    telemetry,
    ticker::{
        format::{fmt_money, fmt_number, fmt_pct, trend, Trend},
        kpi::kpi_aggregates,
        ProjectTickerDatum, TickerBook, TickerFeed,
    },
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "pulseboard")]
#[command(version, about = "Headless console for Pulseboard boards and the KPI ticker")]
pub struct Cli {
    /// Read configuration from this env file instead of the process environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List boards, optionally only those of one project
    Boards {
        #[arg(long)]
        project: Option<String>,
    },
    /// Print a board column by column
    Show { board_id: String },
    /// Move a card to another column
    Move {
        board_id: String,
        card_id: String,
        column_id: String,
    },
    /// Tail the KPI ticker
    Ticker {
        /// Overrides PULSEBOARD_METRICS_SOURCE
        #[arg(long)]
        source: Option<MetricsSource>,
        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.env_file {
        Some(path) => ClientConfig::from_env_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => ClientConfig::from_env().context("Invalid configuration")?,
    };
    Ok(config)
}

fn api_client(config: &ClientConfig) -> Result<ApiClient> {
    let tokens: Arc<dyn TokenProvider> =
        Arc::new(StaticToken::new(config.api_token.clone().unwrap_or_default()));
    Ok(ApiClient::new(config, tokens)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose {
        "pulseboard_core=debug,pulseboard=debug"
    } else {
        "pulseboard_core=info,pulseboard=info"
    };
    telemetry::init_tracing(default_filter)?;

    let mut config = load_config(&cli)?;

    match &cli.command {
        Commands::Boards { project } => {
            let api = HttpBoardApi::new(api_client(&config)?);
            cmd_boards(&api, project.as_deref()).await?
        }
        Commands::Show { board_id } => {
            let api = HttpBoardApi::new(api_client(&config)?);
            cmd_show(Arc::new(api), board_id).await?
        }
        Commands::Move {
            board_id,
            card_id,
            column_id,
        } => {
            let api = HttpBoardApi::new(api_client(&config)?);
            cmd_move(Arc::new(api), board_id, card_id, column_id).await?
        }
        Commands::Ticker { source, ticks } => {
            if let Some(source) = source {
                config.metrics_source = *source;
            }
            cmd_ticker(&config, *ticks).await?
        }
    }

    Ok(())
}

async fn cmd_boards(api: &HttpBoardApi, project: Option<&str>) -> Result<()> {
    let list = match project {
        Some(id) => api.list_project_boards(&ProjectId::from(id)).await?,
        None => api.list_boards().await?,
    };
    for board in &list.items {
        println!("{:<24} {}", board.id.as_str(), board.name);
    }
    println!("{} board(s)", list.total);
    Ok(())
}

async fn cmd_show(api: Arc<HttpBoardApi>, board_id: &str) -> Result<()> {
    let mut store = BoardStore::new(Arc::clone(&api));
    store
        .load_board(&BoardId::from(board_id))
        .await
        .with_context(|| format!("Failed to load board {board_id}"))?;

    if let Some(board) = store.board() {
        println!("{}", board.name);
    }
    if let Some(project) = store.linked_project(api.as_ref()).await? {
        println!("project: {} ({})", project.name, project.status);
    }

    let now = chrono::Utc::now();
    for view in store.column_views() {
        println!("\n[{}] {}", view.column.title, view.cards.len());
        for card in view.cards {
            let (done, total) = card.checklist_progress();
            let overdue = if card.is_overdue(now) { " overdue" } else { "" };
            println!(
                "  {:<24} {} ({done}/{total}){overdue}",
                card.id.as_str(),
                card.title
            );
        }
    }
    Ok(())
}

async fn cmd_move(
    api: Arc<HttpBoardApi>,
    board_id: &str,
    card_id: &str,
    column_id: &str,
) -> Result<()> {
    let mut store = BoardStore::new(api);
    store.load_board(&BoardId::from(board_id)).await?;
    store
        .move_card(&CardId::from(card_id), &ColumnId::from(column_id))
        .await
        .with_context(|| format!("Failed to move card {card_id}"))?;
    println!("moved {card_id} to {column_id}");
    Ok(())
}

fn print_ticker(data: &[ProjectTickerDatum]) {
    for datum in data {
        let arrow = match trend(&datum.index_series) {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "•",
        };
        let index = datum.index_series.last().copied().unwrap_or(100.0);
        println!(
            "{:<4} {arrow} {:>7.1}  profit {:>8}  margin {:>6}  saved {:>5}h  events {}",
            datum.symbol,
            index,
            fmt_money(datum.profit),
            fmt_pct(datum.margin),
            fmt_number(datum.time_saved_hrs),
            datum.app_events.map(|e| e.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
    let series: Vec<&[f64]> = data.iter().map(|d| d.index_series.as_slice()).collect();
    let agg = kpi_aggregates(&series, 7);
    println!("7-point index avg {:.1}\n", agg.avg);
}

async fn cmd_ticker(config: &ClientConfig, ticks: Option<usize>) -> Result<()> {
    let feed = TickerFeed::new(config, Arc::new(api_client(config)?));
    let mut book = TickerBook::new(feed.initial_data().await?, config.ticker_history);
    print_ticker(book.data());

    if feed.source() == MetricsSource::Static {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = feed.subscribe(move |deltas| {
        let _ = tx.send(deltas.to_vec());
    })?;

    let mut seen = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            batch = rx.recv() => {
                let Some(deltas) = batch else { break };
                book.apply(&deltas);
                print_ticker(book.data());
                seen += 1;
                if ticks.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }

    feed.shutdown();
    Ok(())
}
