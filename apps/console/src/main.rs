use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    status_badge, Notice, PackageDetailController, PackageListController, Severity, TransitionKind,
};
use gateway::{HttpPackageGateway, PackageGateway, StaticSession};
use realtime::{ChannelEvent, ChannelOptions, RefreshChannel};
use shared::domain::PackageId;
use tokio::sync::broadcast;
use tracing::info;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(about = "Warehouse package lifecycle console")]
struct Args {
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search packages, optionally filtered by status.
    Search {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Show one package in full.
    Show { id: String },
    /// Pack a NEW package (checks every item).
    Pack { id: String },
    /// Deliver a PACKED package.
    Deliver { id: String },
    /// Cancel a NEW or PACKED package with a reason.
    Cancel { id: String, reason: String },
    /// Resolve the caller's role.
    Role,
    /// Extract nutrition facts from a label photo.
    Extract { image: PathBuf },
    /// Follow realtime refresh signals and keep the list in sync.
    Watch {
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(token) = args.token {
        settings.bearer_token = token;
    }

    let gateway: Arc<dyn PackageGateway> = Arc::new(HttpPackageGateway::new(
        settings.base_url.clone(),
        Arc::new(StaticSession::new(settings.bearer_token.clone())),
    ));

    match args.command {
        Command::Search {
            status,
            page,
            page_size,
        } => run_search(gateway, status, page, page_size).await,
        Command::Show { id } => show_package(gateway, id).await,
        Command::Pack { id } => run_transition(gateway, id, TransitionKind::Pack, None).await,
        Command::Deliver { id } => run_transition(gateway, id, TransitionKind::Deliver, None).await,
        Command::Cancel { id, reason } => {
            run_transition(gateway, id, TransitionKind::Cancel, Some(reason)).await
        }
        Command::Role => {
            let role = gateway.user_role().await?;
            println!(
                "role: {role:?} (transitions {})",
                if role.can_transition() { "allowed" } else { "hidden" }
            );
            Ok(())
        }
        Command::Extract { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read image '{}'", image.display()))?;
            let facts = gateway.extract_nutrition(&bytes).await?;
            if let Some(serving) = &facts.serving_size {
                println!("serving size: {serving}");
            }
            if let Some(calories) = facts.calories {
                println!("calories: {calories}");
            }
            for nutrient in &facts.nutrients {
                println!("{}: {} {}", nutrient.name, nutrient.amount, nutrient.unit);
            }
            Ok(())
        }
        Command::Watch { status } => run_watch(gateway, &settings, status).await,
    }
}

async fn run_search(
    gateway: Arc<dyn PackageGateway>,
    status: Option<String>,
    page: u32,
    page_size: u32,
) -> Result<()> {
    let list = PackageListController::new(gateway);
    let mut notices = list.subscribe_notices();
    if let Some(status) = status {
        list.set_filter("status", status).await;
    }
    list.set_page_size(page_size).await;
    list.set_page(page).await;
    print_notices(&mut notices);

    let state = list.state().await;
    println!(
        "{} rows, {} total (page {} of {})",
        state.rows.len(),
        state.total_record,
        state.page.page_no,
        state.total_page
    );
    for row in &state.rows {
        let badge = status_badge(row.package.status);
        println!(
            "{:>4}  {:<14} {:<10} {}",
            row.seq, row.package.package_no, badge.label, row.package.family.name
        );
    }
    Ok(())
}

async fn show_package(gateway: Arc<dyn PackageGateway>, id: String) -> Result<()> {
    let detail = PackageDetailController::new(gateway);
    let mut notices = detail.subscribe_notices();
    detail.open(PackageId::new(id)).await;
    print_notices(&mut notices);

    let state = detail.state().await;
    let Some(package) = &state.package else {
        return Ok(());
    };
    let badge = status_badge(package.status);
    println!("{}  [{}]", package.package_no, badge.label);
    println!(
        "family: {} ({}, halal: {})",
        package.family.name, package.family.family_no, package.family.halal
    );
    println!(
        "allocation: {} ({} .. {})",
        package.allocation.allocation_no, package.allocation.window_start,
        package.allocation.window_end
    );
    for item in &package.items {
        println!(
            "  item {}: {} x{} {} @ {}",
            item.id,
            item.inventory.product_name,
            item.inventory.quantity,
            item.inventory.unit,
            item.inventory.storage
        );
    }
    for history in &package.histories {
        let reason = history
            .cancel_reason
            .as_deref()
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        println!("  {:?} by {} at {}{reason}", history.action, history.actor, history.at);
    }
    Ok(())
}

async fn run_transition(
    gateway: Arc<dyn PackageGateway>,
    id: String,
    kind: TransitionKind,
    reason: Option<String>,
) -> Result<()> {
    let detail = PackageDetailController::new(gateway);
    let mut notices = detail.subscribe_notices();
    detail.open(PackageId::new(id)).await;
    if kind == TransitionKind::Pack {
        detail.set_all_items_checked(true).await;
    }
    detail.apply_transition(kind, reason.as_deref()).await;
    print_notices(&mut notices);

    if let Some(package) = detail.state().await.package {
        println!(
            "{} is now {}",
            package.package_no,
            status_badge(package.status).label
        );
    }
    Ok(())
}

async fn run_watch(
    gateway: Arc<dyn PackageGateway>,
    settings: &Settings,
    status: Option<String>,
) -> Result<()> {
    let list = PackageListController::new(gateway);
    let mut notices = list.subscribe_notices();
    if let Some(status) = status {
        list.set_filter("status", status).await;
    }
    list.run_search().await;
    print_notices(&mut notices);
    println!("{} rows; watching for changes", list.state().await.rows.len());

    let options = ChannelOptions {
        endpoint: settings.realtime_endpoint()?,
        reconnect_delay: Duration::from_secs(settings.reconnect_delay_seconds),
    };
    let (channel, mut events) = RefreshChannel::spawn(options);
    info!("refresh channel started; ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ChannelEvent::Opened) => println!("- refresh channel connected"),
                Ok(ChannelEvent::Faulted(message)) => println!("! {message}"),
                Ok(ChannelEvent::Refresh(set)) => {
                    list.on_refresh_signal(&set).await;
                    print_notices(&mut notices);
                    println!(
                        "- {} package(s) changed; list now {} rows",
                        set.len(),
                        list.state().await.rows.len()
                    );
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    channel.shutdown();
    Ok(())
}

fn print_notices(rx: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        let prefix = match notice.severity {
            Severity::Error => "!",
            Severity::Success => "+",
            Severity::Info => "-",
        };
        println!("{prefix} {}", notice.message);
    }
}
